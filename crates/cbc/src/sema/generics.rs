//! Generic functions: binding `$T` parameters and specializing bodies

use super::{Resolution, Resolver, callee_definition, declare, ready};
use crate::ast::{ConstValue, NamedArg, Scope, ScopeKind, ScopeOwner, ValueId, ValueKind};
use crate::common::{CompileError, CompileResult, Position};
use crate::parser;
use crate::types::{TypeDescriptor, TypeId};
use log::debug;
use std::collections::HashMap;

/// Concrete functions created from generics, keyed by the generic
/// definition and its bound types in parameter order
#[derive(Debug, Default)]
pub struct SpecializationCache {
    entries: HashMap<(ValueId, Vec<TypeId>), ValueId>,
}

impl SpecializationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, generic: ValueId, bound: &[TypeId]) -> Option<ValueId> {
        self.entries.get(&(generic, bound.to_vec())).copied()
    }

    pub fn insert(&mut self, generic: ValueId, bound: Vec<TypeId>, specialization: ValueId) {
        self.entries.insert((generic, bound), specialization);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &[TypeId], ValueId)> {
        self.entries
            .iter()
            .map(|((generic, bound), spec)| (*generic, bound.as_slice(), *spec))
    }
}

impl Resolver<'_> {
    /// Type a call to a generic function by specializing it for the
    /// argument types. Equal bindings share one specialization.
    pub(super) fn resolve_generic_call(
        &mut self,
        call: ValueId,
        callee: ValueId,
        args: &[ValueId],
        named: &[NamedArg],
        specialization: Option<ValueId>,
    ) -> CompileResult<Resolution<TypeId>> {
        let position = self.unit.value(call).position.clone();
        let specialization = match specialization {
            Some(existing) => existing,
            None => ready!(self.specialize(call, callee, args, named, &position)?),
        };
        let ty = ready!(self.type_of(specialization)?);
        self.check_call(ty, Some(specialization), args, named, position)
    }

    fn specialize(
        &mut self,
        call: ValueId,
        callee: ValueId,
        args: &[ValueId],
        named: &[NamedArg],
        position: &Position,
    ) -> CompileResult<Resolution<ValueId>> {
        let Some(definition) = callee_definition(self.unit, callee) else {
            return self.error(
                "Cannot resolve the generic function being called",
                position.clone(),
            );
        };
        let Some(generic) = self
            .unit
            .function(definition)
            .and_then(|f| f.generic.clone())
        else {
            return self.error(
                "Cannot resolve the generic function being called",
                position.clone(),
            );
        };
        if let Some(arg) = named.first() {
            return self.error(
                "Named arguments are not supported in calls to generic functions",
                arg.position.clone(),
            );
        }

        let inputs: Vec<(TypeId, bool)> = self
            .unit
            .function(definition)
            .map(|f| f.inputs.iter().map(|p| (p.ty, p.default.is_some())).collect())
            .unwrap_or_default();
        let arg_types = ready!(self.expanded_types(args)?);
        let required = inputs.iter().filter(|(_, default)| !default).count();
        if arg_types.len() > inputs.len() || arg_types.len() < required {
            return self.error(
                format!(
                    "Argument count mismatch in function call: expected {}, found {}",
                    inputs.len(),
                    arg_types.len()
                ),
                position.clone(),
            );
        }

        let mut bindings = HashMap::new();
        for ((syntax, _), actual) in inputs.iter().zip(&arg_types) {
            if let Err(message) = self.bind(*syntax, *actual, &mut bindings) {
                return self.error(message, position.clone());
            }
        }
        let mut bound = Vec::with_capacity(generic.params.len());
        for name in &generic.params {
            match bindings.get(name) {
                Some(ty) => bound.push(*ty),
                None => {
                    return self.error(
                        format!("Cannot infer generic parameter \"{}\" from the arguments", name),
                        position.clone(),
                    );
                }
            }
        }

        let specialization = match self.specializations.get(definition, &bound) {
            Some(cached) => cached,
            None => {
                let created = ready!(self.instantiate(definition, &generic.params, &bound)?);
                self.specializations.insert(definition, bound.clone(), created);
                debug!(
                    "specialized generic at {} for ({})",
                    self.unit.value(definition).position,
                    bound
                        .iter()
                        .map(|ty| self.display(*ty))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                created
            }
        };

        if let ValueKind::FunctionCall {
            specialization: slot,
            ..
        } = &mut self.unit.value_mut(call).kind
        {
            *slot = Some(specialization);
        }
        self.progress = true;
        Ok(Resolution::Resolved(specialization))
    }

    /// Parse the generic body again in a scope declaring each parameter as
    /// the type it is bound to
    fn instantiate(
        &mut self,
        definition: ValueId,
        params: &[String],
        bound: &[TypeId],
    ) -> CompileResult<Resolution<ValueId>> {
        let (parent, start) = {
            let value = self.unit.value(definition);
            (value.scope, value.position.clone())
        };
        let Some(tokens) = self
            .unit
            .function(definition)
            .and_then(|f| f.generic.as_ref())
            .map(|g| g.tokens)
        else {
            return Ok(Resolution::Failed);
        };

        let scope = self.unit.add_scope(Scope::new(
            ScopeKind::Static,
            Some(parent),
            ScopeOwner::Substitution,
            start.clone(),
        ));
        let type_ = self.session.types.builtins().type_;
        for (name, ty) in params.iter().zip(bound) {
            let ident = match declare(self.unit, scope, name, start.clone()) {
                Ok(ident) => ident,
                Err(diagnostic) => {
                    self.report(*diagnostic)?;
                    return Ok(Resolution::Failed);
                }
            };
            self.set_ident_type(ident, type_, Some(ConstValue::Type(*ty)));
        }

        match parser::parse_specialization(self.unit, self.session, tokens, scope) {
            Ok(function) => Ok(Resolution::Resolved(function)),
            Err(CompileError::Aborted) => Ok(Resolution::Failed),
            Err(err) => Err(err),
        }
    }

    /// Match a parameter type as written against an argument type, binding
    /// every `$name` met on the way
    fn bind(
        &self,
        syntax: TypeId,
        actual: TypeId,
        bindings: &mut HashMap<String, TypeId>,
    ) -> Result<(), String> {
        let types = &self.session.types;
        match (types.get(syntax), types.get(actual)) {
            (TypeDescriptor::Unresolved { name, deciding: true, .. }, _) => {
                match bindings.get(name) {
                    Some(previous) if *previous != actual => Err(format!(
                        "Conflicting types for generic parameter \"{}\": {} and {}",
                        name,
                        types.display(*previous),
                        types.display(actual)
                    )),
                    _ => {
                        bindings.insert(name.clone(), actual);
                        Ok(())
                    }
                }
            }
            (
                TypeDescriptor::Function { inputs, outputs },
                TypeDescriptor::Function {
                    inputs: actual_inputs,
                    outputs: actual_outputs,
                },
            ) if inputs.len() == actual_inputs.len() && outputs.len() == actual_outputs.len() => {
                let pairs = inputs
                    .iter()
                    .zip(actual_inputs)
                    .chain(outputs.iter().zip(actual_outputs));
                for (syntax, actual) in pairs {
                    self.bind(*syntax, *actual, bindings)?;
                }
                Ok(())
            }
            (
                TypeDescriptor::Array { element, .. },
                TypeDescriptor::Array {
                    element: actual_element,
                    ..
                },
            ) => self.bind(*element, *actual_element, bindings),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Compiler, CompilerConfig};
    use pretty_assertions::assert_eq;

    fn analyze(source: &str) -> crate::driver::Analysis {
        Compiler::new(CompilerConfig::quiet())
            .analyze_source("main.cb", source)
            .unwrap()
    }

    #[test]
    fn test_cache_keys_on_bound_types() {
        let mut cache = SpecializationCache::new();
        let generic = ValueId(3);
        cache.insert(generic, vec![TypeId(1)], ValueId(10));
        cache.insert(generic, vec![TypeId(2)], ValueId(11));

        assert_eq!(cache.get(generic, &[TypeId(1)]), Some(ValueId(10)));
        assert_eq!(cache.get(generic, &[TypeId(2)]), Some(ValueId(11)));
        assert_eq!(cache.get(ValueId(4), &[TypeId(1)]), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_equal_bindings_share_a_specialization() {
        let analysis = analyze(
            "id := fn(x: $T) -> T { return x; };\n\
             main := fn() {\n\
                 a := id(1);\n\
                 b := id(2);\n\
                 c := id(1.5);\n\
             };\n",
        );

        assert_eq!(analysis.error_messages(), Vec::<String>::new());
        assert_eq!(analysis.specializations.len(), 2);

        let builtins = *analysis.session.types.builtins();
        let bound: Vec<Vec<TypeId>> = {
            let mut bound: Vec<Vec<TypeId>> =
                analysis.specializations.iter().map(|(_, b, _)| b.to_vec()).collect();
            bound.sort();
            bound
        };
        let mut expected = vec![vec![builtins.int], vec![builtins.float]];
        expected.sort();
        assert_eq!(bound, expected);
    }

    #[test]
    fn test_specialized_call_types() {
        let analysis = analyze(
            "pair := fn(x: $T, y: T) -> T { return x; };\n\
             main := fn() { f := pair(1.0, 2.0); };\n",
        );

        assert_eq!(analysis.error_messages(), Vec::<String>::new());
        let specs: Vec<ValueId> = analysis.specializations.iter().map(|(_, _, s)| s).collect();
        assert_eq!(specs.len(), 1);
        let ty = analysis.unit.value(specs[0]).ty.unwrap();
        assert_eq!(analysis.session.types.display(ty), "fn(float, float) -> float");
    }

    #[test]
    fn test_conflicting_bindings() {
        let analysis = analyze(
            "same := fn(x: $T, y: $T) { };\n\
             main := fn() { same(1, 2.0); };\n",
        );

        assert_eq!(
            analysis.error_messages(),
            vec!["Conflicting types for generic parameter \"T\": int and float".to_string()]
        );
        assert!(analysis.specializations.is_empty());
    }

    #[test]
    fn test_named_arguments_rejected() {
        let analysis = analyze(
            "id := fn(x: $T) -> T { return x; };\n\
             main := fn() { id(x = 1); };\n",
        );

        assert_eq!(
            analysis.error_messages(),
            vec!["Named arguments are not supported in calls to generic functions".to_string()]
        );
    }

    #[test]
    fn test_binding_through_function_type() {
        let analysis = analyze(
            "apply := fn(f: fn($T) -> T, x: T) -> T { return f(x); };\n\
             twice := fn(v: int) -> int { return v * 2; };\n\
             main := fn() { r := apply(twice, 3); };\n",
        );

        assert_eq!(analysis.error_messages(), Vec::<String>::new());
        let bound: Vec<Vec<TypeId>> = analysis
            .specializations
            .iter()
            .map(|(_, b, _)| b.to_vec())
            .collect();
        assert_eq!(bound, vec![vec![analysis.session.types.builtins().int]]);
    }

    #[test]
    fn test_parameter_only_in_default_reported_once() {
        let analysis = analyze(
            "f := fn(x: int, y: $T = 1) { };\n\
             main := fn() { f(1); f(2); };\n",
        );

        assert_eq!(
            analysis.error_messages(),
            vec![
                "Generic type \"$T\" must appear in a parameter without a default value"
                    .to_string()
            ]
        );
    }
}
