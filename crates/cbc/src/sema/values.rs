//! Typing of value nodes and type syntax

use super::{Dependency, Lookup, Resolution, Resolver, lookup, lookup_eager, ready};
use crate::ast::{
    CompileUnit, ConstValue, Function, IdentId, InfixOp, LiteralKind, NamedArg, ScopeId, ValueId,
    ValueKind,
};
use crate::common::{CompileResult, Diagnostic, Position};
use crate::types::{StructMember, TypeDescriptor, TypeId};

/// The function definition a callee refers to, when it is known at compile
/// time: a literal `fn` value or a name bound to one.
pub fn callee_definition(unit: &CompileUnit, callee: ValueId) -> Option<ValueId> {
    let target = match &unit.value(callee).kind {
        ValueKind::Function(_) => return Some(callee),
        ValueKind::Identifier { target, .. } | ValueKind::Getter { target, .. } => (*target)?,
        _ => return None,
    };
    match unit.ident(target).value {
        Some(ConstValue::Function(function)) => Some(function),
        _ => None,
    }
}

impl Resolver<'_> {
    /// Type of a value, written into the node once known
    pub fn type_of(&mut self, value: ValueId) -> CompileResult<Resolution<TypeId>> {
        if let Some(ty) = self.unit.value(value).get_type() {
            return Ok(Resolution::Resolved(ty));
        }
        if self.failed_values.contains(&value) {
            return Ok(Resolution::Failed);
        }

        let result = self.compute_type(value)?;
        match result {
            Resolution::Resolved(ty) => {
                self.unit.value_mut(value).ty = Some(ty);
            }
            Resolution::Failed => {
                self.failed_values.insert(value);
            }
            Resolution::Pending => {}
        }
        Ok(result)
    }

    pub(super) fn type_all(
        &mut self,
        values: &[ValueId],
    ) -> CompileResult<Resolution<Vec<TypeId>>> {
        let mut results = Vec::with_capacity(values.len());
        for value in values {
            results.push(self.type_of(*value)?);
        }
        Ok(Resolution::collect(results))
    }

    fn compute_type(&mut self, value: ValueId) -> CompileResult<Resolution<TypeId>> {
        let node = self.unit.value(value);
        let scope = node.scope;
        let position = node.position.clone();
        let kind = node.kind.clone();
        let builtins = *self.session.types.builtins();

        match kind {
            ValueKind::Literal { kind, .. } => Ok(Resolution::Resolved(match kind {
                LiteralKind::Integer => builtins.int,
                LiteralKind::Float => builtins.float,
                LiteralKind::String => builtins.string,
                LiteralKind::Bool => builtins.bool,
            })),
            ValueKind::Identifier { name, target } => {
                let ident = match target {
                    Some(ident) => ident,
                    None => {
                        let ident = ready!(self.resolve_name(scope, &name, &position)?);
                        if let ValueKind::Identifier { target, .. } =
                            &mut self.unit.value_mut(value).kind
                        {
                            *target = Some(ident);
                        }
                        ident
                    }
                };
                Ok(self.ident_type(ident))
            }
            ValueKind::InfixOp { lhs, op, rhs, .. } => {
                self.type_infix(value, scope, lhs, op, rhs, position)
            }
            ValueKind::FunctionCall {
                callee,
                args,
                named,
                specialization,
            } => {
                let callee_ty = ready!(self.type_of(callee)?);
                if callee_ty == builtins.generic_fn {
                    return self.resolve_generic_call(value, callee, &args, &named, specialization);
                }
                let definition = callee_definition(self.unit, callee);
                self.check_call(callee_ty, definition, &args, &named, position)
            }
            ValueKind::Getter { subject, member, .. } => {
                self.type_getter(value, subject, &member, position)
            }
            ValueKind::Cast { subject, target } => {
                let from = self.type_of(subject)?;
                let to = self.resolve_named_type(scope, &target, &position)?;
                if from.is_failed() || to.is_failed() {
                    return Ok(Resolution::Failed);
                }
                let (from, to) = (ready!(from), ready!(to));
                let types = &self.session.types;
                if from == to || (types.is_numeric(from) && types.is_numeric(to)) {
                    Ok(Resolution::Resolved(to))
                } else {
                    self.error(
                        format!(
                            "Cannot cast a value of type {} to {}",
                            self.display(from),
                            self.display(to)
                        ),
                        position,
                    )
                }
            }
            ValueKind::ArrayLookup { subject, index } => {
                let types = ready!(self.type_all(&[subject, index])?);
                let TypeDescriptor::Array { element, .. } = *self.session.types.get(types[0]) else {
                    return self.error(
                        format!(
                            "Cannot index a value of non-array type {}",
                            self.display(types[0])
                        ),
                        position,
                    );
                };
                if !self.session.types.is_integer(types[1]) {
                    let index_position = self.unit.value(index).position.clone();
                    return self.error(
                        format!("Array index must be an integer, found {}", self.display(types[1])),
                        index_position,
                    );
                }
                Ok(Resolution::Resolved(element))
            }
            ValueKind::ValueList(items) => {
                let types = ready!(self.type_all(&items)?);
                let flat: Vec<TypeId> = types
                    .into_iter()
                    .flat_map(|ty| self.session.types.expand(ty))
                    .collect();
                Ok(Resolution::Resolved(self.session.types.type_list(flat)))
            }
            ValueKind::Function(function) => self.type_function(scope, &function),
            ValueKind::TypeDescriptor { syntax, .. } => {
                let resolved = ready!(self.resolve_type(scope, syntax)?);
                if let ValueKind::TypeDescriptor { resolved: slot, .. } =
                    &mut self.unit.value_mut(value).kind
                {
                    *slot = Some(resolved);
                }
                Ok(Resolution::Resolved(builtins.type_))
            }
            ValueKind::Scope(_) => Ok(Resolution::Resolved(builtins.scope)),
        }
    }

    fn ident_type(&mut self, ident: IdentId) -> Resolution<TypeId> {
        match self.unit.ident(ident).ty {
            Some(ty) => Resolution::Resolved(ty),
            None => self.wait(Dependency::Identifier(ident)),
        }
    }

    // ==================== Names ====================

    /// Bind a name used at `position`, reporting lookup errors
    pub(super) fn resolve_name(
        &mut self,
        scope: ScopeId,
        name: &str,
        position: &Position,
    ) -> CompileResult<Resolution<IdentId>> {
        let found = if self.eager_lookups {
            lookup_eager(self.unit, scope, name, position)
        } else {
            lookup(self.unit, scope, name, position)
        };
        match found {
            Lookup::Found { ident, others } => {
                if !others.is_empty() && self.reported_ambiguities.insert(position.clone()) {
                    let mut diagnostic = Diagnostic::error(
                        format!("Ambiguous reference to identifier \"{}\"", name),
                        position.clone(),
                    );
                    for candidate in std::iter::once(ident).chain(others) {
                        let declared = self.unit.ident(candidate).position.clone();
                        diagnostic = diagnostic.with_note("Declared here", declared);
                    }
                    self.report(diagnostic)?;
                }
                Ok(Resolution::Resolved(ident))
            }
            Lookup::Pending(blocked) => Ok(self.wait(Dependency::Imports(blocked))),
            Lookup::TooEarly(ident) => {
                let declared = self.unit.ident(ident).position.clone();
                self.report(
                    Diagnostic::error(
                        format!("Identifier \"{}\" used before its declaration", name),
                        position.clone(),
                    )
                    .with_note("Declared here", declared),
                )?;
                Ok(Resolution::Failed)
            }
            Lookup::NotFound => self.error(
                format!("Identifier \"{}\" could not be found", name),
                position.clone(),
            ),
        }
    }

    /// A name in type position: must be bound to a constant of type `type`
    pub(super) fn resolve_named_type(
        &mut self,
        scope: ScopeId,
        name: &str,
        position: &Position,
    ) -> CompileResult<Resolution<TypeId>> {
        let ident = ready!(self.resolve_name(scope, name, position)?);
        let ty = ready!(self.ident_type(ident));
        match self.unit.ident(ident).value {
            Some(ConstValue::Type(resolved)) if ty == self.session.types.builtins().type_ => {
                Ok(Resolution::Resolved(resolved))
            }
            _ => self.error(format!("\"{}\" is not a type", name), position.clone()),
        }
    }

    /// Replace every placeholder in `syntax` by the type its name is bound
    /// to in `scope`. Resolved structs get a new nominal identity once,
    /// which later requests reuse.
    pub fn resolve_type(
        &mut self,
        scope: ScopeId,
        syntax: TypeId,
    ) -> CompileResult<Resolution<TypeId>> {
        if let Some(resolved) = self.resolved_types.get(&syntax) {
            return Ok(Resolution::Resolved(*resolved));
        }
        if self.session.types.is_resolved(syntax) {
            return Ok(Resolution::Resolved(syntax));
        }

        let resolved = match self.session.types.get(syntax).clone() {
            TypeDescriptor::Primitive { .. } => syntax,
            TypeDescriptor::Unresolved { name, position, .. } => {
                ready!(self.resolve_named_type(scope, &name, &position)?)
            }
            TypeDescriptor::Function { inputs, outputs } => {
                let inputs = self.resolve_types(scope, &inputs)?;
                let outputs = self.resolve_types(scope, &outputs)?;
                if inputs.is_failed() || outputs.is_failed() {
                    return Ok(Resolution::Failed);
                }
                let (inputs, outputs) = (ready!(inputs), ready!(outputs));
                self.session.types.function(inputs, outputs)
            }
            TypeDescriptor::Array { element, size } => {
                let element = ready!(self.resolve_type(scope, element)?);
                self.session.types.array(element, size)
            }
            TypeDescriptor::TypeList(items) => {
                let items = ready!(self.resolve_types(scope, &items)?);
                self.session.types.type_list(items)
            }
            TypeDescriptor::Struct { members, .. } => {
                let member_types: Vec<TypeId> = members.iter().map(|m| m.ty).collect();
                let member_types = ready!(self.resolve_types(scope, &member_types)?);
                ready!(self.check_member_defaults(&members, &member_types)?);
                let members = members
                    .into_iter()
                    .zip(member_types)
                    .map(|(member, ty)| StructMember { ty, ..member })
                    .collect();
                self.session.types.new_struct(members)
            }
        };
        self.resolved_types.insert(syntax, resolved);
        Ok(Resolution::Resolved(resolved))
    }

    fn resolve_types(
        &mut self,
        scope: ScopeId,
        syntax: &[TypeId],
    ) -> CompileResult<Resolution<Vec<TypeId>>> {
        let mut results = Vec::with_capacity(syntax.len());
        for ty in syntax {
            results.push(self.resolve_type(scope, *ty)?);
        }
        Ok(Resolution::collect(results))
    }

    fn check_member_defaults(
        &mut self,
        members: &[StructMember],
        types: &[TypeId],
    ) -> CompileResult<Resolution<()>> {
        let defaults: Vec<ValueId> = members.iter().filter_map(|m| m.default).collect();
        ready!(self.type_all(&defaults)?);
        for (member, expected) in members.iter().zip(types) {
            let Some(default) = member.default else { continue };
            let found = ready!(self.type_of(default)?);
            if !self.assignable(*expected, found) {
                return self.error(
                    format!(
                        "Type mismatch in default value of member \"{}\": expected {}, found {}",
                        member.name,
                        self.display(*expected),
                        self.display(found)
                    ),
                    member.position.clone(),
                );
            }
        }
        Ok(Resolution::Resolved(()))
    }

    // ==================== Compile-time values ====================

    /// Constant a value evaluates to, if known at compile time
    pub(super) fn const_value(&self, value: ValueId) -> Option<ConstValue> {
        match &self.unit.value(value).kind {
            ValueKind::Literal { kind, text } => match kind {
                LiteralKind::Integer => text.parse().ok().map(ConstValue::Int),
                LiteralKind::Float => text.parse().ok().map(ConstValue::Float),
                LiteralKind::String => Some(ConstValue::Str(text.clone())),
                LiteralKind::Bool => Some(ConstValue::Bool(text == "true")),
            },
            ValueKind::Identifier {
                target: Some(ident), ..
            }
            | ValueKind::Getter {
                target: Some(ident), ..
            } => self.unit.ident(*ident).value.clone(),
            ValueKind::Function(_) => Some(ConstValue::Function(value)),
            ValueKind::TypeDescriptor {
                resolved: Some(ty), ..
            } => Some(ConstValue::Type(*ty)),
            ValueKind::Scope(scope) => Some(ConstValue::Scope(*scope)),
            _ => None,
        }
    }

    // ==================== Operators ====================

    fn type_infix(
        &mut self,
        value: ValueId,
        scope: ScopeId,
        lhs: ValueId,
        op: InfixOp,
        rhs: ValueId,
        position: Position,
    ) -> CompileResult<Resolution<TypeId>> {
        let types = ready!(self.type_all(&[lhs, rhs])?);
        let (left, right) = (types[0], types[1]);
        let table = &self.session.types;
        let bool_ty = table.builtins().bool;

        let builtin = if op.is_arithmetic() {
            (left == right && table.is_numeric(left)).then_some(left)
        } else if op.is_logical() {
            (left == bool_ty && right == bool_ty).then_some(bool_ty)
        } else {
            let comparable = table.is_numeric(left)
                || left == bool_ty
                || left == table.builtins().string;
            (left == right && comparable).then_some(bool_ty)
        };
        if let Some(ty) = builtin {
            return Ok(Resolution::Resolved(ty));
        }

        let key = self.operator_key(op.symbol(), left, right);
        match self.find_operator(scope, &key) {
            OperatorSearch::Found(function) => {
                if let ValueKind::InfixOp { overload, .. } = &mut self.unit.value_mut(value).kind {
                    *overload = Some(function);
                }
                let function_ty = ready!(self.type_of(function)?);
                match self.session.types.get(function_ty) {
                    TypeDescriptor::Function { outputs, .. } if outputs.len() == 1 => {
                        Ok(Resolution::Resolved(outputs[0]))
                    }
                    _ => Ok(Resolution::Failed),
                }
            }
            OperatorSearch::Pending(decl) => Ok(self.wait(Dependency::Statement(decl))),
            OperatorSearch::NotFound => self.error(
                format!(
                    "No operator \"{}\" defined for types {} and {}",
                    op,
                    self.display(left),
                    self.display(right)
                ),
                position,
            ),
        }
    }

    /// Operator tables are searched like identifiers: each scope on the
    /// parent chain, then its direct imports
    fn find_operator(&self, scope: ScopeId, key: &str) -> OperatorSearch {
        let mut pending = None;
        let mut current = Some(scope);
        while let Some(id) = current {
            let table = self.unit.scope(id);
            for candidate in std::iter::once(id).chain(table.imports.iter().copied()) {
                let searched = self.unit.scope(candidate);
                if let Some(function) = searched.operators.get(key) {
                    return OperatorSearch::Found(*function);
                }
                if pending.is_none() {
                    pending = searched
                        .operator_decls
                        .iter()
                        .copied()
                        .find(|decl| !self.unit.stmt(*decl).status.is_terminal());
                }
            }
            current = table.parent;
        }
        pending.map_or(OperatorSearch::NotFound, OperatorSearch::Pending)
    }

    // ==================== Calls ====================

    /// Match arguments against a function type. `definition` supplies
    /// parameter names and defaults when the callee is known.
    pub(super) fn check_call(
        &mut self,
        callee_ty: TypeId,
        definition: Option<ValueId>,
        args: &[ValueId],
        named: &[NamedArg],
        position: Position,
    ) -> CompileResult<Resolution<TypeId>> {
        let TypeDescriptor::Function { inputs, outputs } = self.session.types.get(callee_ty).clone()
        else {
            return self.error(
                format!(
                    "Cannot call a value of non-function type {}",
                    self.display(callee_ty)
                ),
                position,
            );
        };

        let named_values: Vec<ValueId> = named.iter().map(|n| n.value).collect();
        let positional = self.expanded_types(args)?;
        let named_types = self.type_all(&named_values)?;
        if positional.is_failed() || named_types.is_failed() {
            return Ok(Resolution::Failed);
        }
        let positional = ready!(positional);
        let named_types = ready!(named_types);

        if positional.len() > inputs.len() {
            return self.error(
                format!(
                    "Argument count mismatch in function call: expected {}, found {}",
                    inputs.len(),
                    positional.len()
                ),
                position,
            );
        }

        let params = definition.and_then(|d| self.unit.function(d)).map(|f| f.inputs.clone());
        let mut given: Vec<Option<TypeId>> = vec![None; inputs.len()];
        for (slot, ty) in given.iter_mut().zip(&positional) {
            *slot = Some(*ty);
        }
        for (arg, ty) in named.iter().zip(named_types) {
            let index = params
                .as_ref()
                .and_then(|params| params.iter().position(|p| p.name == arg.name))
                .filter(|index| *index < given.len());
            let Some(index) = index else {
                return self.error(
                    format!("Function has no parameter named \"{}\"", arg.name),
                    arg.position.clone(),
                );
            };
            if given[index].is_some() {
                return self.error(
                    format!("Parameter \"{}\" is given more than once", arg.name),
                    arg.position.clone(),
                );
            }
            given[index] = Some(ty);
        }

        for (index, found) in given.iter().enumerate() {
            if found.is_some() {
                continue;
            }
            let param = params.as_ref().and_then(|params| params.get(index));
            if param.is_some_and(|p| p.default.is_some()) {
                continue;
            }
            let message = match param {
                Some(param) if !named.is_empty() => {
                    format!("Missing argument for parameter \"{}\"", param.name)
                }
                _ => format!(
                    "Argument count mismatch in function call: expected {}, found {}",
                    inputs.len(),
                    positional.len() + named.len()
                ),
            };
            return self.error(message, position);
        }

        for (expected, found) in inputs.iter().zip(&given) {
            if let Some(found) = found {
                if !self.assignable(*expected, *found) {
                    return self.error(
                        format!(
                            "Argument type mismatch in function call: expected {}, found {}",
                            self.display(*expected),
                            self.display(*found)
                        ),
                        position,
                    );
                }
            }
        }

        let builtins = *self.session.types.builtins();
        Ok(Resolution::Resolved(match outputs.len() {
            0 => builtins.void,
            1 => outputs[0],
            _ => self.session.types.type_list(outputs),
        }))
    }

    // ==================== Members ====================

    fn type_getter(
        &mut self,
        value: ValueId,
        subject: ValueId,
        member: &str,
        position: Position,
    ) -> CompileResult<Resolution<TypeId>> {
        let subject_ty = ready!(self.type_of(subject)?);
        let builtins = *self.session.types.builtins();

        if subject_ty == builtins.scope {
            if let Some(ConstValue::Scope(scope)) = self.const_value(subject) {
                let Some(ident) = self.unit.declared_in(scope, member) else {
                    return self.error(
                        format!("Identifier \"{}\" could not be found", member),
                        position,
                    );
                };
                if let ValueKind::Getter { target, .. } = &mut self.unit.value_mut(value).kind {
                    *target = Some(ident);
                }
                return Ok(self.ident_type(ident));
            }
        }

        match self.session.types.get(subject_ty) {
            TypeDescriptor::Struct { .. } => match self.find_member(subject_ty, member) {
                Some(ty) => Ok(Resolution::Resolved(ty)),
                None => self.error(
                    format!(
                        "Struct {} has no member named \"{}\"",
                        self.display(subject_ty),
                        member
                    ),
                    position,
                ),
            },
            TypeDescriptor::Array { .. } if member == "count" => {
                Ok(Resolution::Resolved(builtins.int))
            }
            _ => self.error(
                format!(
                    "Cannot access member \"{}\" of a value of type {}",
                    member,
                    self.display(subject_ty)
                ),
                position,
            ),
        }
    }

    /// Member type, looking through `using` members
    fn find_member(&self, ty: TypeId, name: &str) -> Option<TypeId> {
        let TypeDescriptor::Struct { members, .. } = self.session.types.get(ty) else {
            return None;
        };
        if let Some(member) = members.iter().find(|m| m.name == name) {
            return Some(member.ty);
        }
        members
            .iter()
            .filter(|m| m.merged)
            .find_map(|m| self.find_member(m.ty, name))
    }

    // ==================== Functions ====================

    /// Resolve a definition's signature, check parameter defaults and give
    /// the parameters declared in the body their types
    fn type_function(
        &mut self,
        scope: ScopeId,
        function: &Function,
    ) -> CompileResult<Resolution<TypeId>> {
        let inputs: Vec<TypeId> = function.inputs.iter().map(|p| p.ty).collect();
        let outputs: Vec<TypeId> = function.outputs.iter().map(|p| p.ty).collect();
        let inputs = self.resolve_types(scope, &inputs)?;
        let outputs = self.resolve_types(scope, &outputs)?;
        let defaults: Vec<ValueId> = function.inputs.iter().filter_map(|p| p.default).collect();
        let default_types = self.type_all(&defaults)?;

        if inputs.is_failed() || outputs.is_failed() || default_types.is_failed() {
            self.fail_parameters(function);
            return Ok(Resolution::Failed);
        }
        let (inputs, outputs) = (ready!(inputs), ready!(outputs));
        ready!(default_types);

        for (param, expected) in function.inputs.iter().zip(&inputs) {
            let Some(default) = param.default else { continue };
            let found = ready!(self.type_of(default)?);
            if !self.assignable(*expected, found) {
                self.fail_parameters(function);
                return self.error(
                    format!(
                        "Type mismatch in default value of parameter \"{}\": expected {}, found {}",
                        param.name,
                        self.display(*expected),
                        self.display(found)
                    ),
                    param.position.clone(),
                );
            }
        }

        let params = function.inputs.iter().zip(&inputs);
        let results = function.outputs.iter().zip(&outputs);
        for (param, ty) in params.chain(results) {
            if let Some(ident) = param.ident {
                self.set_ident_type(ident, *ty, None);
            }
        }
        Ok(Resolution::Resolved(self.session.types.function(inputs, outputs)))
    }

    fn fail_parameters(&mut self, function: &Function) {
        for param in function.inputs.iter().chain(&function.outputs) {
            if let Some(ident) = param.ident {
                self.unit.ident_mut(ident).failed = true;
            }
        }
    }
}

enum OperatorSearch {
    Found(ValueId),
    /// An operator declaration that could still register the key
    Pending(crate::ast::StmtId),
    NotFound,
}
