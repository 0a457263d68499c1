//! Driver loop and statement rules

use super::{
    Dependency, DependencyTable, Resolution, SpecializationCache, callee_definition, ready,
};
use crate::ast::{
    AssignOp, CompileUnit, ConstValue, IdentId, NamedArg, ResolutionStatus, ScopeId,
    StatementKind, StmtId, ValueId, ValueKind,
};
use crate::common::{CompileResult, Diagnostic, Position};
use crate::driver::SourceLoader;
use crate::session::Session;
use crate::types::{TypeDescriptor, TypeId};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};

/// Resolves every statement of a compile unit
pub struct Resolver<'a> {
    pub(super) unit: &'a mut CompileUnit,
    pub(super) session: &'a mut Session,
    pub(super) loader: &'a dyn SourceLoader,
    pub(super) deps: DependencyTable,
    pub(super) specializations: SpecializationCache,
    /// Syntax type (with placeholders) to its resolved type
    pub(super) resolved_types: HashMap<TypeId, TypeId>,
    /// Values whose error has been reported
    pub(super) failed_values: HashSet<ValueId>,
    /// Use sites whose ambiguity has been reported
    pub(super) reported_ambiguities: HashSet<Position>,
    /// Statement being attempted; receives registered dependencies
    pub(super) current: Option<StmtId>,
    /// Set while typing a `using` subject
    pub(super) eager_lookups: bool,
    pub(super) progress: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(
        unit: &'a mut CompileUnit,
        session: &'a mut Session,
        loader: &'a dyn SourceLoader,
    ) -> Self {
        Self {
            unit,
            session,
            loader,
            deps: DependencyTable::new(),
            specializations: SpecializationCache::new(),
            resolved_types: HashMap::new(),
            failed_values: HashSet::new(),
            reported_ambiguities: HashSet::new(),
            current: None,
            eager_lookups: false,
            progress: false,
        }
    }

    /// Run passes until nothing changes, then report what is left.
    ///
    /// Scopes, statements and sources may be added while a pass runs
    /// (imported files, specializations); they join the same pass.
    pub fn resolve(&mut self) -> CompileResult<()> {
        let mut pass = 0;
        loop {
            pass += 1;
            self.progress = false;

            let mut scope = 0;
            while scope < self.unit.scope_count() {
                self.resolve_imports(ScopeId(scope))?;
                scope += 1;
            }

            let mut index = 0;
            while index < self.unit.statement_count() {
                let stmt = StmtId(index);
                index += 1;
                if !matches!(self.unit.stmt(stmt).kind, StatementKind::Using { .. }) {
                    self.attempt(stmt)?;
                }
            }

            debug!(
                "resolver pass {}: {} statements, {} unresolved",
                pass,
                self.unit.statement_count(),
                self.unresolved().len()
            );
            if self.progress {
                continue;
            }
            if !self.freeze_imports() {
                break;
            }
        }
        self.report_unresolved()
    }

    /// Consume the resolver, keeping the specializations it created
    pub fn finish(self) -> SpecializationCache {
        self.specializations
    }

    pub fn specializations(&self) -> &SpecializationCache {
        &self.specializations
    }

    /// Try to bring `stmt` to a terminal status. Returns true when it got
    /// there during this call.
    pub(super) fn attempt(&mut self, stmt: StmtId) -> CompileResult<bool> {
        if self.unit.stmt(stmt).status.is_terminal() || self.deps.pending_count(stmt) > 0 {
            return Ok(false);
        }

        let outer = self.current.replace(stmt);
        let result = self.apply_rule(stmt);
        self.current = outer;

        let status = match result? {
            Resolution::Resolved(()) => ResolutionStatus::Resolved,
            Resolution::Failed => {
                self.fail_declared_by(stmt);
                ResolutionStatus::TypeError
            }
            Resolution::Pending => {
                trace!(
                    "{} at {} parked on {:?}",
                    self.unit.stmt(stmt).kind.describe(),
                    self.unit.stmt(stmt).position,
                    self.deps.blocked_on(stmt)
                );
                self.unit.stmt_mut(stmt).status = ResolutionStatus::AwaitingDependencies;
                return Ok(false);
            }
        };

        self.unit.stmt_mut(stmt).status = status;
        self.progress = true;
        self.deps.satisfy(Dependency::Statement(stmt));
        if matches!(self.unit.stmt(stmt).kind, StatementKind::Using { .. }) {
            let scope = self.unit.stmt(stmt).scope;
            self.deps.satisfy(Dependency::Imports(scope));
        }
        Ok(true)
    }

    fn apply_rule(&mut self, stmt: StmtId) -> CompileResult<Resolution<()>> {
        let kind = self.unit.stmt(stmt).kind.clone();
        let position = self.unit.stmt(stmt).position.clone();
        match kind {
            StatementKind::Declaration {
                groups,
                types,
                values,
            } => self.resolve_declaration(&groups, &types, &values, position),
            StatementKind::Assignment {
                targets,
                op,
                values,
            } => self.resolve_assignment(&targets, op, &values, position),
            StatementKind::If { branches, .. } => {
                let conditions: Vec<ValueId> = branches.iter().map(|b| b.condition).collect();
                self.resolve_conditions(&conditions)
            }
            StatementKind::While { condition, .. } => self.resolve_conditions(&[condition]),
            StatementKind::For {
                iterator,
                start,
                end,
                step,
                ..
            } => self.resolve_for(iterator, start, end, step),
            StatementKind::Return { values, named } => {
                let scope = self.unit.stmt(stmt).scope;
                self.resolve_return(scope, &values, &named, position)
            }
            StatementKind::Using { subject } => {
                let scope = self.unit.stmt(stmt).scope;
                self.resolve_using(scope, subject, position)
            }
            StatementKind::Call(call) => Ok(self.type_of(call)?.map(|_| ())),
            StatementKind::Block(_) => Ok(Resolution::Resolved(())),
            StatementKind::Malformed => Ok(Resolution::Failed),
            StatementKind::Operator { op, function } => {
                let scope = self.unit.stmt(stmt).scope;
                self.resolve_operator(scope, op.symbol(), function, position)
            }
        }
    }

    // ==================== Dependencies ====================

    /// Park the current statement on `dependency`
    pub(super) fn wait<T>(&mut self, dependency: Dependency) -> Resolution<T> {
        if let Some(stmt) = self.current {
            self.deps.register(stmt, dependency);
        }
        Resolution::Pending
    }

    pub(super) fn report(&mut self, diagnostic: Diagnostic) -> CompileResult<()> {
        self.session.report(diagnostic)
    }

    /// Report an error and fail
    pub(super) fn error<T>(
        &mut self,
        message: impl Into<String>,
        position: Position,
    ) -> CompileResult<Resolution<T>> {
        self.report(Diagnostic::error(message, position))?;
        Ok(Resolution::Failed)
    }

    /// Write an identifier's type once and wake its dependents
    pub(super) fn set_ident_type(&mut self, ident: IdentId, ty: TypeId, value: Option<ConstValue>) {
        let record = self.unit.ident_mut(ident);
        if record.ty.is_some() {
            return;
        }
        record.ty = Some(ty);
        if record.value.is_none() {
            record.value = value;
        }
        self.progress = true;
        self.deps.satisfy(Dependency::Identifier(ident));
    }

    /// Identifiers whose type only a failed statement could have given
    fn fail_declared_by(&mut self, stmt: StmtId) {
        let idents: Vec<IdentId> = match &self.unit.stmt(stmt).kind {
            StatementKind::Declaration { groups, .. } => groups.iter().flatten().copied().collect(),
            StatementKind::For { iterator, .. } => vec![*iterator],
            _ => Vec::new(),
        };
        for ident in idents {
            if self.unit.ident(ident).ty.is_none() {
                self.unit.ident_mut(ident).failed = true;
            }
        }
    }

    /// `expected` accepts a value of type `found`: equal, or both integer or
    /// both floating point primitives
    pub(super) fn assignable(&self, expected: TypeId, found: TypeId) -> bool {
        let types = &self.session.types;
        expected == found
            || (types.is_integer(expected) && types.is_integer(found))
            || (types.is_float(expected) && types.is_float(found))
    }

    pub(super) fn display(&self, ty: TypeId) -> String {
        self.session.types.display(ty)
    }

    /// Types of `values`, multi-value results flattened
    pub(super) fn expanded_types(
        &mut self,
        values: &[ValueId],
    ) -> CompileResult<Resolution<Vec<TypeId>>> {
        let types = ready!(self.type_all(values)?);
        Ok(Resolution::Resolved(
            types
                .into_iter()
                .flat_map(|ty| self.session.types.expand(ty))
                .collect(),
        ))
    }

    // ==================== Statement rules ====================

    fn resolve_declaration(
        &mut self,
        groups: &[Vec<IdentId>],
        types: &[TypeId],
        values: &[ValueId],
        position: Position,
    ) -> CompileResult<Resolution<()>> {
        let scope = match groups.first().and_then(|g| g.first()) {
            Some(ident) => self.unit.ident(*ident).scope,
            None => return Ok(Resolution::Resolved(())),
        };
        let declared = Resolution::collect(
            types
                .iter()
                .map(|ty| self.resolve_type(scope, *ty))
                .collect::<CompileResult<Vec<_>>>()?,
        );
        let value_types = if values.is_empty() {
            Resolution::Resolved(Vec::new())
        } else {
            self.expanded_types(values)?
        };
        if declared.is_failed() || value_types.is_failed() {
            return Ok(Resolution::Failed);
        }
        let declared = ready!(declared);
        let value_types = ready!(value_types);

        if values.is_empty() {
            for (group, ty) in groups.iter().zip(&declared) {
                let default = self.session.types.default_value(*ty);
                for ident in group {
                    self.set_ident_type(*ident, *ty, Some(default.clone()));
                }
            }
            return Ok(Resolution::Resolved(()));
        }

        if value_types.len() != groups.len() {
            return self.error(
                format!(
                    "Value count mismatch in declaration: expected {} values but found {}",
                    groups.len(),
                    value_types.len()
                ),
                position,
            );
        }

        let mut failed = false;
        for (index, group) in groups.iter().enumerate() {
            let found = value_types[index];
            let Some(&expected) = declared.get(index) else {
                continue;
            };
            if !self.assignable(expected, found) {
                let name = self.unit.ident(group[0]).name.clone();
                let ident_position = self.unit.ident(group[0]).position.clone();
                self.report(Diagnostic::error(
                    format!(
                        "Type mismatch in declaration of \"{}\": expected {}, found {}",
                        name,
                        self.display(expected),
                        self.display(found)
                    ),
                    ident_position,
                ))?;
                failed = true;
            }
        }
        if failed {
            return Ok(Resolution::Failed);
        }

        let constants = values.len() == groups.len();
        for (index, group) in groups.iter().enumerate() {
            let ty = declared.get(index).copied().unwrap_or(value_types[index]);
            let constant = if constants {
                self.const_value(values[index])
            } else {
                None
            };
            if let Some(ConstValue::Type(named)) = &constant {
                let name = self.unit.ident(group[0]).name.clone();
                self.session.types.name_struct(*named, &name);
            }
            for ident in group {
                self.set_ident_type(*ident, ty, constant.clone());
            }
        }
        Ok(Resolution::Resolved(()))
    }

    fn resolve_assignment(
        &mut self,
        targets: &[ValueId],
        op: AssignOp,
        values: &[ValueId],
        position: Position,
    ) -> CompileResult<Resolution<()>> {
        for target in targets {
            let node = self.unit.value(*target);
            if !matches!(
                node.kind,
                ValueKind::Identifier { .. }
                    | ValueKind::Getter { .. }
                    | ValueKind::ArrayLookup { .. }
            ) {
                let position = node.position.clone();
                return self.error(
                    "Left-hand side of assignment must be a variable, member or array element",
                    position,
                );
            }
        }

        let target_types = self.type_all(targets)?;
        let value_types = self.expanded_types(values)?;
        if target_types.is_failed() || value_types.is_failed() {
            return Ok(Resolution::Failed);
        }
        let target_types = ready!(target_types);
        let value_types = ready!(value_types);

        if target_types.len() != value_types.len() {
            return self.error(
                format!(
                    "Value count mismatch in assignment: expected {} values but found {}",
                    target_types.len(),
                    value_types.len()
                ),
                position,
            );
        }
        for (expected, found) in target_types.into_iter().zip(value_types) {
            if op != AssignOp::Assign {
                let offending = if self.session.types.is_numeric(expected) {
                    found
                } else {
                    expected
                };
                if !self.session.types.is_numeric(offending) || !self.assignable(expected, found) {
                    return self.error(
                        format!(
                            "Operator \"{}\" requires numeric operands, found {}",
                            op.symbol(),
                            self.display(offending)
                        ),
                        position,
                    );
                }
            } else if !self.assignable(expected, found) {
                return self.error(
                    format!(
                        "Type mismatch in assignment: expected {}, found {}",
                        self.display(expected),
                        self.display(found)
                    ),
                    position,
                );
            }
        }
        Ok(Resolution::Resolved(()))
    }

    fn resolve_conditions(&mut self, conditions: &[ValueId]) -> CompileResult<Resolution<()>> {
        let types = ready!(self.type_all(conditions)?);
        let bool_ty = self.session.types.builtins().bool;
        let mut failed = false;
        for (condition, ty) in conditions.iter().zip(types) {
            if ty != bool_ty {
                let position = self.unit.value(*condition).position.clone();
                self.report(Diagnostic::error(
                    format!("Condition must be of type bool, found {}", self.display(ty)),
                    position,
                ))?;
                failed = true;
            }
        }
        Ok(if failed {
            Resolution::Failed
        } else {
            Resolution::Resolved(())
        })
    }

    /// Integer range, integer count or array sequence
    fn resolve_for(
        &mut self,
        iterator: IdentId,
        start: ValueId,
        end: Option<ValueId>,
        step: Option<ValueId>,
    ) -> CompileResult<Resolution<()>> {
        let bounds: Vec<ValueId> = std::iter::once(start).chain(end).chain(step).collect();
        let types = ready!(self.type_all(&bounds)?);

        let element = if end.is_some() || step.is_some() {
            for (value, ty) in bounds.iter().zip(&types) {
                if !self.session.types.is_integer(*ty) {
                    let position = self.unit.value(*value).position.clone();
                    return self.error(
                        format!("Range bounds must be integers, found {}", self.display(*ty)),
                        position,
                    );
                }
            }
            types[0]
        } else if self.session.types.is_integer(types[0]) {
            types[0]
        } else if let TypeDescriptor::Array { element, .. } = self.session.types.get(types[0]) {
            *element
        } else {
            let position = self.unit.value(start).position.clone();
            return self.error(
                format!("Cannot iterate over a value of type {}", self.display(types[0])),
                position,
            );
        };
        self.set_ident_type(iterator, element, None);
        Ok(Resolution::Resolved(()))
    }

    fn resolve_return(
        &mut self,
        scope: ScopeId,
        values: &[ValueId],
        named: &[NamedArg],
        position: Position,
    ) -> CompileResult<Resolution<()>> {
        let Some(function) = self.unit.enclosing_function(scope) else {
            return self.error("Return statement outside of function", position);
        };
        let Some(outputs) = self.unit.function(function).map(|f| f.outputs.clone()) else {
            return self.error("Return statement outside of function", position);
        };

        let named_values: Vec<ValueId> = named.iter().map(|n| n.value).collect();
        let positional = self.expanded_types(values)?;
        let named_types = self.type_all(&named_values)?;
        if positional.is_failed() || named_types.is_failed() {
            return Ok(Resolution::Failed);
        }
        let positional = ready!(positional);
        let named_types = ready!(named_types);

        if positional.len() > outputs.len() {
            return self.error(
                format!(
                    "Value count mismatch in return statement: expected {} values but found {}",
                    outputs.len(),
                    positional.len()
                ),
                position,
            );
        }

        let mut given: Vec<Option<TypeId>> = vec![None; outputs.len()];
        for (slot, ty) in given.iter_mut().zip(&positional) {
            *slot = Some(*ty);
        }
        for (arg, ty) in named.iter().zip(named_types) {
            let Some(index) = outputs.iter().position(|o| o.name == arg.name) else {
                return self.error(
                    format!("Function has no output named \"{}\"", arg.name),
                    arg.position.clone(),
                );
            };
            if given[index].is_some() {
                return self.error(
                    format!("Output \"{}\" is given more than once", arg.name),
                    arg.position.clone(),
                );
            }
            given[index] = Some(ty);
        }

        let bare = values.is_empty() && named.is_empty();
        for (output, found) in outputs.iter().zip(given) {
            let Some(ident) = output.ident else { continue };
            let Some(expected) = self.unit.ident(ident).ty else {
                return Ok(self.wait(Dependency::Identifier(ident)));
            };
            match found {
                Some(found) if !self.assignable(expected, found) => {
                    return self.error(
                        format!(
                            "Return type mismatch: expected {}, found {}",
                            self.display(expected),
                            self.display(found)
                        ),
                        position,
                    );
                }
                None if !bare && output.name.starts_with("__retv_") => {
                    return self.error(
                        format!("Missing return value for output \"{}\"", output.name),
                        position,
                    );
                }
                _ => {}
            }
        }
        Ok(Resolution::Resolved(()))
    }

    /// `operator + := f;` registers `f` under `+(lhs,rhs)` in `scope`
    fn resolve_operator(
        &mut self,
        scope: ScopeId,
        symbol: &str,
        function: ValueId,
        position: Position,
    ) -> CompileResult<Resolution<()>> {
        let ty = ready!(self.type_of(function)?);
        let (lhs, rhs) = match self.session.types.get(ty) {
            TypeDescriptor::Function { inputs, outputs }
                if inputs.len() == 2 && outputs.len() == 1 =>
            {
                (inputs[0], inputs[1])
            }
            _ => {
                return self.error(
                    format!(
                        "Operator function must take two inputs and return one output, found type {}",
                        self.display(ty)
                    ),
                    position,
                );
            }
        };

        let key = self.operator_key(symbol, lhs, rhs);
        if self.unit.scope(scope).operators.contains_key(&key) {
            return self.error(
                format!(
                    "Multiple declarations of operator \"{}\" for types {} and {}",
                    symbol,
                    self.display(lhs),
                    self.display(rhs)
                ),
                position,
            );
        }
        debug!("operator {} registered", key);
        let definition = callee_definition(self.unit, function).unwrap_or(function);
        self.unit.scope_mut(scope).operators.insert(key, definition);
        Ok(Resolution::Resolved(()))
    }

    pub(super) fn operator_key(&self, symbol: &str, lhs: TypeId, rhs: TypeId) -> String {
        let types = &self.session.types;
        format!("{}({},{})", symbol, types.mangled(lhs), types.mangled(rhs))
    }

    // ==================== Settling ====================

    /// Give up on every scope whose `using`s are still undecided. Returns
    /// true when at least one scope was frozen.
    fn freeze_imports(&mut self) -> bool {
        let mut frozen = false;
        for index in 0..self.unit.scope_count() {
            let scope = ScopeId(index);
            if super::has_pending_usings(self.unit, scope) {
                self.unit.scope_mut(scope).imports_frozen = true;
                self.deps.satisfy(Dependency::Imports(scope));
                debug!("imports of scope {} frozen", index);
                frozen = true;
            }
        }
        frozen
    }

    fn unresolved(&self) -> Vec<StmtId> {
        self.unit
            .statement_ids()
            .filter(|stmt| !self.unit.stmt(*stmt).status.is_terminal())
            .collect()
    }

    /// Report statements still parked, except those stuck behind an error
    /// that has already been reported
    fn report_unresolved(&mut self) -> CompileResult<()> {
        for stmt in self.unresolved() {
            if self.blocked_by_failure(stmt, &mut HashSet::new()) {
                continue;
            }
            let statement = self.unit.stmt(stmt);
            let message = match statement.kind {
                StatementKind::Using { .. } => "Unable to resolve using statement".to_string(),
                ref kind => format!("Unable to resolve {}", kind.describe()),
            };
            let position = statement.position.clone();
            self.report(Diagnostic::error(message, position))?;
        }
        Ok(())
    }

    fn blocked_by_failure(&self, stmt: StmtId, visited: &mut HashSet<StmtId>) -> bool {
        if !visited.insert(stmt) {
            return false;
        }
        if self.unit.stmt(stmt).status.is_error() {
            return true;
        }
        self.deps.blocked_on(stmt).iter().any(|dependency| match *dependency {
            Dependency::Identifier(ident) => {
                let record = self.unit.ident(ident);
                record.failed
                    || record
                        .declared_by
                        .is_some_and(|decl| self.blocked_by_failure(decl, visited))
            }
            Dependency::Imports(scope) => self
                .unit
                .scope(scope)
                .usings
                .iter()
                .any(|using| self.blocked_by_failure(*using, visited)),
            Dependency::Statement(other) => self.blocked_by_failure(other, visited),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ConstValue, StatementKind, ValueKind};
    use crate::driver::{Analysis, Compiler, CompilerConfig};
    use pretty_assertions::assert_eq;

    fn analyze(source: &str) -> Analysis {
        Compiler::new(CompilerConfig::quiet())
            .analyze_source("main.cb", source)
            .unwrap()
    }

    fn type_name(analysis: &Analysis, name: &str) -> Option<String> {
        let ident = analysis.ident(name)?;
        let ty = analysis.unit.ident(ident).ty?;
        Some(analysis.session.types.display(ty))
    }

    #[test]
    fn test_static_scope_is_order_independent() {
        for source in [
            "a := b;\nb := c + 1.5;\nc := 1.0;\n",
            "c := 1.0;\nb := c + 1.5;\na := b;\n",
        ] {
            let analysis = analyze(source);
            assert_eq!(analysis.error_messages(), Vec::<String>::new());
            assert_eq!(type_name(&analysis, "a").as_deref(), Some("float"));
            assert_eq!(type_name(&analysis, "b").as_deref(), Some("float"));
            assert!(analysis.unit.is_fully_resolved());
        }
    }

    #[test]
    fn test_dynamic_scope_requires_declaration_first() {
        let analysis = analyze("main := fn() { a := b; b := 1; };\n");
        assert_eq!(
            analysis.error_messages(),
            vec!["Identifier \"b\" used before its declaration".to_string()]
        );

        let analysis = analyze("main := fn() { b := 1; a := b; };\n");
        assert_eq!(analysis.error_messages(), Vec::<String>::new());
    }

    #[test]
    fn test_typed_declaration_gets_default_value() {
        let analysis = analyze("a : int;\ns : string;\n");
        let a = analysis.ident("a").unwrap();
        assert_eq!(analysis.unit.ident(a).value, Some(ConstValue::Int(0)));
        assert_eq!(type_name(&analysis, "a").as_deref(), Some("int"));
        let s = analysis.ident("s").unwrap();
        assert_eq!(analysis.unit.ident(s).value, Some(ConstValue::Str(String::new())));
    }

    #[test]
    fn test_declaration_type_mismatch() {
        let analysis = analyze("a : int = 1.5;\n");
        assert_eq!(
            analysis.error_messages(),
            vec!["Type mismatch in declaration of \"a\": expected int, found float".to_string()]
        );
    }

    #[test]
    fn test_call_argument_count_mismatch() {
        let analysis = analyze("main := fn() { foo : fn(int, int) -> int; foo(1); };\n");
        assert_eq!(
            analysis.error_messages(),
            vec!["Argument count mismatch in function call: expected 2, found 1".to_string()]
        );

        let call = analysis
            .unit
            .statement_ids()
            .find_map(|stmt| match analysis.unit.stmt(stmt).kind {
                StatementKind::Call(call) => Some(call),
                _ => None,
            })
            .unwrap();
        assert_eq!(analysis.unit.value(call).ty, None);
    }

    #[test]
    fn test_named_arguments_and_defaults() {
        let analysis = analyze(
            "f := fn(a: int, b: int = 2, c: float = 1.0) -> int { return a; };\n\
             x := f(1, c = 2.0);\n\
             y := f(b = 3);\n",
        );
        assert_eq!(
            analysis.error_messages(),
            vec!["Missing argument for parameter \"a\"".to_string()]
        );
        assert_eq!(type_name(&analysis, "x").as_deref(), Some("int"));
    }

    #[test]
    fn test_ambiguous_reference_reported_once() {
        let analysis = analyze(
            "l := { x := 1; };\nr := { x := 2; };\nusing l;\nusing r;\ny := x;\n",
        );
        assert_eq!(
            analysis.error_messages(),
            vec!["Ambiguous reference to identifier \"x\"".to_string()]
        );
        assert_eq!(analysis.session.diagnostics.diagnostics()[0].notes.len(), 2);
        // The first candidate is still bound
        assert_eq!(type_name(&analysis, "y").as_deref(), Some("int"));
    }

    #[test]
    fn test_return_type_mismatch() {
        let analysis = analyze("f := fn() -> int { return 1.0; };\n");
        assert_eq!(
            analysis.error_messages(),
            vec!["Return type mismatch: expected int, found float".to_string()]
        );
    }

    #[test]
    fn test_operator_overload() {
        let analysis = analyze(
            "V := struct { x : int; };\n\
             add := fn(a: V, b: V) -> V { return a; };\n\
             u : V;\n\
             w := u + u;\n\
             z := u * u;\n\
             operator + := add;\n",
        );
        assert_eq!(
            analysis.error_messages(),
            vec!["No operator \"*\" defined for types V and V".to_string()]
        );
        assert_eq!(type_name(&analysis, "w").as_deref(), Some("V"));

        let w = analysis.ident("w").unwrap();
        let declaration = analysis.unit.ident(w).declared_by.unwrap();
        let StatementKind::Declaration { values, .. } = &analysis.unit.stmt(declaration).kind else {
            panic!("w is not declared by a declaration");
        };
        let ValueKind::InfixOp { overload, .. } = &analysis.unit.value(values[0]).kind else {
            panic!("w is not an infix value");
        };
        let add = analysis.ident("add").unwrap();
        let Some(ConstValue::Function(add)) = analysis.unit.ident(add).value else {
            panic!("add is not a function constant");
        };
        assert_eq!(*overload, Some(add));
    }

    #[test]
    fn test_cycle_is_reported_as_unresolved() {
        let analysis = analyze("a := b;\nb := a;\n");
        assert_eq!(
            analysis.error_messages(),
            vec![
                "Unable to resolve declaration".to_string(),
                "Unable to resolve declaration".to_string()
            ]
        );
    }

    #[test]
    fn test_errors_do_not_cascade() {
        let analysis = analyze("a := nope;\nb := a;\nc := b + 1;\n");
        assert_eq!(
            analysis.error_messages(),
            vec!["Identifier \"nope\" could not be found".to_string()]
        );
    }

    #[test]
    fn test_condition_must_be_bool() {
        let analysis = analyze("main := fn() { if 1 { } };\n");
        assert_eq!(
            analysis.error_messages(),
            vec!["Condition must be of type bool, found int".to_string()]
        );
    }

    #[test]
    fn test_assignment_target_must_be_a_variable() {
        let analysis = analyze(
            "P := struct { x : int; };\n\
             f := fn() -> int { return 1; };\n\
             main := fn() {\n\
                 p : P;\n\
                 a : int[4];\n\
                 p.x = 1;\n\
                 a[0] = 2;\n\
                 1 = 2;\n\
                 f() = 3;\n\
             };\n",
        );
        assert_eq!(
            analysis.error_messages(),
            vec![
                "Left-hand side of assignment must be a variable, member or array element"
                    .to_string();
                2
            ]
        );
    }
}
