//! AST data model
//!
//! Every scope, identifier, value and statement of a compilation lives in
//! one [`CompileUnit`] arena and is addressed by a copyable handle. Parent
//! links and imports are plain handles, so the whole tree is released at
//! once when the unit is dropped.

mod printer;
mod scope;
mod stmt;
mod value;

pub use printer::AstPrinter;
pub use scope::{Scope, ScopeKind, ScopeOwner, TypedIdentifier};
pub use stmt::{AssignOp, IfBranch, Statement, StatementKind};
pub use value::{
    ConstValue, Function, Generic, InfixOp, LiteralKind, NamedArg, Parameter, TokenRange,
    ValueKind, ValueNode,
};

use crate::common::Position;
use crate::lexer::Token;
use crate::types::TypeTable;
use std::rc::Rc;

macro_rules! arena_id {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub(crate) usize);

            impl $name {
                pub fn index(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

arena_id! {
    /// Handle of a [`Scope`]
    ScopeId;
    /// Handle of a [`TypedIdentifier`]
    IdentId;
    /// Handle of a [`ValueNode`]
    ValueId;
    /// Handle of a [`Statement`]
    StmtId;
}

/// Lifecycle of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStatus {
    PartiallyParsed,
    AwaitingDependencies,
    Resolved,
    SyntaxError,
    TypeError,
    FatalError,
}

impl ResolutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Resolved | Self::SyntaxError | Self::TypeError | Self::FatalError
        )
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::SyntaxError | Self::TypeError | Self::FatalError)
    }
}

/// A parsed source file and its top-level scope
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub tokens: Rc<[Token]>,
    pub global: Option<ScopeId>,
}

/// Arena owning the AST of one compilation
#[derive(Debug)]
pub struct CompileUnit {
    sources: Vec<SourceFile>,
    scopes: Vec<Scope>,
    identifiers: Vec<TypedIdentifier>,
    values: Vec<ValueNode>,
    statements: Vec<Statement>,
    builtin_scope: ScopeId,
}

impl CompileUnit {
    /// Create an empty unit whose built-in scope declares every primitive
    /// registered in `types`.
    pub fn new(types: &TypeTable) -> Self {
        let mut unit = Self {
            sources: Vec::new(),
            scopes: Vec::new(),
            identifiers: Vec::new(),
            values: Vec::new(),
            statements: Vec::new(),
            builtin_scope: ScopeId(0),
        };

        let mut builtin = Scope::new(
            ScopeKind::Static,
            None,
            ScopeOwner::Builtin,
            Position::builtin(),
        );
        builtin.imports_frozen = true;
        let scope = unit.add_scope(builtin);
        unit.builtin_scope = scope;

        let type_ty = types.builtins().type_;
        for (name, _) in crate::types::BUILTIN_PRIMITIVES {
            let Some(ty) = types.primitive(name) else { continue };
            let mut ident = TypedIdentifier::new(*name, Position::builtin(), scope);
            ident.ty = Some(type_ty);
            ident.value = Some(ConstValue::Type(ty));
            let id = unit.add_ident(ident);
            let builtin = unit.scope_mut(scope);
            builtin.identifiers.insert((*name).to_string(), id);
            builtin.declared.push(id);
            builtin.types.insert((*name).to_string(), ty);
        }
        unit
    }

    pub fn builtin_scope(&self) -> ScopeId {
        self.builtin_scope
    }

    // ==================== Sources ====================

    pub fn add_source(&mut self, name: impl Into<String>, tokens: Vec<Token>) -> usize {
        self.sources.push(SourceFile {
            name: name.into(),
            tokens: Rc::from(tokens),
            global: None,
        });
        self.sources.len() - 1
    }

    pub fn source(&self, index: usize) -> &SourceFile {
        &self.sources[index]
    }

    pub fn source_mut(&mut self, index: usize) -> &mut SourceFile {
        &mut self.sources[index]
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Index of an already loaded file
    pub fn find_source(&self, name: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.name == name)
    }

    // ==================== Arena access ====================

    pub fn add_scope(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() - 1)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn add_ident(&mut self, ident: TypedIdentifier) -> IdentId {
        self.identifiers.push(ident);
        IdentId(self.identifiers.len() - 1)
    }

    pub fn ident(&self, id: IdentId) -> &TypedIdentifier {
        &self.identifiers[id.0]
    }

    pub fn ident_mut(&mut self, id: IdentId) -> &mut TypedIdentifier {
        &mut self.identifiers[id.0]
    }

    pub fn add_value(&mut self, value: ValueNode) -> ValueId {
        self.values.push(value);
        ValueId(self.values.len() - 1)
    }

    pub fn value(&self, id: ValueId) -> &ValueNode {
        &self.values[id.0]
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut ValueNode {
        &mut self.values[id.0]
    }

    pub fn add_stmt(&mut self, stmt: Statement) -> StmtId {
        self.statements.push(stmt);
        StmtId(self.statements.len() - 1)
    }

    pub fn stmt(&self, id: StmtId) -> &Statement {
        &self.statements[id.0]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Statement {
        &mut self.statements[id.0]
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn statement_ids(&self) -> impl Iterator<Item = StmtId> + use<> {
        (0..self.statements.len()).map(StmtId)
    }

    // ==================== Queries ====================

    /// The function definition behind a value, if it is one
    pub fn function(&self, id: ValueId) -> Option<&Function> {
        match &self.value(id).kind {
            ValueKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Function value whose body (or one of its nested blocks) is `scope`
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<ValueId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let ScopeOwner::Function(function) = scope.owner {
                return Some(function);
            }
            current = scope.parent;
        }
        None
    }

    /// Identifier declared directly in `scope`
    pub fn declared_in(&self, scope: ScopeId, name: &str) -> Option<IdentId> {
        self.scope(scope).identifiers.get(name).copied()
    }

    /// True when every statement reached `Resolved`
    pub fn is_fully_resolved(&self) -> bool {
        self.statements
            .iter()
            .all(|s| s.status == ResolutionStatus::Resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_scope_declares_primitives() {
        let types = TypeTable::new();
        let unit = CompileUnit::new(&types);
        let builtin = unit.builtin_scope();

        let int = unit.declared_in(builtin, "int").unwrap();
        assert_eq!(unit.ident(int).ty, Some(types.builtins().type_));
        assert_eq!(
            unit.ident(int).value,
            Some(ConstValue::Type(types.builtins().int))
        );
        assert!(unit.ident(int).position.is_builtin());
        assert!(unit.declared_in(builtin, "generic_fn").is_some());
        assert_eq!(unit.scope(builtin).kind, ScopeKind::Static);
    }

    #[test]
    fn test_status_classes() {
        assert!(ResolutionStatus::Resolved.is_terminal());
        assert!(ResolutionStatus::TypeError.is_terminal());
        assert!(ResolutionStatus::TypeError.is_error());
        assert!(!ResolutionStatus::AwaitingDependencies.is_terminal());
        assert!(!ResolutionStatus::Resolved.is_error());
    }
}
