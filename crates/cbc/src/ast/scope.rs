//! Scopes and declared identifiers

use super::{ConstValue, IdentId, ScopeId, StmtId, ValueId};
use crate::common::Position;
use crate::types::TypeId;
use std::collections::HashMap;

/// Static scopes see all their declarations at once; dynamic scopes only
/// see declarations that come textually before the use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Static,
    Dynamic,
}

/// What syntactic construct a scope belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOwner {
    Builtin,
    /// Top-level scope of a source file (index into the unit's sources)
    File(usize),
    /// Body of a function definition
    Function(ValueId),
    /// Body of a control-flow statement or an anonymous block
    Block,
    /// `{ ... }` used as a value
    Namespace,
    /// Holds the type bindings of one generic specialization
    Substitution,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub owner: ScopeOwner,
    /// Position of the opening token
    pub start: Position,

    pub identifiers: HashMap<String, IdentId>,
    /// Identifiers in declaration order
    pub declared: Vec<IdentId>,
    /// Named types known in this scope
    pub types: HashMap<String, TypeId>,
    /// Overloaded infix operators keyed by `op(lhs,rhs)`
    pub operators: HashMap<String, ValueId>,
    /// `operator` statements of this scope
    pub operator_decls: Vec<StmtId>,

    /// Directly imported scopes, in import order
    pub imports: Vec<ScopeId>,
    /// `using` statements of this scope
    pub usings: Vec<StmtId>,
    /// Set once the import fixed point gave up on pending usings
    pub imports_frozen: bool,

    pub statements: Vec<StmtId>,
    /// Deferred statements, run in reverse order on scope exit
    pub defers: Vec<StmtId>,
    /// A fatal error cut the parse of this scope short
    pub aborted: bool,
}

impl Scope {
    pub fn new(
        kind: ScopeKind,
        parent: Option<ScopeId>,
        owner: ScopeOwner,
        start: Position,
    ) -> Self {
        Self {
            kind,
            parent,
            owner,
            start,
            identifiers: HashMap::new(),
            declared: Vec::new(),
            types: HashMap::new(),
            operators: HashMap::new(),
            operator_decls: Vec::new(),
            imports: Vec::new(),
            usings: Vec::new(),
            imports_frozen: false,
            statements: Vec::new(),
            defers: Vec::new(),
            aborted: false,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == ScopeKind::Dynamic
    }
}

/// Declaration record of one name
#[derive(Debug, Clone)]
pub struct TypedIdentifier {
    pub name: String,
    pub position: Position,
    pub scope: ScopeId,
    pub ty: Option<TypeId>,
    /// Compile-time value, when known
    pub value: Option<ConstValue>,
    pub declared_by: Option<StmtId>,
    /// The declaring construct failed; the type will never arrive
    pub failed: bool,
}

impl TypedIdentifier {
    pub fn new(name: impl Into<String>, position: Position, scope: ScopeId) -> Self {
        Self {
            name: name.into(),
            position,
            scope,
            ty: None,
            value: None,
            declared_by: None,
            failed: false,
        }
    }
}
