//! Statement nodes

use super::{IdentId, InfixOp, NamedArg, ResolutionStatus, ScopeId, ValueId};
use crate::common::Position;
use crate::types::TypeId;

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub position: Position,
    pub scope: ScopeId,
    pub status: ResolutionStatus,
    /// Runs on scope exit (`defer`)
    pub deferred: bool,
}

impl Statement {
    pub fn new(kind: StatementKind, position: Position, scope: ScopeId) -> Self {
        Self {
            kind,
            position,
            scope,
            status: ResolutionStatus::PartiallyParsed,
            deferred: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl AssignOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => Self::Assign,
            "+=" => Self::Add,
            "-=" => Self::Sub,
            "*=" => Self::Mul,
            "/=" => Self::Div,
            "%=" => Self::Rem,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Rem => "%=",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IfBranch {
    pub condition: ValueId,
    pub body: ScopeId,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    /// `a, (b = c) : int, float = 1, 2.0;`
    Declaration {
        groups: Vec<Vec<IdentId>>,
        /// Explicit types as written, one per group, or empty
        types: Vec<TypeId>,
        values: Vec<ValueId>,
    },
    Assignment {
        targets: Vec<ValueId>,
        op: AssignOp,
        values: Vec<ValueId>,
    },
    /// `if` followed by any `elsif` branches, all in `branches`
    If {
        branches: Vec<IfBranch>,
        otherwise: Option<ScopeId>,
        then: Option<ScopeId>,
    },
    While {
        condition: ValueId,
        body: ScopeId,
    },
    For {
        iterator: IdentId,
        start: ValueId,
        end: Option<ValueId>,
        step: Option<ValueId>,
        reverse: bool,
        body: ScopeId,
    },
    Return {
        values: Vec<ValueId>,
        named: Vec<NamedArg>,
    },
    Using {
        subject: ValueId,
    },
    Call(ValueId),
    Block(ScopeId),
    Operator {
        op: InfixOp,
        function: ValueId,
    },
    /// A statement that failed to parse; its status says how
    Malformed,
}

impl StatementKind {
    /// Construct name used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Declaration { .. } => "declaration",
            Self::Assignment { .. } => "assignment",
            Self::If { .. } => "if statement",
            Self::While { .. } => "while loop",
            Self::For { .. } => "for loop",
            Self::Return { .. } => "return statement",
            Self::Using { .. } => "using statement",
            Self::Call(_) => "function call",
            Self::Block(_) => "block",
            Self::Operator { .. } => "operator declaration",
            Self::Malformed => "malformed statement",
        }
    }
}
