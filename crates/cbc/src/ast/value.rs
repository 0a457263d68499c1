//! Value nodes: everything that evaluates to a value

use super::{IdentId, ScopeId, ValueId};
use crate::common::Position;
use crate::types::TypeId;
use std::fmt;

/// A value-producing node.
///
/// `ty` is written once, when the resolver settles the node's type; `None`
/// means "not known yet", never "failed".
#[derive(Debug, Clone)]
pub struct ValueNode {
    pub kind: ValueKind,
    pub position: Position,
    /// Scope the value appears in, used for name lookup
    pub scope: ScopeId,
    pub ty: Option<TypeId>,
}

impl ValueNode {
    pub fn new(kind: ValueKind, position: Position, scope: ScopeId) -> Self {
        Self {
            kind,
            position,
            scope,
            ty: None,
        }
    }

    /// `None` while the type is still pending
    pub fn get_type(&self) -> Option<TypeId> {
        self.ty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    Float,
    String,
    Bool,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Literal {
        kind: LiteralKind,
        text: String,
    },
    Identifier {
        name: String,
        target: Option<IdentId>,
    },
    InfixOp {
        lhs: ValueId,
        op: InfixOp,
        rhs: ValueId,
        /// User operator chosen for non-builtin operand types
        overload: Option<ValueId>,
    },
    FunctionCall {
        callee: ValueId,
        args: Vec<ValueId>,
        named: Vec<NamedArg>,
        /// Concrete function used when the callee is generic
        specialization: Option<ValueId>,
    },
    Getter {
        subject: ValueId,
        member: String,
        /// Set when the subject is a scope and the member an identifier in it
        target: Option<IdentId>,
    },
    Cast {
        subject: ValueId,
        target: String,
    },
    ArrayLookup {
        subject: ValueId,
        index: ValueId,
    },
    ValueList(Vec<ValueId>),
    Function(Function),
    /// A type used as a value; `syntax` may still contain placeholders
    TypeDescriptor {
        syntax: TypeId,
        resolved: Option<TypeId>,
    },
    Scope(ScopeId),
}

#[derive(Debug, Clone)]
pub struct NamedArg {
    pub name: String,
    pub position: Position,
    pub value: ValueId,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub position: Position,
    /// Type as written; resolved through the defining scope
    pub ty: TypeId,
    pub default: Option<ValueId>,
    /// Declaration in the body scope
    pub ident: Option<IdentId>,
}

/// A function definition
#[derive(Debug, Clone)]
pub struct Function {
    pub inputs: Vec<Parameter>,
    pub outputs: Vec<Parameter>,
    /// `None` for generics, whose body waits for specialization
    pub body: Option<ScopeId>,
    pub generic: Option<Generic>,
}

impl Function {
    pub fn is_generic(&self) -> bool {
        self.generic.is_some()
    }
}

/// Unparsed generic function, kept as tokens until a call specializes it
#[derive(Debug, Clone)]
pub struct Generic {
    /// Names introduced with `$` in the inputs, in order of appearance
    pub params: Vec<String>,
    pub tokens: TokenRange,
}

/// Inclusive token range of one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRange {
    pub file: usize,
    pub start: usize,
    pub end: usize,
}

/// Compile-time value of an identifier or expression
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Type(TypeId),
    Scope(ScopeId),
    Function(ValueId),
    /// Zero value of a type without a literal form
    Default(TypeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfixOp {
    Eq,
    Ne,
    Ge,
    Le,
    Lt,
    Gt,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl InfixOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "&&" => Self::And,
            "||" => Self::Or,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::And => "&&",
            Self::Or => "||",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn priority(self) -> u8 {
        match self {
            Self::Eq | Self::Ne | Self::Ge | Self::Le | Self::Lt | Self::Gt => 0,
            Self::And | Self::Or => 1,
            Self::Add | Self::Sub => 2,
            Self::Mul | Self::Div | Self::Rem => 3,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.priority() == 0
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_arithmetic(self) -> bool {
        self.priority() >= 2
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operator_priorities() {
        assert_eq!(InfixOp::from_symbol("*").map(InfixOp::priority), Some(3));
        assert_eq!(InfixOp::from_symbol("-").map(InfixOp::priority), Some(2));
        assert_eq!(InfixOp::from_symbol("||").map(InfixOp::priority), Some(1));
        assert_eq!(InfixOp::from_symbol("<=").map(InfixOp::priority), Some(0));
        assert_eq!(InfixOp::from_symbol("="), None);
    }

    #[test]
    fn test_operator_classes() {
        assert!(InfixOp::Lt.is_comparison());
        assert!(InfixOp::Or.is_logical());
        assert!(InfixOp::Rem.is_arithmetic());
        assert!(!InfixOp::And.is_arithmetic());
    }
}
