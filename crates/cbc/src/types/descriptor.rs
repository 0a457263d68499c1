//! Type descriptors
//!
//! Descriptors never own their children; nested types are [`TypeId`]
//! handles into the session's [`TypeTable`](super::TypeTable).

use crate::ast::ValueId;
use crate::common::Position;

/// Handle of an interned type. Equal handles mean equal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// Built-in scalar: int, float, bool, ...
    Primitive { name: String, size: u32 },

    /// Structural: equal when the mangled signatures match
    Function {
        inputs: Vec<TypeId>,
        outputs: Vec<TypeId>,
    },

    /// Nominal: every `struct { ... }` occurrence gets its own serial
    Struct {
        serial: u32,
        members: Vec<StructMember>,
    },

    /// `elem[N]`, or `elem[..]` when `size` is `None`
    Array { element: TypeId, size: Option<u64> },

    /// Name waiting for lookup; must not survive resolution
    Unresolved {
        name: String,
        position: Position,
        /// Written as `$name` in a function input: decides a generic binding
        deciding: bool,
    },

    /// Several types at once, the result of multi-value expressions
    TypeList(Vec<TypeId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub position: Position,
    pub ty: TypeId,
    pub default: Option<ValueId>,
    /// `using name : T;` members expose their fields directly
    pub merged: bool,
}

impl TypeDescriptor {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, TypeDescriptor::Unresolved { .. })
    }
}
