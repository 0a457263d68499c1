//! Type system shared by the parser and the resolver
//!
//! All descriptors live in one [`TypeTable`] per session and are referred
//! to by [`TypeId`] handles.

mod descriptor;
mod table;

pub use descriptor::{StructMember, TypeDescriptor, TypeId};
pub use table::{BUILTIN_PRIMITIVES, Builtins, TypeTable};
