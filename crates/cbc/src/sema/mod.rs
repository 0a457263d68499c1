//! Semantic analysis: name lookup, imports and type resolution
//!
//! Resolution is a fixed-point iteration. Every statement is attempted;
//! one that lacks information is parked in the [`DependencyTable`] and
//! retried once what it waits for has been written. When a pass changes
//! nothing, scopes with undecided `using`s are frozen and the loop runs
//! again; when that changes nothing either, whatever is still parked is
//! reported.

mod deps;
mod generics;
mod imports;
mod resolver;
mod scope;
mod values;

pub use deps::{Dependency, DependencyTable, Resolution};
pub use generics::SpecializationCache;
pub use resolver::Resolver;
pub use scope::{Lookup, declare, has_pending_usings, lookup, lookup_eager};
pub use values::callee_definition;

pub(crate) use deps::ready;
