//! CB compiler front end
//!
//! Parses CB sources into an arena AST and resolves names, imports and
//! types until every statement is settled or reported.
//!
//! ## Architecture
//!
//! - **Lexer** (`lexer/`): token stream with positions
//! - **Parser** (`parser/`): recursive descent straight into the arena
//! - **AST** (`ast/`): scopes, identifiers, values and statements
//! - **Semantic analysis** (`sema/`): lookup, `using` imports, typing and
//!   generic specialization, driven to a fixed point
//! - **Types** (`types/`): interned type descriptors
//! - **Driver** (`driver/`): configuration, source loading and the pipeline
//! - **Common** (`common/`): positions, diagnostics and errors

pub mod ast;
pub mod common;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod sema;
pub mod session;
pub mod types;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, Diagnostic, DiagnosticReporter, Position};
pub use driver::{Analysis, CodegenInput, Compiler, CompilerConfig, SourceLoader};
pub use session::Session;
