//! Common infrastructure shared by every phase

mod diagnostic;
mod error;
mod span;

pub use diagnostic::{
    DEFAULT_MAX_ERRORS, Diagnostic, DiagnosticReporter, DiagnosticStyle, Note, Severity,
};
pub use error::{CompileError, CompileResult};
pub use span::{BUILTIN_FILE, Position, Span};
