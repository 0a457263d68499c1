//! Error type shared by every phase

use super::{Diagnostic, Position};
use thiserror::Error;

/// Compile error.
///
/// `Syntax` and `Fatal` carry a diagnostic that has not been reported yet;
/// whoever catches them reports it. `Aborted` means the diagnostic was
/// already reported by a nested scope and only recovery is left to do.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexer error ({position}): {message}")]
    Lexer { message: String, position: Position },

    #[error("{0}")]
    Syntax(Box<Diagnostic>),

    #[error("{0}")]
    Fatal(Box<Diagnostic>),

    #[error("scope parse aborted after a fatal error")]
    Aborted,

    #[error("Error count reached the maximum of {max}. Terminating compilation.")]
    ErrorLimit { max: usize },

    #[error("unable to open file \"{path}\": {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation failed with {errors} error(s)")]
    Failed { errors: usize },
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, position: Position) -> Self {
        Self::Lexer {
            message: message.into(),
            position,
        }
    }

    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        Self::Syntax(Box::new(Diagnostic::error(message, position)))
    }

    pub fn fatal(message: impl Into<String>, position: Position) -> Self {
        Self::Fatal(Box::new(Diagnostic::error(message, position)))
    }

    /// Attach a note to a syntax or fatal error; other variants are returned unchanged
    pub fn with_note(self, message: impl Into<String>, position: Position) -> Self {
        match self {
            Self::Syntax(diag) => Self::Syntax(Box::new(diag.with_note(message, position))),
            Self::Fatal(diag) => Self::Fatal(Box::new(diag.with_note(message, position))),
            other => other,
        }
    }

    pub fn with_plain_note(self, message: impl Into<String>) -> Self {
        match self {
            Self::Syntax(diag) => Self::Syntax(Box::new(diag.with_plain_note(message))),
            Self::Fatal(diag) => Self::Fatal(Box::new(diag.with_plain_note(message))),
            other => other,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
