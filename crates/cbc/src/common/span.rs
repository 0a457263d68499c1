//! Source locations

use std::fmt;
use std::rc::Rc;

/// Byte range in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Where a token starts: file name plus 1-based line and column.
///
/// The byte span is carried along so the pretty reporter can underline
/// the token; externally produced token streams may leave it empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub file: Rc<str>,
    pub line: u32,
    pub column: u32,
    pub span: Span,
}

/// File name used for the built-in type declarations
pub const BUILTIN_FILE: &str = "CB_built_in_types";

impl Position {
    pub fn new(file: impl Into<Rc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_FILE, 0, 0)
    }

    pub fn is_builtin(&self) -> bool {
        &*self.file == BUILTIN_FILE
    }

    /// True when `self` comes strictly before `other` in the same file.
    /// Positions in different files are never ordered.
    pub fn precedes(&self, other: &Position) -> bool {
        self.file == other.file && (self.line, self.column) < (other.line, other.column)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In {}, line {}, position {}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedes_same_file() {
        let a = Position::new("main.cb", 1, 5);
        let b = Position::new("main.cb", 1, 9);
        let c = Position::new("main.cb", 2, 1);

        assert!(a.precedes(&b));
        assert!(b.precedes(&c));
        assert!(!b.precedes(&a));
        assert!(!a.precedes(&a));
    }

    #[test]
    fn test_precedes_other_file() {
        let a = Position::new("a.cb", 1, 1);
        let b = Position::new("b.cb", 9, 9);
        assert!(!a.precedes(&b));
        assert!(!b.precedes(&a));
    }

    #[test]
    fn test_display() {
        let pos = Position::new("main.cb", 3, 7);
        assert_eq!(pos.to_string(), "In main.cb, line 3, position 7");
    }
}
