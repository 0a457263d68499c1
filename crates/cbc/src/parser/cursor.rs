//! Random-access cursor over a file's token list

use crate::common::{CompileError, CompileResult, Position};
use crate::lexer::{Token, TokenKind};
use std::collections::HashMap;
use std::rc::Rc;

/// Token cursor with precomputed brace matching.
///
/// Tokens are shared with the compile unit so generic bodies can be
/// re-read later from the same list.
pub struct TokenCursor {
    tokens: Rc<[Token]>,
    pos: usize,
    /// `{` index -> matching `}` index
    braces: HashMap<usize, usize>,
}

impl TokenCursor {
    pub fn new(tokens: Rc<[Token]>) -> Self {
        let mut braces = HashMap::new();
        let mut open = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            if token.is_symbol("{") {
                open.push(index);
            } else if token.is_symbol("}") {
                if let Some(start) = open.pop() {
                    braces.insert(start, index);
                }
            }
        }
        Self {
            tokens,
            pos: 0,
            braces,
        }
    }

    /// Index of the current token
    pub fn index(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, index: usize) {
        self.pos = index.min(self.last());
    }

    pub fn peek(&self) -> &Token {
        self.at(self.pos)
    }

    pub fn peek_at(&self, offset: usize) -> &Token {
        self.at(self.pos + offset)
    }

    /// Token at an absolute index; past the end this is the final `Eof`
    pub fn at(&self, index: usize) -> &Token {
        &self.tokens[index.min(self.last())]
    }

    pub fn position(&self) -> Position {
        self.peek().position.clone()
    }

    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.last() {
            self.pos += 1;
        }
        token
    }

    pub fn is_eof(&self) -> bool {
        self.peek().is_eof()
    }

    pub fn check_symbol(&self, symbol: &str) -> bool {
        self.peek().is_symbol(symbol)
    }

    pub fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    pub fn check_identifier(&self) -> bool {
        self.peek().kind == TokenKind::Identifier
    }

    pub fn match_symbol(&mut self, symbol: &str) -> bool {
        if self.check_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn match_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `symbol` or fail with a recoverable syntax error
    pub fn expect_symbol(&mut self, symbol: &str, message: &str) -> CompileResult<Token> {
        if self.check_symbol(symbol) {
            Ok(self.advance())
        } else {
            Err(CompileError::syntax(message, self.position()))
        }
    }

    pub fn expect_identifier(&mut self, message: &str) -> CompileResult<Token> {
        if self.check_identifier() {
            Ok(self.advance())
        } else {
            Err(CompileError::syntax(message, self.position()))
        }
    }

    /// Index of the `}` closing the `{` at `open`
    pub fn matching_brace(&self, open: usize) -> Option<usize> {
        self.braces.get(&open).copied()
    }

    pub fn tokens(&self) -> &Rc<[Token]> {
        &self.tokens
    }

    fn last(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn cursor(source: &str) -> TokenCursor {
        TokenCursor::new(Rc::from(tokenize(source, "cursor.cb").unwrap()))
    }

    #[test]
    fn test_brace_matching() {
        let cursor = cursor("{ a { b } } }");
        assert_eq!(cursor.matching_brace(0), Some(5));
        assert_eq!(cursor.matching_brace(2), Some(4));
        assert_eq!(cursor.matching_brace(1), None);
    }

    #[test]
    fn test_advance_stops_at_eof() {
        let mut cursor = cursor("a");
        assert_eq!(cursor.advance().lexeme, "a");
        assert!(cursor.is_eof());
        cursor.advance();
        assert!(cursor.is_eof());
        assert!(cursor.peek_at(10).is_eof());
    }

    #[test]
    fn test_expect_symbol_reports_position() {
        let mut cursor = cursor("a b");
        match cursor.expect_symbol(";", "Missing \";\"") {
            Err(CompileError::Syntax(diag)) => {
                assert_eq!(diag.message, "Missing \";\"");
                assert_eq!(diag.position.column, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
