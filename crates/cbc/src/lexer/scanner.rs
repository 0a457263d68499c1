//! Token stream adapter built on logos

use super::token::{KEYWORDS, RawToken, Token, TokenKind};
use crate::common::{CompileError, CompileResult, Position, Span};
use logos::Logos;
use std::rc::Rc;

/// Turns source text into the parser's token stream
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, RawToken>,
    file: Rc<str>,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            inner: RawToken::lexer(source),
            file: Rc::from(file),
            line_starts,
            at_eof: false,
        }
    }

    /// Get the next token; returns `Eof` forever once the input is exhausted
    pub fn next_token(&mut self) -> CompileResult<Token> {
        if self.at_eof {
            return Ok(self.eof_token());
        }

        match self.inner.next() {
            Some(Ok(raw)) => {
                let span = self.inner.span();
                let position = self.position(Span::new(span.start, span.end));
                let slice = self.inner.slice();
                Ok(match raw {
                    RawToken::Word if slice == "true" || slice == "false" => {
                        Token::new(TokenKind::Bool, slice, position)
                    }
                    RawToken::Word if KEYWORDS.contains(&slice) => {
                        Token::new(TokenKind::Keyword, slice, position)
                    }
                    RawToken::Word => Token::new(TokenKind::Identifier, slice, position),
                    RawToken::Integer => Token::new(TokenKind::Integer, slice, position),
                    RawToken::Float => Token::new(TokenKind::Float, slice, position),
                    RawToken::Str => {
                        Token::new(TokenKind::String, &slice[1..slice.len() - 1], position)
                    }
                    RawToken::Symbol | RawToken::BlockComment => {
                        Token::new(TokenKind::Symbol, slice, position)
                    }
                })
            }
            Some(Err(())) => {
                let span = self.inner.span();
                let position = self.position(Span::new(span.start, span.end));
                let slice = self.inner.slice();
                let message = if slice.starts_with("/*") {
                    "Unterminated block comment".to_string()
                } else if slice.starts_with('"') {
                    "Unterminated string literal".to_string()
                } else {
                    format!("Unexpected character '{}'", slice)
                };
                Err(CompileError::lexer(message, position))
            }
            None => {
                self.at_eof = true;
                Ok(self.eof_token())
            }
        }
    }

    /// Tokenize the entire source; the last token is always `Eof`
    pub fn tokenize_all(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn eof_token(&self) -> Token {
        let len = self.inner.source().len();
        Token::eof(self.position(Span::new(len, len)))
    }

    fn position(&self, span: Span) -> Position {
        let line = match self.line_starts.binary_search(&span.start) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = span.start - self.line_starts[line];
        Position {
            file: Rc::clone(&self.file),
            line: line as u32 + 1,
            column: column as u32 + 1,
            span,
        }
    }
}

/// Convenience wrapper around [`Lexer::tokenize_all`]
pub fn tokenize(source: &str, file: &str) -> CompileResult<Vec<Token>> {
    Lexer::new(source, file).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source, "test.cb")
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = kinds("using if elsif foo reverse bar? done!");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Keyword, "using".to_string()),
                (TokenKind::Keyword, "if".to_string()),
                (TokenKind::Keyword, "elsif".to_string()),
                (TokenKind::Identifier, "foo".to_string()),
                (TokenKind::Keyword, "reverse".to_string()),
                (TokenKind::Identifier, "bar?".to_string()),
                (TokenKind::Identifier, "done!".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn test_literals() {
        let tokens = kinds(r#"42 3.25 "hi there" true false"#);
        assert_eq!(tokens[0], (TokenKind::Integer, "42".to_string()));
        assert_eq!(tokens[1], (TokenKind::Float, "3.25".to_string()));
        assert_eq!(tokens[2], (TokenKind::String, "hi there".to_string()));
        assert_eq!(tokens[3], (TokenKind::Bool, "true".to_string()));
        assert_eq!(tokens[4], (TokenKind::Bool, "false".to_string()));
    }

    #[test]
    fn test_range_is_not_a_float() {
        let tokens = kinds("1..10");
        assert_eq!(tokens[0], (TokenKind::Integer, "1".to_string()));
        assert_eq!(tokens[1], (TokenKind::Symbol, "..".to_string()));
        assert_eq!(tokens[2], (TokenKind::Integer, "10".to_string()));
    }

    #[test]
    fn test_symbols_longest_match() {
        let lexemes: Vec<String> = kinds(":= += -> == ... _ $")
            .into_iter()
            .map(|(_, l)| l)
            .collect();
        assert_eq!(lexemes, vec![":", "=", "+=", "->", "==", "...", "_", "$", ""]);
    }

    #[test]
    fn test_cast_symbol_splits_from_identifier() {
        let tokens = kinds("(x)_float");
        assert_eq!(tokens[3], (TokenKind::Symbol, "_".to_string()));
        assert_eq!(tokens[4], (TokenKind::Identifier, "float".to_string()));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("a // line\n/* block /* nested */ still */ b");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], (TokenKind::Identifier, "b".to_string()));
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a := 1;\n  b", "pos.cb").unwrap();
        assert_eq!((tokens[0].position.line, tokens[0].position.column), (1, 1));
        assert_eq!((tokens[1].position.line, tokens[1].position.column), (1, 3));
        assert_eq!((tokens[5].position.line, tokens[5].position.column), (2, 3));
        assert_eq!(&*tokens[5].position.file, "pos.cb");
    }

    #[test]
    fn test_unterminated_comment() {
        let result = tokenize("a /* never closed", "bad.cb");
        assert!(matches!(result, Err(CompileError::Lexer { .. })));
    }

    #[test]
    fn test_unexpected_character() {
        let result = tokenize("a @ b", "bad.cb");
        match result {
            Err(CompileError::Lexer { message, .. }) => {
                assert_eq!(message, "Unexpected character '@'");
            }
            _ => panic!("expected lexer error"),
        }
    }
}
