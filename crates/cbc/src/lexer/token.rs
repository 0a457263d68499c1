//! Token definitions

use crate::common::Position;
use logos::{FilterResult, Logos};
use std::fmt;

/// Token category as consumed by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Symbol,
    Identifier,
    Keyword,
    Integer,
    Float,
    String,
    Bool,
    Eof,
}

/// A token with its text and where it starts. Never mutated after lexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }

    pub fn eof(position: Position) -> Self {
        Self::new(TokenKind::Eof, "", position)
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.lexeme == symbol
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.lexeme == keyword
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Integer | TokenKind::Float | TokenKind::String | TokenKind::Bool
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::String => write!(f, "\"{}\"", self.lexeme),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

/// Reserved words; `true` and `false` are lexed as `Bool` instead
pub const KEYWORDS: &[&str] = &[
    "for", "in", "by", "if", "elsif", "else", "then", "while", "fn", "return", "cast", "struct",
    "defer", "inline", "operator", "using", "reverse",
];

/// Raw lexeme classes recognised by logos; words are split into
/// identifiers, keywords and booleans afterwards.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub(super) enum RawToken {
    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*[?!]*")]
    Word,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[token("...")]
    #[token("..")]
    #[token(".")]
    #[token("->")]
    #[token("-")]
    #[token("+")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<")]
    #[token(">")]
    #[token("=")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&&")]
    #[token("||")]
    #[token(":")]
    #[token(";")]
    #[token(",")]
    #[token("(")]
    #[token(")")]
    #[token("[")]
    #[token("]")]
    #[token("{")]
    #[token("}")]
    #[token("_")]
    #[token("$")]
    #[token("?")]
    #[token("!")]
    #[token("&")]
    #[token("#")]
    #[token("'")]
    Symbol,
}

/// Skip a possibly nested block comment; unterminated comments are an error
fn block_comment(lex: &mut logos::Lexer<RawToken>) -> FilterResult<(), ()> {
    let rest = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i + 1 < rest.len() {
        match (rest[i], rest[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    lex.bump(i);
                    return FilterResult::Skip;
                }
            }
            _ => i += 1,
        }
    }
    lex.bump(rest.len());
    FilterResult::Error(())
}
