//! Lexer adapter producing the parser's token stream

mod scanner;
mod token;

pub use scanner::{Lexer, tokenize};
pub use token::{KEYWORDS, Token, TokenKind};
