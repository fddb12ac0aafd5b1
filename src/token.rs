use crate::prelude::*;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Statement separator: newline or ';'.
    Newline,

    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Minus,
    Plus,
    Slash,
    Star,
    Percent,

    // One or two character tokens.
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals.
    Identifier,
    StringLiteral,
    Int,
    Long,
    Double,

    // Keywords.
    And,
    Break,
    Continue,
    Elif,
    Else,
    If,
    Namespace,
    Not,
    Or,
    Return,
    While,

    EOF,
}

/// Value carried by literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(Number),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: &str, literal: Option<Literal>, span: Span) -> Self {
        Self { token_type, lexeme: lexeme.to_owned(), literal, span }
    }

    pub fn line(&self) -> usize {
        self.span.start.line
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {} {:?}", self.token_type, self.lexeme, self.literal)
    }
}
