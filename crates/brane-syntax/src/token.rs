//! Token types for the BraneScript lexer.

use brane_common::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`
    Ident(String),
    /// Decimal integer literal.
    Int(i32),
    /// Float literal: digits `.` digits with an optional trailing `f`.
    Float(f32),
    /// String literal: `"..."`
    Str(String),
    /// Character literal: `'x'`
    Char(char),

    // Keywords
    True,
    False,
    Struct,
    Packed,
    If,
    While,
    Return,
    New,
    Delete,
    Link,
    As,
    Const,
    Ref,

    // Operators
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /
    Eq,       // ==
    NotEq,    // !=
    Lt,       // <
    LtEq,     // <=
    Gt,       // >
    GtEq,     // >=
    Assign,   // =

    // Delimiters
    Dot,      // .
    Comma,    // ,
    Semi,     // ;
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }

    Eof,
    /// A character the lexer could not form a token from.
    Unknown(char),
}

impl TokenKind {
    /// Human-readable name for error messages.
    pub fn name(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier `{}`", s),
            TokenKind::Int(_) => "integer literal".into(),
            TokenKind::Float(_) => "float literal".into(),
            TokenKind::Str(_) => "string literal".into(),
            TokenKind::Char(_) => "character literal".into(),
            TokenKind::True => "`true`".into(),
            TokenKind::False => "`false`".into(),
            TokenKind::Struct => "`struct`".into(),
            TokenKind::Packed => "`packed`".into(),
            TokenKind::If => "`if`".into(),
            TokenKind::While => "`while`".into(),
            TokenKind::Return => "`return`".into(),
            TokenKind::New => "`new`".into(),
            TokenKind::Delete => "`delete`".into(),
            TokenKind::Link => "`link`".into(),
            TokenKind::As => "`as`".into(),
            TokenKind::Const => "`const`".into(),
            TokenKind::Ref => "`ref`".into(),
            TokenKind::Plus => "`+`".into(),
            TokenKind::Minus => "`-`".into(),
            TokenKind::Star => "`*`".into(),
            TokenKind::Slash => "`/`".into(),
            TokenKind::Eq => "`==`".into(),
            TokenKind::NotEq => "`!=`".into(),
            TokenKind::Lt => "`<`".into(),
            TokenKind::LtEq => "`<=`".into(),
            TokenKind::Gt => "`>`".into(),
            TokenKind::GtEq => "`>=`".into(),
            TokenKind::Assign => "`=`".into(),
            TokenKind::Dot => "`.`".into(),
            TokenKind::Comma => "`,`".into(),
            TokenKind::Semi => "`;`".into(),
            TokenKind::LParen => "`(`".into(),
            TokenKind::RParen => "`)`".into(),
            TokenKind::LBrace => "`{`".into(),
            TokenKind::RBrace => "`}`".into(),
            TokenKind::Eof => "end of input".into(),
            TokenKind::Unknown(c) => format!("`{}`", c),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
