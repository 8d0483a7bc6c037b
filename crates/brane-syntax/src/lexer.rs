//! Lexer for BraneScript source text.
//!
//! Integer literals are decimal; float literals are digits `.` digits with
//! an optional trailing `f`; strings are `"..."`; chars are `'x'`. Line
//! comments run `//` to newline, block comments `/* ... */`.

use crate::token::{Token, TokenKind};
use brane_common::Span;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Keyword table, built once on first use.
fn keywords() -> &'static HashMap<&'static str, TokenKind> {
    static KEYWORDS: OnceLock<HashMap<&'static str, TokenKind>> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        HashMap::from([
            ("true", TokenKind::True),
            ("false", TokenKind::False),
            ("struct", TokenKind::Struct),
            ("packed", TokenKind::Packed),
            ("if", TokenKind::If),
            ("while", TokenKind::While),
            ("return", TokenKind::Return),
            ("new", TokenKind::New),
            ("delete", TokenKind::Delete),
            ("link", TokenKind::Link),
            ("as", TokenKind::As),
            ("const", TokenKind::Const),
            ("ref", TokenKind::Ref),
        ])
    })
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    read_pos: usize,
    ch: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Self {
            input,
            pos: 0,
            read_pos: 0,
            ch: None,
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        self.ch = self.input[self.read_pos..].chars().next();
        self.pos = self.read_pos;
        if let Some(c) = self.ch {
            self.read_pos += c.len_utf8();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.read_pos..].chars().next()
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.ch {
                Some(c) if c.is_whitespace() => self.read_char(),
                Some('/') if self.peek_char() == Some('/') => {
                    while let Some(c) = self.ch {
                        self.read_char();
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_char() == Some('*') => {
                    self.read_char();
                    self.read_char();
                    loop {
                        match self.ch {
                            None => break,
                            Some('*') if self.peek_char() == Some('/') => {
                                self.read_char();
                                self.read_char();
                                break;
                            }
                            _ => self.read_char(),
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.ch {
            if c.is_alphanumeric() || c == '_' {
                self.read_char();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn read_number(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.ch, Some(c) if c.is_ascii_digit()) {
            self.read_char();
        }
        let mut is_float = false;
        if self.ch == Some('.') && matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.read_char();
            while matches!(self.ch, Some(c) if c.is_ascii_digit()) {
                self.read_char();
            }
        }
        let text = &self.input[start..self.pos];
        if self.ch == Some('f') {
            self.read_char();
            return TokenKind::Float(text.parse().unwrap_or(0.0));
        }
        if is_float {
            TokenKind::Float(text.parse().unwrap_or(0.0))
        } else {
            TokenKind::Int(text.parse().unwrap_or(0))
        }
    }

    fn read_string(&mut self) -> TokenKind {
        self.read_char(); // opening quote
        let mut value = String::new();
        while let Some(c) = self.ch {
            match c {
                '"' => {
                    self.read_char();
                    return TokenKind::Str(value);
                }
                '\\' => {
                    self.read_char();
                    value.push(unescape(self.ch.unwrap_or('\\')));
                    self.read_char();
                }
                _ => {
                    value.push(c);
                    self.read_char();
                }
            }
        }
        // Unterminated string: surface the opening quote as unformable.
        TokenKind::Unknown('"')
    }

    fn read_char_literal(&mut self) -> TokenKind {
        self.read_char(); // opening quote
        let value = match self.ch {
            Some('\\') => {
                self.read_char();
                let c = unescape(self.ch.unwrap_or('\\'));
                self.read_char();
                c
            }
            Some(c) => {
                self.read_char();
                c
            }
            None => return TokenKind::Unknown('\''),
        };
        if self.ch == Some('\'') {
            self.read_char();
            TokenKind::Char(value)
        } else {
            TokenKind::Unknown('\'')
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let start = self.pos;

        let kind = match self.ch {
            None => TokenKind::Eof,
            Some(c) if c.is_ascii_digit() => self.read_number(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier();
                match keywords().get(ident) {
                    Some(kw) => kw.clone(),
                    None => TokenKind::Ident(ident.to_string()),
                }
            }
            Some('"') => self.read_string(),
            Some('\'') => self.read_char_literal(),
            Some(c) => {
                let kind = match c {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '=' => {
                        if self.peek_char() == Some('=') {
                            self.read_char();
                            TokenKind::Eq
                        } else {
                            TokenKind::Assign
                        }
                    }
                    '!' => {
                        if self.peek_char() == Some('=') {
                            self.read_char();
                            TokenKind::NotEq
                        } else {
                            TokenKind::Unknown('!')
                        }
                    }
                    '<' => {
                        if self.peek_char() == Some('=') {
                            self.read_char();
                            TokenKind::LtEq
                        } else {
                            TokenKind::Lt
                        }
                    }
                    '>' => {
                        if self.peek_char() == Some('=') {
                            self.read_char();
                            TokenKind::GtEq
                        } else {
                            TokenKind::Gt
                        }
                    }
                    '.' => TokenKind::Dot,
                    ',' => TokenKind::Comma,
                    ';' => TokenKind::Semi,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    other => TokenKind::Unknown(other),
                };
                self.read_char();
                kind
            }
        };

        Token::new(kind, Span::new(start, self.pos))
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            if tok.is_eof() {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn numbers_and_suffix() {
        assert_eq!(
            kinds("42 1.5f 3.25"),
            vec![
                TokenKind::Int(42),
                TokenKind::Float(1.5),
                TokenKind::Float(3.25),
            ]
        );
    }

    #[test]
    fn keywords_vs_identifiers() {
        assert_eq!(
            kinds("while whileLoop ref refresh"),
            vec![
                TokenKind::While,
                TokenKind::Ident("whileLoop".into()),
                TokenKind::Ref,
                TokenKind::Ident("refresh".into()),
            ]
        );
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            kinds("a // line\n b /* block\nstill */ c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(
            kinds("< <= > >= == != ="),
            vec![
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Assign,
            ]
        );
    }

    #[test]
    fn string_and_char_literals() {
        assert_eq!(
            kinds(r#""hello\n" 'x' '\t'"#),
            vec![
                TokenKind::Str("hello\n".into()),
                TokenKind::Char('x'),
                TokenKind::Char('\t'),
            ]
        );
    }

    #[test]
    fn unformable_token() {
        assert_eq!(kinds("a @ b")[1], TokenKind::Unknown('@'));
    }

    #[test]
    fn spans_are_byte_offsets() {
        let mut lexer = Lexer::new("int x");
        let tok = lexer.next_token();
        assert_eq!(tok.span, Span::new(0, 3));
        let tok = lexer.next_token();
        assert_eq!(tok.span, Span::new(4, 5));
    }
}
