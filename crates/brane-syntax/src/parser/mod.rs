//! Recursive-descent parser for BraneScript.
//!
//! Parsing is error-tolerant: failures are recorded and the parser
//! resynchronizes at statement or item boundaries so one bad construct
//! does not hide the diagnostics after it.

mod expr;
mod stmt;

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use brane_common::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// The lexer could not form a token.
    UnknownToken(char),
    /// The parser rejected a construction.
    Syntax(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::UnknownToken(c) => write!(f, "unknown token `{}`", c),
            ParseErrorKind::Syntax(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

type ParseResult<T> = Result<T, ()>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let peek = lexer.next_token();
        let mut parser = Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        };
        // Unformable tokens are reported here so the grammar never sees them.
        parser.skip_unknown();
        parser
    }

    /// Parse a whole compilation unit, returning the tree and every error
    /// encountered along the way.
    pub fn parse_program(mut self) -> (Program, Vec<ParseError>) {
        let start = self.current.span;
        let mut items = Vec::new();
        let mut end = start;

        while !self.at_eof() {
            match self.parse_item() {
                Ok(item) => {
                    end = self.current.span;
                    items.push(item);
                }
                Err(()) => self.synchronize_item(),
            }
        }

        (
            Program {
                items,
                span: start.to(end),
            },
            self.errors,
        )
    }

    // === Token management ===

    pub(crate) fn next_token(&mut self) {
        self.current = std::mem::replace(&mut self.peek, self.lexer.next_token());
        self.skip_unknown();
    }

    fn skip_unknown(&mut self) {
        while let TokenKind::Unknown(c) = self.current.kind {
            self.errors.push(ParseError {
                kind: ParseErrorKind::UnknownToken(c),
                span: self.current.span,
            });
            self.current = std::mem::replace(&mut self.peek, self.lexer.next_token());
        }
    }

    pub(crate) fn cur_is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn peek_is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek.kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.current.is_eof()
    }

    pub(crate) fn cur_span(&self) -> Span {
        self.current.span
    }

    pub(crate) fn cur_kind(&self) -> &TokenKind {
        &self.current.kind
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.cur_is(kind) {
            self.next_token();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> ParseResult<Span> {
        if self.cur_is(kind) {
            let span = self.current.span;
            self.next_token();
            Ok(span)
        } else {
            self.error(format!(
                "expected {}, found {}",
                kind.name(),
                self.current.kind.name()
            ));
            Err(())
        }
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.errors.push(ParseError {
            kind: ParseErrorKind::Syntax(message.into()),
            span: self.current.span,
        });
    }

    pub(crate) fn parse_ident(&mut self) -> ParseResult<Ident> {
        match &self.current.kind {
            TokenKind::Ident(name) => {
                let ident = Ident::new(name.clone(), self.current.span);
                self.next_token();
                Ok(ident)
            }
            other => {
                let found = other.name();
                self.error(format!("expected identifier, found {}", found));
                Err(())
            }
        }
    }

    fn parse_string_lit(&mut self) -> ParseResult<StringLit> {
        match &self.current.kind {
            TokenKind::Str(value) => {
                let lit = StringLit {
                    value: value.clone(),
                    span: self.current.span,
                };
                self.next_token();
                Ok(lit)
            }
            other => {
                let found = other.name();
                self.error(format!("expected string literal, found {}", found));
                Err(())
            }
        }
    }

    // === Items ===

    fn parse_item(&mut self) -> ParseResult<Item> {
        match &self.current.kind {
            TokenKind::Link => self.parse_link().map(Item::Link),
            TokenKind::Packed | TokenKind::Struct => self.parse_struct().map(Item::Struct),
            TokenKind::Ident(_) => self.parse_function().map(Item::Function),
            other => {
                let found = other.name();
                self.error(format!("expected struct, function or link, found {}", found));
                Err(())
            }
        }
    }

    fn parse_link(&mut self) -> ParseResult<LinkDecl> {
        let start = self.expect(&TokenKind::Link)?;
        let library = self.parse_string_lit()?;
        let alias = if self.eat(&TokenKind::As) {
            Some(self.parse_string_lit()?)
        } else {
            None
        };
        let end = self.expect(&TokenKind::Semi)?;
        Ok(LinkDecl {
            library,
            alias,
            span: start.to(end),
        })
    }

    fn parse_struct(&mut self) -> ParseResult<StructDef> {
        let start = self.cur_span();
        let packed = self.eat(&TokenKind::Packed);
        self.expect(&TokenKind::Struct)?;
        let name = self.parse_ident()?;
        self.expect(&TokenKind::LBrace)?;

        let mut members = Vec::new();
        while !self.cur_is(&TokenKind::RBrace) && !self.at_eof() {
            let member = self.parse_declaration()?;
            self.expect(&TokenKind::Semi)?;
            members.push(member);
        }
        let end = self.expect(&TokenKind::RBrace)?;

        Ok(StructDef {
            name,
            packed,
            members,
            span: start.to(end),
        })
    }

    fn parse_function(&mut self) -> ParseResult<Function> {
        let start = self.cur_span();
        let return_type = self.parse_ident()?;
        let name = self.parse_ident()?;
        self.expect(&TokenKind::LParen)?;

        let mut arguments = Vec::new();
        if !self.cur_is(&TokenKind::RParen) {
            loop {
                arguments.push(self.parse_declaration()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::LBrace)?;

        let mut body = Vec::new();
        while !self.cur_is(&TokenKind::RBrace) && !self.at_eof() {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(()) => self.synchronize_stmt(),
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;

        Ok(Function {
            return_type,
            name,
            arguments,
            body,
            span: start.to(end),
        })
    }

    pub(crate) fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        let start = self.cur_span();
        let is_const = self.eat(&TokenKind::Const);
        let is_ref = self.eat(&TokenKind::Ref);
        let ty = self.parse_ident()?;
        let name = self.parse_ident()?;
        let span = start.to(name.span);
        Ok(Declaration {
            is_const,
            is_ref,
            ty,
            name,
            span,
        })
    }

    // === Recovery ===

    /// Skip to the next statement boundary.
    fn synchronize_stmt(&mut self) {
        while !self.at_eof() {
            if self.eat(&TokenKind::Semi) {
                return;
            }
            if self.cur_is(&TokenKind::RBrace) {
                return;
            }
            self.next_token();
        }
    }

    /// Skip to something that can start a top-level item.
    fn synchronize_item(&mut self) {
        while !self.at_eof() {
            match self.current.kind {
                TokenKind::Struct | TokenKind::Packed | TokenKind::Link => return,
                TokenKind::RBrace => {
                    self.next_token();
                    return;
                }
                _ => self.next_token(),
            }
        }
    }
}
