//! Statement parsing.

use super::{ParseResult, Parser};
use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::token::TokenKind;

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.cur_kind() {
            TokenKind::LBrace => self.parse_scope(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            _ => {
                let expr = self.parse_expr()?;
                let end = self.expect(&TokenKind::Semi)?;
                let span = expr.span.to(end);
                // A bare declaration is its own statement kind.
                let kind = match expr {
                    Expr {
                        kind: ExprKind::Decl(decl),
                        ..
                    } => StmtKind::Decl(*decl),
                    other => StmtKind::Expr(other),
                };
                Ok(Stmt { kind, span })
            }
        }
    }

    fn parse_scope(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(&TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.cur_is(&TokenKind::RBrace) && !self.at_eof() {
            body.push(self.parse_statement()?);
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(Stmt {
            kind: StmtKind::Scope(body),
            span: start.to(end),
        })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_statement()?;
        let span = start.to(body.span);
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                body: Box::new(body),
            },
            span,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_statement()?;
        let span = start.to(body.span);
        Ok(Stmt {
            kind: StmtKind::While {
                cond,
                body: Box::new(body),
            },
            span,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(&TokenKind::Return)?;
        if self.cur_is(&TokenKind::Semi) {
            let end = self.expect(&TokenKind::Semi)?;
            return Ok(Stmt {
                kind: StmtKind::ReturnVoid,
                span: start.to(end),
            });
        }
        let value = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semi)?;
        Ok(Stmt {
            kind: StmtKind::Return(value),
            span: start.to(end),
        })
    }
}
