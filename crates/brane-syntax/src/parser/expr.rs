//! Expression parsing.
//!
//! Precedence, loosest first: assignment, comparison, add/sub, mul/div,
//! cast, primary. Comparison does not chain; `a < b < c` is a syntax
//! error at the second operator.

use super::{ParseResult, Parser};
use crate::ast::{BinaryOp, CompareOp, Expr, ExprKind};
use crate::token::TokenKind;
use brane_common::Span;

impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let dest = self.parse_comparison()?;
        if self.eat(&TokenKind::Assign) {
            let value = self.parse_assignment()?;
            let span = dest.span.to(value.span);
            return Ok(Expr {
                kind: ExprKind::Assign {
                    dest: Box::new(dest),
                    value: Box::new(value),
                },
                span,
            });
        }
        Ok(dest)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_addsub()?;
        let op = match self.cur_kind() {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::NotEq,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::LtEq => CompareOp::LtEq,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::GtEq => CompareOp::GtEq,
            _ => return Ok(left),
        };
        self.next_token();
        let right = self.parse_addsub()?;
        let span = left.span.to(right.span);
        Ok(Expr {
            kind: ExprKind::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        })
    }

    fn parse_addsub(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_muldiv()?;
        loop {
            let op = match self.cur_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.next_token();
            let right = self.parse_muldiv()?;
            let span = left.span.to(right.span);
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
    }

    fn parse_muldiv(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_cast()?;
        loop {
            let op = match self.cur_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.next_token();
            let right = self.parse_cast()?;
            let span = left.span.to(right.span);
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
    }

    fn parse_cast(&mut self) -> ParseResult<Expr> {
        let mut value = self.parse_primary()?;
        while self.eat(&TokenKind::As) {
            let ty = self.parse_ident()?;
            let span = value.span.to(ty.span);
            value = Expr {
                kind: ExprKind::Cast {
                    value: Box::new(value),
                    ty,
                },
                span,
            };
        }
        Ok(value)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let span = self.cur_span();
        match self.cur_kind().clone() {
            TokenKind::Int(v) => {
                self.next_token();
                Ok(Expr {
                    kind: ExprKind::ConstInt(v),
                    span,
                })
            }
            TokenKind::Float(v) => {
                self.next_token();
                Ok(Expr {
                    kind: ExprKind::ConstFloat(v),
                    span,
                })
            }
            TokenKind::Char(v) => {
                self.next_token();
                Ok(Expr {
                    kind: ExprKind::ConstChar(v),
                    span,
                })
            }
            TokenKind::Str(v) => {
                self.next_token();
                Ok(Expr {
                    kind: ExprKind::ConstString(v),
                    span,
                })
            }
            TokenKind::True => {
                self.next_token();
                Ok(Expr {
                    kind: ExprKind::ConstBool(true),
                    span,
                })
            }
            TokenKind::False => {
                self.next_token();
                Ok(Expr {
                    kind: ExprKind::ConstBool(false),
                    span,
                })
            }
            TokenKind::New => {
                self.next_token();
                let ty = self.parse_ident()?;
                Ok(Expr {
                    span: span.to(ty.span),
                    kind: ExprKind::New { ty },
                })
            }
            TokenKind::Delete => {
                self.next_token();
                let ptr = self.parse_expr()?;
                Ok(Expr {
                    span: span.to(ptr.span),
                    kind: ExprKind::Delete { ptr: Box::new(ptr) },
                })
            }
            TokenKind::LParen => {
                self.next_token();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            // `const`/`ref`, or a type name followed by a second identifier,
            // start a declaration in expression position.
            TokenKind::Const | TokenKind::Ref => self.parse_decl_expr(),
            TokenKind::Ident(_) if self.peek_is(&TokenKind::Ident(String::new())) => {
                self.parse_decl_expr()
            }
            TokenKind::Ident(_) => self.parse_ident_expr(),
            other => {
                self.error(format!("expected expression, found {}", other.name()));
                Err(())
            }
        }
    }

    fn parse_decl_expr(&mut self) -> ParseResult<Expr> {
        let decl = self.parse_declaration()?;
        Ok(Expr {
            span: decl.span,
            kind: ExprKind::Decl(Box::new(decl)),
        })
    }

    /// An identifier-led expression: value reference, member access, local
    /// call, or library call.
    fn parse_ident_expr(&mut self) -> ParseResult<Expr> {
        let base = self.parse_ident()?;

        if self.cur_is(&TokenKind::LParen) {
            let (args, end) = self.parse_argument_pack()?;
            let span = base.span.to(end);
            return Ok(Expr {
                kind: ExprKind::Call {
                    namespace: None,
                    name: base,
                    args,
                },
                span,
            });
        }

        if self.eat(&TokenKind::Dot) {
            let member = self.parse_ident()?;
            if self.cur_is(&TokenKind::LParen) {
                let (args, end) = self.parse_argument_pack()?;
                let span = base.span.to(end);
                return Ok(Expr {
                    kind: ExprKind::Call {
                        namespace: Some(base),
                        name: member,
                        args,
                    },
                    span,
                });
            }
            let span = base.span.to(member.span);
            return Ok(Expr {
                kind: ExprKind::Member { base, member },
                span,
            });
        }

        Ok(Expr {
            span: base.span,
            kind: ExprKind::Id(base.name),
        })
    }

    fn parse_argument_pack(&mut self) -> ParseResult<(Vec<Expr>, Span)> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.cur_is(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(&TokenKind::RParen)?;
        Ok((args, end))
    }
}
