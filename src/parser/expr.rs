//! Expression parsing.
//!
//! Precedence, loosest to tightest:
//! `or` < `and` < relational (`= <> < <= > >=`) < `is`/`as` < additive
//! (`+ -`) < multiplicative (`* / div mod`) < unary (`- not`) < postfix
//! (call, index, field access, dereference).

use super::Parser;
use crate::ast::{BinOp, Expr, Name, UnOp};
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_expr(&mut self) -> Expr {
        self.parse_range()
    }

    /// `a..b`, used both as a standalone expression and inside `for`/`case`
    /// where the surrounding construct pulls the operands apart again.
    fn parse_range(&mut self) -> Expr {
        let lhs = self.parse_or();
        if self.check(&TokenKind::DotDot) {
            let position = self.position();
            self.advance();
            let rhs = self.parse_or();
            Expr::Range {
                start: Box::new(lhs),
                end: Box::new(rhs),
                position,
            }
        } else {
            lhs
        }
    }

    fn parse_or(&mut self) -> Expr {
        let mut lhs = self.parse_and();
        while self.check_keyword(Keyword::Or) {
            let position = self.position();
            self.advance();
            let rhs = self.parse_and();
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }
        lhs
    }

    fn parse_and(&mut self) -> Expr {
        let mut lhs = self.parse_relational();
        while self.check_keyword(Keyword::And) {
            let position = self.position();
            self.advance();
            let rhs = self.parse_relational();
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }
        lhs
    }

    fn parse_relational(&mut self) -> Expr {
        let mut lhs = self.parse_is_as();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let rhs = self.parse_is_as();
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }
        lhs
    }

    fn parse_is_as(&mut self) -> Expr {
        let mut lhs = self.parse_additive();
        loop {
            if self.check_keyword(Keyword::As) {
                let position = self.position();
                self.advance();
                let type_name = self
                    .expect_identifier()
                    .unwrap_or_else(|| Name::new("<type>", position));
                lhs = Expr::Cast {
                    target: Box::new(lhs),
                    type_name,
                    position,
                };
            } else if self.check_keyword(Keyword::Is) {
                let position = self.position();
                self.advance();
                let type_name = self
                    .expect_identifier()
                    .unwrap_or_else(|| Name::new("<type>", position));
                lhs = Expr::TypeTest {
                    target: Box::new(lhs),
                    type_name,
                    position,
                };
            } else {
                break;
            }
        }
        lhs
    }

    fn parse_additive(&mut self) -> Expr {
        let mut lhs = self.parse_multiplicative();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let rhs = self.parse_multiplicative();
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }
        lhs
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Keyword(Keyword::Div) => BinOp::IntDiv,
                TokenKind::Keyword(Keyword::Mod) => BinOp::Mod,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let rhs = self.parse_unary();
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        let position = self.position();
        if self.eat(&TokenKind::Minus) {
            let operand = Box::new(self.parse_unary());
            Expr::Unary {
                op: UnOp::Neg,
                operand,
                position,
            }
        } else if self.eat_keyword(Keyword::Not) {
            let operand = Box::new(self.parse_unary());
            Expr::Unary {
                op: UnOp::Not,
                operand,
                position,
            }
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            let position = self.position();
            if self.eat(&TokenKind::LParen) {
                let mut args = Vec::new();
                while !self.check(&TokenKind::RParen) && !self.is_eof() {
                    args.push(self.parse_expr());
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen, "')' closing call arguments");
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    position,
                };
            } else if self.eat(&TokenKind::Dot) {
                let field = self
                    .expect_identifier()
                    .unwrap_or_else(|| Name::new("<field>", position));
                expr = Expr::FieldAccess {
                    target: Box::new(expr),
                    field,
                    position,
                };
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.parse_expr();
                self.expect(&TokenKind::RBracket, "']' closing index expression");
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                    position,
                };
            } else if self.eat(&TokenKind::Caret) {
                expr = Expr::Deref {
                    target: Box::new(expr),
                    position,
                };
            } else {
                break;
            }
        }
        expr
    }

    fn parse_primary(&mut self) -> Expr {
        let position = self.position();
        match self.peek_kind().clone() {
            TokenKind::IntLiteral(value) => {
                self.advance();
                Expr::IntLiteral { value, position }
            }
            TokenKind::FloatLiteral(value) => {
                self.advance();
                Expr::FloatLiteral { value, position }
            }
            TokenKind::StringLiteral(value) => {
                self.advance();
                Expr::StringLiteral { value, position }
            }
            TokenKind::CharLiteral(value) => {
                self.advance();
                Expr::CharLiteral { value, position }
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Expr::BoolLiteral {
                    value: true,
                    position,
                }
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Expr::BoolLiteral {
                    value: false,
                    position,
                }
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                Expr::NilLiteral { position }
            }
            TokenKind::Keyword(Keyword::Inherited) => {
                self.advance();
                let method = self
                    .expect_identifier()
                    .unwrap_or_else(|| Name::new("<method>", position));
                let mut args = Vec::new();
                if self.eat(&TokenKind::LParen) {
                    while !self.check(&TokenKind::RParen) && !self.is_eof() {
                        args.push(self.parse_expr());
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RParen, "')' closing inherited call arguments");
                }
                Expr::Inherited {
                    method,
                    args,
                    position,
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(&TokenKind::RParen, "')' closing parenthesized expression");
                inner
            }
            TokenKind::LBrace => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&TokenKind::RBrace) && !self.is_eof() {
                    elements.push(self.parse_expr());
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace, "'}' closing set literal");
                Expr::SetLiteral { elements, position }
            }
            TokenKind::Identifier(_) => {
                let name = self.expect_identifier().expect("checked Identifier above");
                Expr::Ident(name)
            }
            _ => {
                self.error_unexpected("expected an expression");
                // Synchronize without consuming the offending section keyword.
                if !self.is_eof() && !self.check(&TokenKind::Semicolon) {
                    self.advance();
                }
                Expr::Ident(Name::new("<error>", position))
            }
        }
    }
}
