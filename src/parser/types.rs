//! Type-expression parsing: named types, static/dynamic arrays, sets,
//! pointers and routine types.

use super::Parser;
use crate::ast::{Name, TypeExpr};
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_type_expr(&mut self) -> TypeExpr {
        let position = self.position();
        match self.peek_kind().clone() {
            TokenKind::Keyword(Keyword::Array) => {
                self.advance();
                let bounds = if self.eat(&TokenKind::LBracket) {
                    let low = self.parse_int_literal();
                    self.expect(&TokenKind::DotDot, "'..' in array bounds");
                    let high = self.parse_int_literal();
                    self.expect(&TokenKind::RBracket, "']' closing array bounds");
                    Some((low, high))
                } else {
                    None
                };
                self.expect_keyword(Keyword::Of);
                let element = Box::new(self.parse_type_expr());
                match bounds {
                    Some((low, high)) => TypeExpr::StaticArray {
                        element,
                        low,
                        high,
                        position,
                    },
                    None => TypeExpr::DynamicArray { element, position },
                }
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.advance();
                self.expect_keyword(Keyword::Of);
                let element = Box::new(self.parse_type_expr());
                TypeExpr::Set { element, position }
            }
            TokenKind::Keyword(Keyword::Pointer) => {
                self.advance();
                self.expect_keyword(Keyword::To);
                let target = Box::new(self.parse_type_expr());
                TypeExpr::Pointer { target, position }
            }
            TokenKind::Keyword(Keyword::Routine) | TokenKind::Keyword(Keyword::Method) => {
                self.advance();
                let mut params = Vec::new();
                if self.eat(&TokenKind::LParen) {
                    while !self.check(&TokenKind::RParen) && !self.is_eof() {
                        params.push(self.parse_type_expr());
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RParen, "')' closing parameter type list");
                }
                let return_type = if self.eat(&TokenKind::Colon) {
                    Some(Box::new(self.parse_type_expr()))
                } else {
                    None
                };
                TypeExpr::Routine {
                    params,
                    return_type,
                    position,
                }
            }
            _ => match self.expect_identifier() {
                Some(name) => TypeExpr::Named(name),
                None => TypeExpr::Named(Name::new("<unknown>", position)),
            },
        }
    }

    fn parse_int_literal(&mut self) -> i64 {
        match self.peek_kind().clone() {
            TokenKind::IntLiteral(value) => {
                self.advance();
                value
            }
            TokenKind::Minus => {
                self.advance();
                -self.parse_int_literal()
            }
            _ => {
                self.error_unexpected("expected an integer literal");
                0
            }
        }
    }
}
