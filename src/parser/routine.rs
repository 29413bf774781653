//! Routine and method declarations. The parser always fills [`Routine::params`]
//! in full, including a leading `var Self: T` if written — the resolver is
//! what recognizes that convention and binds the routine as a method, via
//! [`crate::symbols::RoutineInfo::receiver_type`]; the parser stays purely
//! structural and keeps no receiver field of its own.

use super::Parser;
use crate::ast::{Name, Param, ParamMode, Routine};
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_routine(&mut self, exported: bool) -> Routine {
        let position = self.position();
        // `routine` and `method` both parse into the same node; method-ness
        // is read off the receiver later, not the introducing keyword.
        self.advance();

        let name = self
            .expect_identifier()
            .unwrap_or_else(|| Name::new("<routine>", position));

        let mut params = Vec::new();
        let mut variadic = false;
        if self.eat(&TokenKind::LParen) {
            while !self.check(&TokenKind::RParen) && !self.is_eof() {
                if self.eat(&TokenKind::DotDotDot) {
                    variadic = true;
                    break;
                }
                params.push(self.parse_param());
                if !self.eat(&TokenKind::Semicolon) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen, "')' closing parameter list");
        }

        let return_type = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type_expr())
        } else {
            None
        };

        let external = self.eat_keyword(Keyword::External);
        self.eat(&TokenKind::Semicolon);

        let mut local_consts = Vec::new();
        let mut local_vars = Vec::new();
        let mut body = None;
        let mut end_line = self.position().line.max(position.line);

        if !external {
            loop {
                match self.peek_kind() {
                    TokenKind::Keyword(Keyword::Const) => {
                        local_consts.extend(self.parse_const_section());
                    }
                    TokenKind::Keyword(Keyword::Var) => {
                        local_vars.extend(self.parse_var_section());
                    }
                    TokenKind::Keyword(Keyword::Begin) => {
                        let block = self.parse_block();
                        end_line = block.end_line;
                        body = Some(block);
                        break;
                    }
                    _ => {
                        self.synchronize();
                        if self.is_eof() {
                            break;
                        }
                    }
                }
            }
            self.eat(&TokenKind::Semicolon);
        }

        Routine {
            name,
            params,
            return_type,
            variadic,
            local_consts,
            local_vars,
            body,
            external,
            exported,
            position,
            end_line,
        }
    }

    fn parse_param(&mut self) -> Param {
        let position = self.position();
        let mode = if self.eat_keyword(Keyword::Const) {
            ParamMode::Const
        } else if self.eat_keyword(Keyword::Var) {
            ParamMode::ByRef
        } else {
            ParamMode::ByValue
        };
        let name = self
            .expect_identifier()
            .unwrap_or_else(|| Name::new("<param>", position));
        self.expect(&TokenKind::Colon, "':' before parameter type");
        let type_ref = self.parse_type_expr();
        Param {
            name,
            type_ref,
            mode,
            position,
        }
    }
}
