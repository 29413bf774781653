//! `const`, `type` and `var` section parsing.

use super::Parser;
use crate::ast::{ConstDecl, FieldDecl, Name, RecordBody, TypeBody, TypeDecl, VarDecl};
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    /// Consumes a leading `export` modifier if present.
    fn parse_exported(&mut self) -> bool {
        self.eat_keyword(Keyword::Export)
    }

    pub(super) fn parse_const_section(&mut self) -> Vec<ConstDecl> {
        self.expect_keyword(Keyword::Const);
        let mut decls = Vec::new();
        loop {
            let exported = self.parse_exported();
            let position = self.position();
            let name = match self.expect_identifier() {
                Some(n) => n,
                None => break,
            };
            self.expect(&TokenKind::Eq, "'=' in const declaration");
            let value = self.parse_expr();
            self.eat(&TokenKind::Semicolon);
            decls.push(ConstDecl {
                name,
                value,
                exported,
                position,
            });
            if !self.is_const_decl_start() {
                break;
            }
        }
        decls
    }

    fn is_const_decl_start(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(_))
            || self.check_keyword(Keyword::Export)
    }

    pub(super) fn parse_type_section(&mut self) -> Vec<TypeDecl> {
        self.expect_keyword(Keyword::Type);
        let mut decls = Vec::new();
        loop {
            let exported = self.parse_exported();
            let position = self.position();
            let name = match self.expect_identifier() {
                Some(n) => n,
                None => break,
            };
            self.expect(&TokenKind::Eq, "'=' in type declaration");
            let body = self.parse_type_body();
            let end_line = self.position().line.max(position.line);
            self.eat(&TokenKind::Semicolon);
            decls.push(TypeDecl {
                name,
                body,
                exported,
                position,
                end_line,
            });
            if !self.is_type_decl_start() {
                break;
            }
        }
        decls
    }

    fn is_type_decl_start(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(_))
            || self.check_keyword(Keyword::Export)
    }

    fn parse_type_body(&mut self) -> TypeBody {
        if self.check_keyword(Keyword::Record) {
            self.advance();
            let parent = if self.eat(&TokenKind::LParen) {
                let p = self.expect_identifier();
                self.expect(&TokenKind::RParen, "')' closing record parent");
                p
            } else {
                None
            };
            let mut fields = Vec::new();
            while !self.check_keyword(Keyword::End) && !self.is_eof() {
                fields.push(self.parse_field_decl());
            }
            self.expect_keyword(Keyword::End);
            self.eat(&TokenKind::Semicolon);
            TypeBody::Record(RecordBody { parent, fields })
        } else {
            TypeBody::Alias(self.parse_type_expr())
        }
    }

    fn parse_field_decl(&mut self) -> FieldDecl {
        let position = self.position();
        let name = self
            .expect_identifier()
            .unwrap_or_else(|| Name::new("<field>", position));
        self.expect(&TokenKind::Colon, "':' before field type");
        let type_ref = self.parse_type_expr();
        self.eat(&TokenKind::Semicolon);
        FieldDecl {
            name,
            type_ref,
            position,
        }
    }

    pub(super) fn parse_var_section(&mut self) -> Vec<VarDecl> {
        self.expect_keyword(Keyword::Var);
        let mut decls = Vec::new();
        loop {
            let exported = self.parse_exported();
            let position = self.position();
            let name = match self.expect_identifier() {
                Some(n) => n,
                None => break,
            };
            let type_ref = if self.eat(&TokenKind::Colon) {
                Some(self.parse_type_expr())
            } else {
                None
            };
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expr())
            } else {
                None
            };
            self.eat(&TokenKind::Semicolon);
            decls.push(VarDecl {
                name,
                type_ref,
                init,
                exported,
                position,
            });
            if !self.is_var_decl_start() {
                break;
            }
        }
        decls
    }

    fn is_var_decl_start(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(_))
            || self.check_keyword(Keyword::Export)
    }
}
