//! Statement and block parsing.

use super::Parser;
use crate::ast::{Block, CaseBranch, CaseValue, Expr, Name, Stmt};
use crate::diagnostic::{Code, Diagnostic};
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    /// Parses a `begin ... end` block. The caller has already established
    /// that `begin` is current.
    pub(super) fn parse_block(&mut self) -> Block {
        let position = self.position();
        self.expect_keyword(Keyword::Begin);
        let mut statements = Vec::new();
        while !self.check_keyword(Keyword::End) && !self.is_eof() {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_stmt());
        }
        let end_line = self.position().line;
        self.expect_keyword(Keyword::End);
        Block {
            statements,
            position,
            end_line,
        }
    }

    fn parse_stmt(&mut self) -> Stmt {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Begin) => Stmt::Block(self.parse_block()),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Repeat) => self.parse_repeat(),
            TokenKind::Keyword(Keyword::Case) => self.parse_case(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::New) => self.parse_new(),
            TokenKind::Keyword(Keyword::Dispose) => self.parse_dispose(),
            TokenKind::Keyword(Keyword::SetLength) => self.parse_set_length(),
            _ => self.parse_assignment_or_expr(),
        }
    }

    fn parse_if(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::If);
        let condition = self.parse_expr();
        self.expect_keyword(Keyword::Then);
        let then_branch = self.parse_stmt_block_body();
        let mut end_line = then_branch.end_line;
        let else_branch = if self.eat_keyword(Keyword::Else) {
            let block = self.parse_stmt_block_body();
            end_line = block.end_line;
            Some(block)
        } else {
            None
        };
        self.eat(&TokenKind::Semicolon);
        Stmt::If {
            condition,
            then_branch,
            else_branch,
            position,
            end_line,
        }
    }

    /// `then`/`else`/`do` bodies may be a single statement or a `begin...end`
    /// block; both are folded into a [`Block`] so every body shape shares
    /// one end-line representation for folding ranges.
    fn parse_stmt_block_body(&mut self) -> Block {
        let position = self.position();
        if self.check_keyword(Keyword::Begin) {
            self.parse_block()
        } else {
            let stmt = self.parse_stmt();
            let end_line = stmt.end_line().unwrap_or(stmt.position().line);
            Block {
                statements: vec![stmt],
                position,
                end_line,
            }
        }
    }

    fn parse_while(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::While);
        let condition = self.parse_expr();
        self.expect_keyword(Keyword::Do);
        let body = self.parse_stmt_block_body();
        let end_line = body.end_line;
        self.eat(&TokenKind::Semicolon);
        Stmt::While {
            condition,
            body,
            position,
            end_line,
        }
    }

    fn parse_for(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::For);
        let loop_var = self
            .expect_identifier()
            .unwrap_or_else(|| Name::new("<loop-var>", position));
        self.expect(&TokenKind::Assign, "':=' in for-loop header");
        let start = self.parse_expr();
        let downto = if self.eat_keyword(Keyword::To) {
            false
        } else {
            self.expect_keyword(Keyword::Downto);
            true
        };
        let end = self.parse_expr();
        self.expect_keyword(Keyword::Do);
        let body = self.parse_stmt_block_body();
        let end_line = body.end_line;
        self.eat(&TokenKind::Semicolon);
        Stmt::For {
            loop_var,
            start,
            end,
            downto,
            body,
            position,
            end_line,
        }
    }

    fn parse_repeat(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::Repeat);
        let mut statements = Vec::new();
        while !self.check_keyword(Keyword::Until) && !self.is_eof() {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_stmt());
        }
        let body_end_line = self.position().line;
        self.expect_keyword(Keyword::Until);
        let condition = self.parse_expr();
        self.eat(&TokenKind::Semicolon);
        Stmt::Repeat {
            body: Block {
                statements,
                position,
                end_line: body_end_line,
            },
            condition,
            position,
            end_line: self.position().line.max(body_end_line),
        }
    }

    fn parse_case(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::Case);
        let subject = self.parse_expr();
        self.expect_keyword(Keyword::Of);
        let mut branches = Vec::new();
        let mut else_branch = None;
        while !self.check_keyword(Keyword::End) && !self.is_eof() {
            if self.eat_keyword(Keyword::Else) {
                let mut statements = Vec::new();
                while !self.check_keyword(Keyword::End) && !self.is_eof() {
                    if self.eat(&TokenKind::Semicolon) {
                        continue;
                    }
                    statements.push(self.parse_stmt());
                }
                let end_line = self.position().line;
                else_branch = Some(Block {
                    statements,
                    position,
                    end_line,
                });
                break;
            }
            branches.push(self.parse_case_branch());
        }
        let end_line = self.position().line;
        self.expect_keyword(Keyword::End);
        self.eat(&TokenKind::Semicolon);
        Stmt::Case {
            subject,
            branches,
            else_branch,
            position,
            end_line,
        }
    }

    fn parse_case_branch(&mut self) -> CaseBranch {
        let position = self.position();
        let mut values = Vec::new();
        loop {
            let value = self.parse_expr();
            self.reject_string_case_selector(&value);
            if self.eat(&TokenKind::DotDot) {
                let high = self.parse_expr();
                self.reject_string_case_selector(&high);
                values.push(CaseValue::Range(value, high));
            } else {
                values.push(CaseValue::Const(value));
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Colon, "':' after case branch values");
        let body = self.parse_stmt_block_body();
        self.eat(&TokenKind::Semicolon);
        CaseBranch {
            values,
            body,
            position,
        }
    }

    /// Case labels are restricted to ordinal/enumerable literal forms; a
    /// string literal selector is rejected rather than silently accepted.
    fn reject_string_case_selector(&mut self, value: &Expr) {
        if let Expr::StringLiteral { position, .. } = value {
            self.diagnostics.push(Diagnostic::new(
                Code::StringCaseSelector,
                self.file,
                *position,
                "case branch selector cannot be a string literal",
            ));
        }
    }

    fn parse_try(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::Try);
        let body = self.parse_stmt_sequence_until(&[Keyword::Except, Keyword::Finally, Keyword::End]);
        let except = if self.eat_keyword(Keyword::Except) {
            Some(self.parse_stmt_sequence_until(&[Keyword::Finally, Keyword::End]))
        } else {
            None
        };
        let finally = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_stmt_sequence_until(&[Keyword::End]))
        } else {
            None
        };
        let end_line = self.position().line;
        self.expect_keyword(Keyword::End);
        self.eat(&TokenKind::Semicolon);
        Stmt::Try {
            body,
            except,
            finally,
            position,
            end_line,
        }
    }

    fn parse_stmt_sequence_until(&mut self, terminators: &[Keyword]) -> Block {
        let position = self.position();
        let mut statements = Vec::new();
        while !terminators.iter().any(|kw| self.check_keyword(*kw)) && !self.is_eof() {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_stmt());
        }
        let end_line = self.position().line;
        Block {
            statements,
            position,
            end_line,
        }
    }

    fn parse_return(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::Return);
        let value = if self.check(&TokenKind::Semicolon) || self.check_keyword(Keyword::End) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.eat(&TokenKind::Semicolon);
        Stmt::Return { value, position }
    }

    fn parse_new(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::New);
        self.expect(&TokenKind::LParen, "'(' after 'new'");
        let target = self.parse_expr();
        let as_type = if self.eat_keyword(Keyword::As) {
            self.expect_identifier()
        } else {
            None
        };
        self.expect(&TokenKind::RParen, "')' closing 'new'");
        self.eat(&TokenKind::Semicolon);
        Stmt::New {
            target,
            as_type,
            position,
        }
    }

    fn parse_dispose(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::Dispose);
        self.expect(&TokenKind::LParen, "'(' after 'dispose'");
        let target = self.parse_expr();
        self.expect(&TokenKind::RParen, "')' closing 'dispose'");
        self.eat(&TokenKind::Semicolon);
        Stmt::Dispose { target, position }
    }

    fn parse_set_length(&mut self) -> Stmt {
        let position = self.position();
        self.expect_keyword(Keyword::SetLength);
        self.expect(&TokenKind::LParen, "'(' after 'setlength'");
        let target = self.parse_expr();
        self.expect(&TokenKind::Comma, "',' before length argument");
        let length = self.parse_expr();
        self.expect(&TokenKind::RParen, "')' closing 'setlength'");
        self.eat(&TokenKind::Semicolon);
        Stmt::SetLength {
            target,
            length,
            position,
        }
    }

    fn parse_assignment_or_expr(&mut self) -> Stmt {
        let position = self.position();
        let expr = self.parse_expr();
        if self.eat(&TokenKind::Assign) {
            let value = self.parse_expr();
            self.eat(&TokenKind::Semicolon);
            Stmt::Assignment {
                target: expr,
                value,
                position,
            }
        } else {
            self.eat(&TokenKind::Semicolon);
            Stmt::Expr(expr)
        }
    }
}
