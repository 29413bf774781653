//! Recursive-descent parser.
//!
//! Produces one [`crate::ast::Module`] per file. The parser is hand-written
//! (no parser-generator crate; recovery uses sentinel diagnostics and
//! synchronization points, not exceptions) and recovers from malformed input by skipping to the
//! next synchronization point (a top-level section keyword, a statement
//! semicolon, or the end of a block), emitting exactly one diagnostic per
//! recovery and then resuming. A structurally unrecoverable error (EOF
//! mid-declaration) still yields the partial module built so far; downstream
//! components tolerate missing sub-trees.

mod decl;
mod expr;
mod routine;
mod stmt;
mod types;

use crate::ast::*;
use crate::diagnostic::{Code, Diagnostic};
use crate::lexer::{Keyword, Position, Token, TokenKind};

pub struct ParseResult {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn parse(file: &str, tokens: Vec<Token>) -> ParseResult {
    let mut parser = Parser::new(file, tokens);
    let module = parser.parse_module();
    ParseResult {
        module,
        diagnostics: parser.diagnostics,
    }
}

pub(crate) struct Parser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

/// Keywords that begin a new top-level section or declaration; used as
/// synchronization points during error recovery.
const SECTION_KEYWORDS: &[Keyword] = &[
    Keyword::Import,
    Keyword::Const,
    Keyword::Type,
    Keyword::Var,
    Keyword::Routine,
    Keyword::Method,
    Keyword::Test,
    Keyword::Begin,
    Keyword::End,
];

impl<'a> Parser<'a> {
    fn new(file: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            file,
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn position(&self) -> Position {
        self.peek().position
    }

    fn is_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if !self.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        self.peek_kind().is_keyword(kw)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Option<Token> {
        if self.check_keyword(kw) {
            Some(self.advance())
        } else {
            self.error_unexpected(&format!("expected '{}'", kw.text()));
            None
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error_unexpected(&format!("expected {what}"));
            None
        }
    }

    fn expect_identifier(&mut self) -> Option<Name> {
        let position = self.position();
        if let TokenKind::Identifier(text) = self.peek_kind().clone() {
            self.advance();
            Some(Name::new(text, position))
        } else {
            self.error_unexpected("expected an identifier");
            None
        }
    }

    fn error_unexpected(&mut self, message: &str) {
        let position = self.position();
        let found = self.peek().text.clone();
        self.diagnostics.push(Diagnostic::new(
            Code::UnexpectedToken,
            self.file,
            position,
            format!("{message}, found '{found}'"),
        ));
    }

    /// Skips tokens until a synchronization point is reached: a top-level
    /// section keyword, a statement-level semicolon, or the end of a block
    ///. Emits exactly one diagnostic for the recovery.
    fn synchronize(&mut self) {
        let position = self.position();
        self.diagnostics.push(Diagnostic::new(
            Code::ParseRecovery,
            self.file,
            position,
            "skipping malformed input while recovering",
        ));
        while !self.is_eof() {
            if SECTION_KEYWORDS.iter().any(|kw| self.check_keyword(*kw)) {
                return;
            }
            if self.eat(&TokenKind::Semicolon) {
                return;
            }
            self.advance();
        }
    }

    /// Parses one full module: header, import list, any ordering of
    /// const/type/var/routine sections, the entry body (exe modules only),
    /// and trailing test declarations.
    fn parse_module(&mut self) -> Module {
        let header_position = self.position();
        let _ = self.expect_keyword(Keyword::Module);

        let kind = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Exe) => {
                self.advance();
                ModuleKind::Exe
            }
            TokenKind::Keyword(Keyword::Lib) => {
                self.advance();
                ModuleKind::Lib
            }
            TokenKind::Keyword(Keyword::Dll) => {
                self.advance();
                ModuleKind::Dll
            }
            _ => {
                self.diagnostics.push(Diagnostic::new(
                    Code::MissingModuleKind,
                    self.file,
                    header_position,
                    "module header is missing its exe/lib/dll kind",
                ));
                ModuleKind::Missing
            }
        };

        let name = self
            .expect_identifier()
            .unwrap_or_else(|| Name::new("<anonymous>", header_position));
        self.eat(&TokenKind::Semicolon);

        let mut module = Module::new(self.file, name, header_position);
        module.kind = kind;

        let imports = self.parse_import_list();
        module.imports = imports;

        loop {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Const) => {
                    module.consts.extend(self.parse_const_section());
                }
                TokenKind::Keyword(Keyword::Type) => {
                    module.types.extend(self.parse_type_section());
                }
                TokenKind::Keyword(Keyword::Var) => {
                    module.vars.extend(self.parse_var_section());
                }
                TokenKind::Keyword(Keyword::Routine) | TokenKind::Keyword(Keyword::Method) => {
                    module.routines.push(self.parse_routine(false));
                }
                TokenKind::Keyword(Keyword::Export)
                    if matches!(
                        self.tokens.get(self.pos + 1).map(|t| &t.kind),
                        Some(TokenKind::Keyword(Keyword::Routine))
                            | Some(TokenKind::Keyword(Keyword::Method))
                    ) =>
                {
                    self.advance();
                    module.routines.push(self.parse_routine(true));
                }
                TokenKind::Keyword(Keyword::Begin) => {
                    module.entry_body = Some(self.parse_block());
                }
                TokenKind::Keyword(Keyword::Test) => break,
                TokenKind::Eof => break,
                TokenKind::Keyword(Keyword::End) => {
                    self.advance();
                    self.eat(&TokenKind::Semicolon);
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

        while self.check_keyword(Keyword::Test) {
            module.tests.push(self.parse_test());
        }

        module.end_line = self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)]
            .position
            .line
            .max(module.position.line);
        module
    }

    fn parse_import_list(&mut self) -> Vec<Import> {
        let mut imports = Vec::new();
        while self.eat_keyword(Keyword::Import) {
            loop {
                if let Some(name) = self.expect_identifier() {
                    imports.push(Import { path: name });
                } else {
                    break;
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.eat(&TokenKind::Semicolon);
        }
        imports
    }

    fn parse_test(&mut self) -> TestDecl {
        let position = self.position();
        self.expect_keyword(Keyword::Test);
        let name = self
            .expect_identifier()
            .unwrap_or_else(|| Name::new("<test>", position));
        self.eat(&TokenKind::Semicolon);
        let body = self.parse_block();
        self.eat(&TokenKind::Semicolon);
        TestDecl {
            name,
            end_line: body.end_line,
            body,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CaseValue, ParamMode, Stmt, TypeBody};

    fn parse_src(src: &str) -> ParseResult {
        let tokens = crate::lexer::lex("t.vl", src).tokens;
        parse("t.vl", tokens)
    }

    #[test]
    fn record_without_parens_has_no_base() {
        let result = parse_src("module exe M;\ntype T = record X: Integer; end;\nbegin\nend\n");
        assert!(result.diagnostics.is_empty());
        let TypeBody::Record(body) = &result.module.types[0].body else {
            panic!("expected a record body");
        };
        assert!(body.parent.is_none());
        assert_eq!(body.fields.len(), 1);
    }

    #[test]
    fn record_extension_captures_parent_name_and_position() {
        let result = parse_src("module exe M;\ntype T = record(Base) X: Integer; end;\nbegin\nend\n");
        let TypeBody::Record(body) = &result.module.types[0].body else {
            panic!("expected a record body");
        };
        let parent = body.parent.as_ref().expect("parent type");
        assert_eq!(parent.text, "Base");
        assert_eq!(parent.position.line, 2);
    }

    #[test]
    fn variadic_marker_is_the_sole_parameter_and_sets_the_flag() {
        let result = parse_src("module exe M;\nroutine Log(...);\nbegin\nend\nbegin\nend\n");
        let routine = &result.module.routines[0];
        assert!(routine.variadic);
        assert!(routine.params.is_empty());
    }

    #[test]
    fn parameter_modifiers_default_to_by_value() {
        let result =
            parse_src("module exe M;\nroutine F(const a: Integer; var b: Integer; c: Integer);\nbegin\nend\nbegin\nend\n");
        let params = &result.module.routines[0].params;
        assert_eq!(params[0].mode, ParamMode::Const);
        assert_eq!(params[1].mode, ParamMode::ByRef);
        assert_eq!(params[2].mode, ParamMode::ByValue);
    }

    #[test]
    fn case_branch_accepts_comma_values_a_range_and_an_else() {
        let src = "module exe M;\n\
begin\n\
  case x of\n\
    1, 2: y := 1;\n\
    3..5: y := 2;\n\
    else y := 0;\n\
  end\n\
end\n";
        let result = parse_src(src);
        let Stmt::Case { branches, else_branch, .. } = &result.module.entry_body.as_ref().unwrap().statements[0] else {
            panic!("expected a case statement");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].values.len(), 2);
        assert!(matches!(branches[0].values[0], CaseValue::Const(_)));
        assert!(matches!(branches[1].values[0], CaseValue::Range(_, _)));
        assert!(else_branch.is_some());
    }

    #[test]
    fn case_branch_rejects_a_string_literal_selector() {
        let src = "module exe M;\n\
begin\n\
  case x of\n\
    \"a\": y := 1;\n\
  end\n\
end\n";
        let result = parse_src(src);
        assert!(result.diagnostics.iter().any(|d| d.code == Code::StringCaseSelector));
    }

    #[test]
    fn missing_module_kind_still_yields_a_usable_partial_module() {
        let result = parse_src("module M;\nbegin\nend\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::MissingModuleKind);
        assert_eq!(result.module.name.text, "M");
        assert!(matches!(result.module.kind, ModuleKind::Missing));
    }
}
