//! Lexical analysis.
//!
//! Hand-written, single-pass scanner. Keywords are recognized
//! case-insensitively; identifiers preserve their source case. Whitespace
//! and comments never reach the token stream but still advance line/column
//! tracking, so every subsequent token's position is exact.
//!
//! Errors (unterminated string/comment, invalid numeric literal, unknown
//! punctuator) are recorded as diagnostics with their start position;
//! lexing always continues from the next plausible boundary and the scanner
//! still produces a complete token stream ending in `Eof`.

mod scanner;
mod token;

pub use token::{Keyword, Position, Span, Token, TokenKind};

use crate::diagnostic::{Code, Diagnostic};

pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn lex(file: &str, source: &str) -> LexResult {
    scanner::Scanner::new(file, source).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex("t.vl", src).tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_case_insensitively() {
        let ks = kinds("Module EXE module");
        assert_eq!(
            ks,
            vec![
                TokenKind::Keyword(Keyword::Module),
                TokenKind::Keyword(Keyword::Exe),
                TokenKind::Keyword(Keyword::Module),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn preserves_identifier_case() {
        let tokens = lex("t.vl", "MyVar").tokens;
        match &tokens[0].kind {
            TokenKind::Identifier(name) => assert_eq!(name, "MyVar"),
            other => panic!("expected identifier, got {other:?}"),
        }
    }

    #[test]
    fn lexes_hex_and_decimal_numbers() {
        let ks = kinds("42 0x2A");
        assert_eq!(
            ks,
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::IntLiteral(42),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_string_with_doubled_quote_escape() {
        let tokens = lex("t.vl", "'it''s'").tokens;
        match &tokens[0].kind {
            TokenKind::StringLiteral(s) => assert_eq!(s, "it's"),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn single_quoted_escape_of_length_one_is_a_char_literal() {
        let tokens = lex("t.vl", r"'\n' '\x41' 'ab'").tokens;
        assert_eq!(tokens[0].kind, TokenKind::CharLiteral('\n'));
        assert_eq!(tokens[1].kind, TokenKind::CharLiteral('A'));
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral("ab".into()));
    }

    #[test]
    fn reports_unterminated_string() {
        let result = lex("t.vl", "'abc");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::UnterminatedLiteral);
    }

    #[test]
    fn skips_line_and_block_comments() {
        let ks = kinds("// hello\n42 (* block \n comment *) 7");
        assert_eq!(
            ks,
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::IntLiteral(7),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn tracks_positions_after_newlines() {
        let tokens = lex("t.vl", "a\nb").tokens;
        assert_eq!(tokens[0].position, Position::new(1, 1));
        assert_eq!(tokens[1].position, Position::new(2, 1));
    }

    #[test]
    fn lexes_range_and_variadic_and_pointer_operators() {
        let ks = kinds(".. ... ^ :=");
        assert_eq!(
            ks,
            vec![
                TokenKind::DotDot,
                TokenKind::DotDotDot,
                TokenKind::Caret,
                TokenKind::Assign,
                TokenKind::Eof
            ]
        );
    }
}
