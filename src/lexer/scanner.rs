use super::token::{Keyword, Position, Token, TokenKind};
use crate::diagnostic::{Code, Diagnostic};
use crate::lexer::LexResult;

pub(super) struct Scanner<'a> {
    file: &'a str,
    chars: Vec<char>,
    idx: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    pub(super) fn new(file: &'a str, source: &'a str) -> Self {
        Self {
            file,
            chars: source.chars().collect(),
            idx: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(super) fn run(mut self) -> LexResult {
        loop {
            self.skip_whitespace_and_comments();
            let start = self.here();
            let Some(c) = self.peek() else {
                self.tokens.push(Token::new(TokenKind::Eof, "", start));
                break;
            };

            if c.is_ascii_digit() {
                self.lex_number(start);
                continue;
            }
            if is_ident_start(c) {
                self.lex_identifier(start);
                continue;
            }
            if c == '\'' {
                self.lex_quoted(start);
                continue;
            }
            self.lex_punctuator(start);
        }

        LexResult {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn diagnose(&mut self, code: Code, position: Position, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(code, self.file, position, message));
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                Some('(') if self.peek_at(1) == Some('*') => {
                    let start = self.here();
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.peek() {
                        if c == '*' && self.peek_at(1) == Some(')') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        self.diagnose(Code::UnterminatedLiteral, start, "unterminated block comment");
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_identifier(&mut self, start: Position) {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = match Keyword::from_str(&text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier(text.clone()),
        };
        self.tokens.push(Token::new(kind, text, start));
    }

    fn lex_number(&mut self, start: Position) {
        let mut text = String::new();
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            text.push(self.advance().unwrap());
            text.push(self.advance().unwrap());
            let digits_start = text.len();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                text.push(self.advance().unwrap());
            }
            if text.len() == digits_start {
                self.diagnose(Code::UnexpectedToken, start, "invalid hexadecimal literal");
                self.tokens.push(Token::new(TokenKind::IntLiteral(0), text, start));
                return;
            }
            match i64::from_str_radix(&text[digits_start..], 16) {
                Ok(v) => self.tokens.push(Token::new(TokenKind::IntLiteral(v), text, start)),
                Err(_) => {
                    self.diagnose(Code::UnexpectedToken, start, "invalid hexadecimal literal");
                    self.tokens.push(Token::new(TokenKind::IntLiteral(0), text, start));
                }
            }
            return;
        }

        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }

        let mut is_float = false;
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }

        if is_float {
            match text.parse::<f64>() {
                Ok(v) => self.tokens.push(Token::new(TokenKind::FloatLiteral(v), text, start)),
                Err(_) => {
                    self.diagnose(Code::UnexpectedToken, start, "invalid numeric literal");
                    self.tokens.push(Token::new(TokenKind::FloatLiteral(0.0), text, start));
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => self.tokens.push(Token::new(TokenKind::IntLiteral(v), text, start)),
                Err(_) => {
                    self.diagnose(Code::UnexpectedToken, start, "invalid numeric literal");
                    self.tokens.push(Token::new(TokenKind::IntLiteral(0), text, start));
                }
            }
        }
    }

    /// Scans a single-quoted literal. Content is decoded honoring both the
    /// doubled-quote escape (`''` for a literal `'`) and backslash escapes
    /// (`\n \r \t \\ \' \xNN`). If the decoded content is exactly one
    /// character, the literal is a [`TokenKind::CharLiteral`]; otherwise it is
    /// a [`TokenKind::StringLiteral`].
    fn lex_quoted(&mut self, start: Position) {
        let mut raw = String::from('\'');
        self.advance(); // opening quote
        let mut decoded = String::new();
        let mut closed = false;

        loop {
            match self.peek() {
                None => break,
                Some('\'') => {
                    raw.push('\'');
                    self.advance();
                    if self.peek() == Some('\'') {
                        decoded.push('\'');
                        raw.push('\'');
                        self.advance();
                        continue;
                    }
                    closed = true;
                    break;
                }
                Some('\\') => {
                    let esc_start = self.here();
                    raw.push('\\');
                    self.advance();
                    match self.peek() {
                        Some('n') => {
                            decoded.push('\n');
                            raw.push('n');
                            self.advance();
                        }
                        Some('r') => {
                            decoded.push('\r');
                            raw.push('r');
                            self.advance();
                        }
                        Some('t') => {
                            decoded.push('\t');
                            raw.push('t');
                            self.advance();
                        }
                        Some('\\') => {
                            decoded.push('\\');
                            raw.push('\\');
                            self.advance();
                        }
                        Some('\'') => {
                            decoded.push('\'');
                            raw.push('\'');
                            self.advance();
                        }
                        Some('x') => {
                            raw.push('x');
                            self.advance();
                            let mut hex = String::new();
                            for _ in 0..2 {
                                if let Some(c) = self.peek() {
                                    if c.is_ascii_hexdigit() {
                                        hex.push(c);
                                        raw.push(c);
                                        self.advance();
                                    }
                                }
                            }
                            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                                Some(c) => decoded.push(c),
                                None => {
                                    self.diagnose(Code::UnexpectedToken, esc_start, "invalid \\xNN escape");
                                }
                            }
                        }
                        other => {
                            self.diagnose(
                                Code::UnexpectedToken,
                                esc_start,
                                format!("unknown escape sequence '\\{}'", other.unwrap_or(' ')),
                            );
                        }
                    }
                }
                Some(c) => {
                    decoded.push(c);
                    raw.push(c);
                    self.advance();
                }
            }
        }

        if !closed {
            self.diagnose(Code::UnterminatedLiteral, start, "unterminated string literal");
        }

        let kind = if decoded.chars().count() == 1 {
            TokenKind::CharLiteral(decoded.chars().next().unwrap())
        } else {
            TokenKind::StringLiteral(decoded)
        };
        self.tokens.push(Token::new(kind, raw, start));
    }

    fn lex_punctuator(&mut self, start: Position) {
        let c = self.advance().unwrap();
        let (kind, text): (TokenKind, String) = match c {
            '(' => (TokenKind::LParen, "(".into()),
            ')' => (TokenKind::RParen, ")".into()),
            '[' => (TokenKind::LBracket, "[".into()),
            ']' => (TokenKind::RBracket, "]".into()),
            '{' => (TokenKind::LBrace, "{".into()),
            '}' => (TokenKind::RBrace, "}".into()),
            ',' => (TokenKind::Comma, ",".into()),
            ';' => (TokenKind::Semicolon, ";".into()),
            '^' => (TokenKind::Caret, "^".into()),
            '+' => (TokenKind::Plus, "+".into()),
            '-' => (TokenKind::Minus, "-".into()),
            '*' => (TokenKind::Star, "*".into()),
            '/' => (TokenKind::Slash, "/".into()),
            '=' => (TokenKind::Eq, "=".into()),
            '.' => {
                if self.peek() == Some('.') {
                    self.advance();
                    if self.peek() == Some('.') {
                        self.advance();
                        (TokenKind::DotDotDot, "...".into())
                    } else {
                        (TokenKind::DotDot, "..".into())
                    }
                } else {
                    (TokenKind::Dot, ".".into())
                }
            }
            ':' => {
                if self.peek() == Some('=') {
                    self.advance();
                    (TokenKind::Assign, ":=".into())
                } else {
                    (TokenKind::Colon, ":".into())
                }
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    (TokenKind::LtEq, "<=".into())
                }
                Some('>') => {
                    self.advance();
                    (TokenKind::NotEq, "<>".into())
                }
                _ => (TokenKind::Lt, "<".into()),
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    (TokenKind::GtEq, ">=".into())
                } else {
                    (TokenKind::Gt, ">".into())
                }
            }
            other => {
                self.diagnose(Code::UnexpectedToken, start, format!("unknown punctuator '{other}'"));
                self.tokens.push(Token::new(TokenKind::Eof, other.to_string(), start));
                return self.skip_after_unknown_punctuator();
            }
        };
        self.tokens.push(Token::new(kind, text, start));
    }

    /// An unknown punctuator records a diagnostic and then resumes at the
    /// next character rather than stopping the scan. The
    /// placeholder `Eof` token pushed in `lex_punctuator` is popped back off
    /// so it does not short-circuit the stream.
    fn skip_after_unknown_punctuator(&mut self) {
        self.tokens.pop();
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
