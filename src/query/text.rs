//! Raw-text cursor helpers that never touch the symbol model.
//!
//! These operate on the *open buffer's* text, not the last build's AST —
//! completion and signature-help need to react to keystrokes the session
//! has not rebuilt for yet.

use crate::lexer::Position;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// The identifier occupying `position` in `text`, or `None` if the cursor is
/// outside one.
pub fn word_at_position(text: &str, position: Position) -> Option<String> {
    let line = text.lines().nth(position.line.checked_sub(1)?)?;
    let chars: Vec<char> = line.chars().collect();
    let cursor = position.column.checked_sub(1)?;
    if cursor > chars.len() {
        return None;
    }

    let mut start = cursor;
    while start > 0 && is_ident_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = cursor;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    if start == end {
        return None;
    }
    Some(chars[start..end].iter().collect())
}

/// The identifier immediately before a `.` at `position`, when the cursor
/// sits right after `Identifier.`.
pub fn dotted_identifier_before(text: &str, position: Position) -> Option<String> {
    let line = text.lines().nth(position.line.checked_sub(1)?)?;
    let chars: Vec<char> = line.chars().collect();
    let cursor = position.column.checked_sub(1)?;
    if cursor == 0 || cursor > chars.len() || chars[cursor - 1] != '.' {
        return None;
    }
    let dot = cursor - 1;
    let mut start = dot;
    while start > 0 && is_ident_char(chars[start - 1]) {
        start -= 1;
    }
    if start == dot {
        return None;
    }
    Some(chars[start..dot].iter().collect())
}

/// Maps a 1-based line/column to an index into `text.chars()`, matching how
/// the lexer advances its own line/column counters.
fn to_char_index(text: &str, position: Position) -> Option<usize> {
    let mut line = 1usize;
    let mut column = 1usize;
    for (idx, c) in text.chars().enumerate() {
        if line == position.line && column == position.column {
            return Some(idx);
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line == position.line && column == position.column).then_some(text.chars().count())
}

/// The callee name and active-parameter index for signature help and
/// completion invoked at an open or comma-separated call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalleeContext {
    pub qualifier: Option<String>,
    pub name: String,
    pub active_param: usize,
}

/// Scans leftward from `position` through balanced parentheses until an
/// unmatched `(` is found; the identifier immediately to its left is the
/// callee, and an optional `.`-qualified name before that is captured
/// separately.
pub fn callee_before_paren(text: &str, position: Position) -> Option<CalleeContext> {
    let chars: Vec<char> = text.chars().collect();
    let cursor = to_char_index(text, position)?.min(chars.len());

    let mut depth: i32 = 0;
    let mut comma_count = 0usize;
    let mut paren_idx = None;
    let mut i = cursor;
    while i > 0 {
        i -= 1;
        match chars[i] {
            ')' => depth += 1,
            '(' => {
                if depth == 0 {
                    paren_idx = Some(i);
                    break;
                }
                depth -= 1;
            }
            ',' if depth == 0 => comma_count += 1,
            _ => {}
        }
    }
    let paren_idx = paren_idx?;

    let mut end = paren_idx;
    while end > 0 && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && is_ident_char(chars[start - 1]) {
        start -= 1;
    }
    if start == end {
        return None;
    }
    let name: String = chars[start..end].iter().collect();

    let mut qend = start;
    while qend > 0 && chars[qend - 1].is_whitespace() {
        qend -= 1;
    }
    let qualifier = if qend > 0 && chars[qend - 1] == '.' {
        let dot = qend - 1;
        let mut qstart = dot;
        while qstart > 0 && is_ident_char(chars[qstart - 1]) {
            qstart -= 1;
        }
        (qstart < dot).then(|| chars[qstart..dot].iter().collect())
    } else {
        None
    };

    Some(CalleeContext {
        qualifier,
        name,
        active_param: comma_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_at_end_of_identifier() {
        let word = word_at_position("foo bar", Position::new(1, 4));
        assert_eq!(word.as_deref(), Some("foo"));
    }

    #[test]
    fn word_inside_whitespace_is_empty() {
        assert_eq!(word_at_position("foo bar", Position::new(1, 4)).is_some(), true);
        assert_eq!(word_at_position("foo  bar", Position::new(1, 5)), None);
    }

    #[test]
    fn dotted_identifier_detected_right_after_dot() {
        let word = dotted_identifier_before("c.", Position::new(1, 3));
        assert_eq!(word.as_deref(), Some("c"));
    }

    #[test]
    fn callee_name_at_zero_argument_call() {
        let ctx = callee_before_paren("Foo()", Position::new(1, 5)).unwrap();
        assert_eq!(ctx.name, "Foo");
        assert_eq!(ctx.active_param, 0);
    }

    #[test]
    fn active_parameter_advances_after_comma() {
        let ctx = callee_before_paren("Add(1,", Position::new(1, 7)).unwrap();
        assert_eq!(ctx.name, "Add");
        assert_eq!(ctx.active_param, 1);
    }

    #[test]
    fn qualifier_captured_on_dotted_call() {
        let ctx = callee_before_paren("Mod.Helper(", Position::new(1, 12)).unwrap();
        assert_eq!(ctx.qualifier.as_deref(), Some("Mod"));
        assert_eq!(ctx.name, "Helper");
    }

    #[test]
    fn balanced_inner_parens_are_skipped() {
        let ctx = callee_before_paren("Outer(Inner(1), ", Position::new(1, 17)).unwrap();
        assert_eq!(ctx.name, "Outer");
        assert_eq!(ctx.active_param, 1);
    }
}
