//! Rename.

use std::collections::HashMap;

use crate::lexer::{Position, Span};
use crate::resolver::ResolvedProgram;

use super::navigation::references;
use super::support::symbol_at_position;

/// A single replacement, spanning the old name's full range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Span,
    pub new_text: String,
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => {}
        _ => return false,
    }
    chars.all(is_identifier_char)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEdit {
    /// Text edits grouped by file URI/path.
    pub changes: HashMap<String, Vec<TextEdit>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameError {
    /// Renaming a built-in fails.
    BuiltinSymbol,
    /// Renaming to an invalid identifier fails.
    InvalidIdentifier,
    NoSymbolAtPosition,
}

pub fn rename(
    program: &ResolvedProgram,
    file: &str,
    position: Position,
    new_name: &str,
) -> Result<WorkspaceEdit, RenameError> {
    if !is_valid_identifier(new_name) {
        return Err(RenameError::InvalidIdentifier);
    }

    let symbol_id = symbol_at_position(program, file, position).ok_or(RenameError::NoSymbolAtPosition)?;
    if program.symbols.get(symbol_id).builtin {
        return Err(RenameError::BuiltinSymbol);
    }

    let mut changes: HashMap<String, Vec<TextEdit>> = HashMap::new();
    for location in references(program, file, position) {
        changes.entry(location.file).or_default().push(TextEdit {
            range: location.range,
            new_text: new_name.to_string(),
        });
    }

    Ok(WorkspaceEdit { changes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::support::fixtures;

    const SOURCE: &str = "module exe Main;\n\
var x: Integer;\n\
begin\n\
end\n";

    #[test]
    fn renaming_a_builtin_type_is_rejected() {
        let (program, main) = fixtures::build(SOURCE);
        // Column of "Integer" on `var x: Integer;`.
        let at_builtin = Position::new(2, 8);
        let err = rename(&program, &main, at_builtin, "Int64").unwrap_err();
        assert_eq!(err, RenameError::BuiltinSymbol);
    }

    #[test]
    fn renaming_a_local_variable_produces_one_edit_per_use() {
        let (program, main) = fixtures::build(SOURCE);
        // Column of "x" on `var x: Integer;`.
        let at_decl = Position::new(2, 5);
        let edit = rename(&program, &main, at_decl, "y").expect("renames");
        let edits = edit.changes.get(&main).expect("one file touched");
        assert_eq!(edits.len(), 1, "only the declaration site references `x` here");
        assert_eq!(edits[0].new_text, "y");
    }
}
