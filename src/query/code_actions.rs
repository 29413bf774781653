//! Code actions.

use crate::diagnostic::Code;
use crate::lexer::Position;
use crate::resolver::ResolvedProgram;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub position: Position,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAction {
    pub title: String,
    pub file: String,
    pub edits: Vec<TextEdit>,
}

const MODULE_KEYWORD_LEN: usize = "module".len();

/// One quick-fix action per legal module kind, each inserting that kind's
/// keyword followed by a space immediately after the `module` keyword
///.
pub fn code_actions(program: &ResolvedProgram, file: &str, position: Position) -> Vec<CodeAction> {
    program
        .diagnostics
        .iter()
        .filter(|d| d.code == Code::MissingModuleKind && d.file == file && d.position.line == position.line)
        .flat_map(|d| missing_module_kind_actions(file, d.position))
        .collect()
}

fn missing_module_kind_actions(file: &str, header_position: Position) -> Vec<CodeAction> {
    let insert_at = Position::new(header_position.line, header_position.column + MODULE_KEYWORD_LEN);
    [("EXE", "Insert EXE module type"), ("DLL", "Insert DLL module type"), ("LIB", "Insert LIB module type")]
        .into_iter()
        .map(|(kind, title)| CodeAction {
            title: title.to_string(),
            file: file.to_string(),
            edits: vec![TextEdit {
                position: insert_at,
                new_text: format!("{kind} "),
            }],
        })
        .collect()
}
