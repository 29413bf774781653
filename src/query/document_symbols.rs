//! Document symbols.

use crate::lexer::{Position, Span};
use crate::resolver::ResolvedProgram;
use crate::symbols::SymbolKind;

use super::support::{module_for_file, name_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSymbolKind {
    Module,
    Routine,
    Type,
    Variable,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: DocumentSymbolKind,
    /// The declaration's full extent (start line through end line).
    pub range: Span,
    /// The declaration's own name span, for the editor's "select name" UX.
    pub selection_range: Span,
}

fn full_range(position: Position, end_line: usize) -> Span {
    Span::new(position, Position::new(end_line, 1))
}

pub fn document_symbols(program: &ResolvedProgram, file: &str) -> Vec<DocumentSymbol> {
    let Some(module) = module_for_file(program, file) else {
        return Vec::new();
    };

    program
        .symbols
        .members_of(&module.name.text)
        .iter()
        .filter_map(|&id| {
            let sym = program.symbols.get(id);
            let position = sym.position?;
            let selection_range = name_span(position, sym.name.chars().count());

            let (kind, range) = match sym.kind {
                SymbolKind::Module => (DocumentSymbolKind::Module, full_range(position, module.end_line)),
                SymbolKind::Type => {
                    let end_line = module
                        .types
                        .iter()
                        .find(|t| t.position == position)
                        .map(|t| t.end_line)
                        .unwrap_or(position.line);
                    (DocumentSymbolKind::Type, full_range(position, end_line))
                }
                SymbolKind::Routine => {
                    let end_line = module
                        .routines
                        .iter()
                        .find(|r| r.position == position)
                        .map(|r| r.end_line)
                        .or_else(|| module.tests.iter().find(|t| t.position == position).map(|t| t.end_line))
                        .unwrap_or(position.line);
                    (DocumentSymbolKind::Routine, full_range(position, end_line))
                }
                SymbolKind::Const => (DocumentSymbolKind::Constant, selection_range),
                SymbolKind::Var => (DocumentSymbolKind::Variable, selection_range),
                SymbolKind::Field | SymbolKind::Param => return None,
            };

            Some(DocumentSymbol {
                name: sym.name.clone(),
                kind,
                range,
                selection_range,
            })
        })
        .collect()
}
