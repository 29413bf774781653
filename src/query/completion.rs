//! Completion.

use std::collections::HashSet;

use crate::lexer::{Keyword, Position};
use crate::resolver::ResolvedProgram;
use crate::symbols::{SymbolKind, BUILTIN_TYPES};

use super::support::{module_for_file, routine_signature, type_ancestor_chain, value_signature};
use super::text::dotted_identifier_before;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Routine,
    Type,
    Variable,
    Constant,
    Field,
    Keyword,
    Module,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: Option<String>,
}

/// All keywords of the grammar, offered whenever there is no `Identifier.`
/// context.
const ALL_KEYWORDS: &[Keyword] = &[
    Keyword::Module,
    Keyword::Exe,
    Keyword::Lib,
    Keyword::Dll,
    Keyword::Import,
    Keyword::Export,
    Keyword::Const,
    Keyword::Type,
    Keyword::Var,
    Keyword::Routine,
    Keyword::Method,
    Keyword::Record,
    Keyword::Array,
    Keyword::Set,
    Keyword::Pointer,
    Keyword::Of,
    Keyword::Test,
    Keyword::Begin,
    Keyword::End,
    Keyword::If,
    Keyword::Then,
    Keyword::Else,
    Keyword::While,
    Keyword::Do,
    Keyword::For,
    Keyword::To,
    Keyword::Downto,
    Keyword::Repeat,
    Keyword::Until,
    Keyword::Case,
    Keyword::Try,
    Keyword::Except,
    Keyword::Finally,
    Keyword::Return,
    Keyword::New,
    Keyword::Dispose,
    Keyword::SetLength,
    Keyword::As,
    Keyword::Is,
    Keyword::Nil,
    Keyword::External,
    Keyword::Inherited,
    Keyword::Len,
    Keyword::And,
    Keyword::Or,
    Keyword::Not,
    Keyword::Div,
    Keyword::Mod,
];

pub fn completion(program: &ResolvedProgram, file: &str, buffer: &str, position: Position) -> Vec<CompletionItem> {
    if let Some(ident) = dotted_identifier_before(buffer, position) {
        return completion_after_dot(program, file, &ident);
    }
    completion_in_scope(program, file)
}

fn completion_after_dot(program: &ResolvedProgram, file: &str, ident: &str) -> Vec<CompletionItem> {
    let module_name = module_for_file(program, file).map(|m| m.name.text.clone());

    if let Some(module_name) = &module_name {
        if let Some(value) = super::support::find_value_symbol(program, module_name, ident) {
            if let Some(type_id) = value.type_ref {
                if program.symbols.types.contains_key(&type_id) {
                    return members_of_type(program, type_id);
                }
            }
        }
    }

    if let Some(target_module) = program.modules.values().find(|m| m.name.text.eq_ignore_ascii_case(ident)) {
        return exported_members(program, &target_module.name.text);
    }

    // `ident` is neither a known value nor a known module: the dot
    // qualifies nothing real, so only the keyword/built-in set is offered.
    keyword_and_builtin_items()
}

/// Built-in type names, boolean/`nil` literals, and every keyword — no
/// module-scoped or module-list symbols. Used both as the tail of the
/// no-dot-context result and as the whole result when a dot qualifier
/// resolves to neither a value nor a module.
fn keyword_and_builtin_items() -> Vec<CompletionItem> {
    let mut items = Vec::new();
    for name in BUILTIN_TYPES {
        items.push(CompletionItem {
            label: (*name).to_string(),
            kind: CompletionKind::Type,
            detail: None,
        });
    }
    for lit in ["true", "false", "nil"] {
        items.push(CompletionItem {
            label: lit.to_string(),
            kind: CompletionKind::Keyword,
            detail: None,
        });
    }
    for kw in ALL_KEYWORDS {
        items.push(CompletionItem {
            label: kw.text().to_string(),
            kind: CompletionKind::Keyword,
            detail: None,
        });
    }
    items
}

/// Fields and methods of `type_id`, base type chain included, most-derived
/// first, de-duplicated by name.
fn members_of_type(program: &ResolvedProgram, type_id: usize) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    for ancestor in type_ancestor_chain(&program.symbols, type_id) {
        let Some(info) = program.symbols.types.get(&ancestor) else {
            continue;
        };
        for &fid in &info.fields {
            let sym = program.symbols.get(fid);
            if seen.insert(sym.name.to_ascii_lowercase()) {
                items.push(CompletionItem {
                    label: sym.name.clone(),
                    kind: CompletionKind::Field,
                    detail: Some(value_signature(program, fid)),
                });
            }
        }
        for &mid in &info.methods {
            let sym = program.symbols.get(mid);
            if seen.insert(sym.name.to_ascii_lowercase()) {
                items.push(CompletionItem {
                    label: sym.name.clone(),
                    kind: CompletionKind::Routine,
                    detail: Some(routine_signature(program, mid)),
                });
            }
        }
    }
    items
}

/// Exported top-level members of `module_name`.
fn exported_members(program: &ResolvedProgram, module_name: &str) -> Vec<CompletionItem> {
    program
        .symbols
        .members_of(module_name)
        .iter()
        .filter_map(|&id| {
            let sym = program.symbols.get(id);
            if !sym.exported || sym.kind == SymbolKind::Module {
                return None;
            }
            Some(completion_item_for(program, id))
        })
        .collect()
}

/// Every symbol visible in `file`'s module, plus keywords, built-in types
/// and boolean literals.
fn completion_in_scope(program: &ResolvedProgram, file: &str) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    if let Some(module) = module_for_file(program, file) {
        for &id in program.symbols.members_of(&module.name.text) {
            let sym = program.symbols.get(id);
            if sym.kind == SymbolKind::Module {
                continue;
            }
            items.push(completion_item_for(program, id));
        }
    }

    for module in program.modules.values() {
        items.push(CompletionItem {
            label: module.name.text.clone(),
            kind: CompletionKind::Module,
            detail: None,
        });
    }
    items.extend(keyword_and_builtin_items());
    items
}

fn completion_item_for(program: &ResolvedProgram, id: usize) -> CompletionItem {
    let sym = program.symbols.get(id);
    match sym.kind {
        SymbolKind::Routine => CompletionItem {
            label: sym.name.clone(),
            kind: CompletionKind::Routine,
            detail: Some(routine_signature(program, id)),
        },
        SymbolKind::Type => CompletionItem {
            label: sym.name.clone(),
            kind: CompletionKind::Type,
            detail: None,
        },
        SymbolKind::Const => CompletionItem {
            label: sym.name.clone(),
            kind: CompletionKind::Constant,
            detail: Some(value_signature(program, id)),
        },
        SymbolKind::Var | SymbolKind::Param => CompletionItem {
            label: sym.name.clone(),
            kind: CompletionKind::Variable,
            detail: Some(value_signature(program, id)),
        },
        SymbolKind::Field => CompletionItem {
            label: sym.name.clone(),
            kind: CompletionKind::Field,
            detail: Some(value_signature(program, id)),
        },
        SymbolKind::Module => CompletionItem {
            label: sym.name.clone(),
            kind: CompletionKind::Module,
            detail: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::support::fixtures;

    const SOURCE: &str = "module exe Main;\n\
type TShape = record X: Integer; end;\n\
var s: TShape;\n\
routine Describe(const who: TShape): Integer;\n\
begin\n\
  return 0;\n\
end\n\
begin\n\
end\n";

    #[test]
    fn no_dot_context_offers_scope_symbols_and_keywords() {
        let (program, main) = fixtures::build(SOURCE);
        let items = completion(&program, &main, SOURCE, Position::new(7, 1));
        assert!(items.iter().any(|i| i.label == "Describe" && i.kind == CompletionKind::Routine));
        assert!(items.iter().any(|i| i.label == "TShape" && i.kind == CompletionKind::Type));
        assert!(items.iter().any(|i| i.label.eq_ignore_ascii_case("begin")));
        assert!(items.iter().any(|i| i.label.eq_ignore_ascii_case("Integer")));
    }

    #[test]
    fn dot_after_record_value_offers_its_fields() {
        let (program, main) = fixtures::build(SOURCE);
        let buffer = "s.";
        let items = completion(&program, &main, buffer, Position::new(1, 3));
        assert!(items.iter().any(|i| i.label == "X" && i.kind == CompletionKind::Field));
    }

    #[test]
    fn dot_after_unknown_module_falls_back_to_keywords_only() {
        let (program, main) = fixtures::build(SOURCE);
        let buffer = "Missing.";
        let items = completion(&program, &main, buffer, Position::new(1, 9));
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i.kind == CompletionKind::Keyword || i.kind == CompletionKind::Type));
        assert!(!items.iter().any(|i| i.label == "Describe"));
        assert!(!items.iter().any(|i| i.kind == CompletionKind::Module));
    }
}
