//! Semantic tokens.

use crate::lexer::Position;
use crate::resolver::ResolvedProgram;
use crate::symbols::SymbolKind;

/// The fixed legend; index position doubles as the
/// `token_type` the transport advertises in `semanticTokensProvider.legend`.
pub const TOKEN_TYPE_LEGEND: &[&str] = &[
    "namespace", "type", "parameter", "variable", "property", "function", "enumMember",
];

pub const MODIFIER_DECLARATION: u32 = 1 << 0;
pub const MODIFIER_READONLY: u32 = 1 << 1;
pub const MODIFIER_DEFAULT_LIBRARY: u32 = 1 << 2;

fn token_type_index(kind: SymbolKind) -> Option<u32> {
    match kind {
        SymbolKind::Module => Some(0),
        SymbolKind::Type => Some(1),
        SymbolKind::Param => Some(2),
        SymbolKind::Var => Some(3),
        SymbolKind::Field => Some(4),
        SymbolKind::Routine => Some(5),
        SymbolKind::Const => Some(6),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticToken {
    pub position: Position,
    pub length: usize,
    pub token_type: u32,
    pub modifiers: u32,
}

/// Every name-bearing position in `file`'s module, unsorted by construction
/// since it is built straight off `uses`' hash-map iteration order.
pub fn semantic_tokens(program: &ResolvedProgram, file: &str) -> Vec<SemanticToken> {
    let mut tokens: Vec<SemanticToken> = program
        .uses
        .iter()
        .filter(|((use_file, _), _)| use_file == file)
        .filter_map(|((_, position), &symbol_id)| {
            let sym = program.symbols.get(symbol_id);
            let token_type = token_type_index(sym.kind)?;
            let mut modifiers = 0u32;
            if sym.position == Some(*position) {
                modifiers |= MODIFIER_DECLARATION;
            }
            if sym.kind == SymbolKind::Const {
                modifiers |= MODIFIER_READONLY;
            }
            if sym.builtin {
                modifiers |= MODIFIER_DEFAULT_LIBRARY;
            }
            Some(SemanticToken {
                position: *position,
                length: sym.name.chars().count().max(1),
                token_type,
                modifiers,
            })
        })
        .collect();

    if let Some(module) = super::support::module_for_file(program, file) {
        for import in &module.imports {
            if program
                .modules
                .values()
                .any(|m| m.name.text.eq_ignore_ascii_case(&import.path.text))
            {
                tokens.push(SemanticToken {
                    position: import.path.position,
                    length: import.path.text.chars().count().max(1),
                    token_type: 0,
                    modifiers: 0,
                });
            }
        }
    }

    sort_by_position(&mut tokens);
    tokens
}

fn sort_by_position(tokens: &mut [SemanticToken]) {
    tokens.sort_by_key(|t| (t.position.line, t.position.column));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaToken {
    pub delta_line: usize,
    pub delta_start: usize,
    pub length: usize,
    pub token_type: u32,
    pub modifiers: u32,
}

/// Delta-encodes an already line/column-sorted token stream against the
/// previous token, in (line, column) order.
pub fn encode_delta(tokens: &[SemanticToken]) -> Vec<DeltaToken> {
    let mut prev_line = 0usize;
    let mut prev_col = 0usize;
    let mut out = Vec::with_capacity(tokens.len());

    for token in tokens {
        let delta_line = token.position.line - prev_line;
        let delta_start = if delta_line == 0 {
            token.position.column - prev_col
        } else {
            token.position.column
        };
        out.push(DeltaToken {
            delta_line,
            delta_start,
            length: token.length,
            token_type: token.token_type,
            modifiers: token.modifiers,
        });
        prev_line = token.position.line;
        prev_col = token.position.column;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::support::fixtures;

    const SOURCE: &str = "module exe Main;\n\
routine Say(const name: String);\n\
begin\n\
end\n\
begin\n\
  for I := 1 to 3 do\n\
    Say(I);\n\
  end\n\
end\n";

    #[test]
    fn tokens_are_strictly_increasing_after_delta_decode() {
        let (program, main) = fixtures::build(SOURCE);
        let tokens = semantic_tokens(&program, &main);
        let deltas = encode_delta(&tokens);

        let mut line = 0usize;
        let mut col = 0usize;
        let mut prev: Option<(usize, usize)> = None;
        for d in &deltas {
            if d.delta_line > 0 {
                line += d.delta_line;
                col = d.delta_start;
            } else {
                col += d.delta_start;
            }
            if let Some((pl, pc)) = prev {
                assert!((line, col) > (pl, pc));
            }
            prev = Some((line, col));
        }
    }

    #[test]
    fn for_loop_variable_is_declared_once_and_referenced_again() {
        let (program, main) = fixtures::build(SOURCE);
        let tokens = semantic_tokens(&program, &main);
        let var_tokens: Vec<_> = tokens
            .iter()
            .filter(|t| t.token_type == 3)
            .collect();
        assert!(var_tokens.iter().any(|t| t.modifiers & MODIFIER_DECLARATION != 0));
        assert!(var_tokens.iter().any(|t| t.modifiers & MODIFIER_DECLARATION == 0));
    }
}
