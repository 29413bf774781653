//! Shared lookups every query operation builds on.

use std::collections::HashSet;

use crate::ast::Module;
use crate::lexer::{Position, Span};
use crate::resolver::ResolvedProgram;
use crate::symbols::{Symbol, SymbolId, SymbolKind, SymbolTable};

/// A source location, always given in 1-based line/column internally —
/// conversion to the wire's 0-based positions happens at the transport edge
///.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub range: Span,
}

/// The span of `name` starting at `position`, one column per byte of its
/// text — Vela identifiers are ASCII, so this matches the invariant that a
/// referenced name's range spans exactly its textual length.
pub fn name_span(position: Position, len: usize) -> Span {
    Span::point(position, len)
}

/// Finds the symbol whose own captured name occupies `position` in `file`,
/// by scanning the resolver's `uses` map for an entry on the same line whose
/// column range contains the cursor. Every referenced name's own position is
/// recorded there, so this single lookup backs hover,
/// go-to-definition, references and rename alike.
pub fn symbol_at_position(program: &ResolvedProgram, file: &str, position: Position) -> Option<SymbolId> {
    program
        .uses
        .iter()
        .filter(|((use_file, use_pos), _)| use_file == file && use_pos.line == position.line)
        .filter_map(|((_, use_pos), &id)| {
            let len = program.symbols.get(id).name.chars().count().max(1);
            let end_col = use_pos.column + len;
            (position.column >= use_pos.column && position.column < end_col).then_some((use_pos.column, id))
        })
        .max_by_key(|(col, _)| *col)
        .map(|(_, id)| id)
}

/// The declaration location of a symbol, or `None` for built-ins.
pub fn declaration_location(symbol: &Symbol) -> Option<Location> {
    let file = symbol.file.clone()?;
    let position = symbol.position?;
    let len = symbol.name.chars().count();
    Some(Location {
        file,
        range: name_span(position, len),
    })
}

/// The module AST node owning `symbol`, by its case-insensitive module name.
pub fn owning_module<'p>(program: &'p ResolvedProgram, symbol: &Symbol) -> Option<&'p Module> {
    program.modules.get(&symbol.module.to_ascii_lowercase())
}

/// Every (file, position) entry in `uses` that points at `symbol_id`,
/// including its own declaration site.
pub fn all_uses_of<'p>(
    program: &'p ResolvedProgram,
    symbol_id: SymbolId,
) -> impl Iterator<Item = (&'p str, Position)> + 'p {
    program
        .uses
        .iter()
        .filter(move |(_, &id)| id == symbol_id)
        .map(|((file, pos), _)| (file.as_str(), *pos))
}

/// The module owning the file at `file`, if any module in the program was
/// loaded from it.
pub fn module_for_file<'p>(program: &'p ResolvedProgram, file: &str) -> Option<&'p Module> {
    program.modules.values().find(|m| m.file == file)
}

/// `id`'s own base-inclusive ancestor chain, innermost (itself) first,
/// walking `TypeInfo::base` links. Used by completion (base-inclusive field
/// and method lookup) and casts/type-tests.
pub fn type_ancestor_chain(symbols: &SymbolTable, id: SymbolId) -> Vec<SymbolId> {
    let mut chain = vec![id];
    let mut seen: HashSet<SymbolId> = HashSet::from([id]);
    let mut current = id;
    while let Some(base) = symbols.types.get(&current).and_then(|t| t.base) {
        if !seen.insert(base) {
            break;
        }
        chain.push(base);
        current = base;
    }
    chain
}

/// Renders a routine's full signature, as hover and completion details both
/// want it: `routine Name(p1: T1; p2: T2): R`.
pub fn routine_signature(program: &ResolvedProgram, routine_id: SymbolId) -> String {
    let sym = program.symbols.get(routine_id);
    let info = program.symbols.routines.get(&routine_id);
    let params: Vec<String> = info
        .map(|i| {
            i.params
                .iter()
                .map(|&p| {
                    let psym = program.symbols.get(p);
                    format!("{}: {}", psym.name, type_name_of(program, psym.type_ref))
                })
                .collect()
        })
        .unwrap_or_default();
    let variadic = info.map(|i| i.variadic).unwrap_or(false);
    let mut param_list = params.join("; ");
    if variadic {
        if !param_list.is_empty() {
            param_list.push_str("; ");
        }
        param_list.push_str("...");
    }
    let ret = info
        .and_then(|i| i.return_type)
        .map(|r| format!(": {}", type_name_of(program, Some(r))))
        .unwrap_or_default();
    let keyword = if info.and_then(|i| i.receiver_type).is_some() {
        "method"
    } else {
        "routine"
    };
    format!("{keyword} {}({param_list}){ret}", sym.name)
}

/// Renders a var/const/field/param's `kind Name: Type` line.
pub fn value_signature(program: &ResolvedProgram, symbol_id: SymbolId) -> String {
    let sym = program.symbols.get(symbol_id);
    let kind = match sym.kind {
        SymbolKind::Var => "var",
        SymbolKind::Const => "const",
        SymbolKind::Field => "field",
        SymbolKind::Param => "param",
        SymbolKind::Type => "type",
        SymbolKind::Routine => "routine",
        SymbolKind::Module => "module",
    };
    if sym.kind == SymbolKind::Type {
        return format!("type {}", sym.name);
    }
    format!("{kind} {}: {}", sym.name, type_name_of(program, sym.type_ref))
}

fn type_name_of(program: &ResolvedProgram, type_id: Option<SymbolId>) -> String {
    type_id
        .map(|id| program.symbols.get(id).name.clone())
        .unwrap_or_else(|| "?".to_string())
}

/// Test-only fixture shared by every query module's unit tests: writes
/// `source` as `Main.vl` in a fresh temp directory and runs it through the
/// loader and resolver, exactly as `Session::rebuild` would.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::loader::{self, SearchPaths};
    use crate::resolver::{self, ResolvedProgram};

    pub fn build(source: &str) -> (ResolvedProgram, String) {
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "vela-query-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let main = dir.join("Main.vl");
        std::fs::write(&main, source).unwrap();

        let search = SearchPaths::new(dir);
        let loaded = loader::load_program(&main, &search);
        let program = resolver::resolve(loaded);
        (program, main.to_string_lossy().into_owned())
    }
}

/// A best-effort value symbol named `name` visible in `module` — top-level
/// members first, then any scoped symbol (param/local var/const) declared in
/// that module, most recently declared first. The core only rebuilds on
/// open/save, so a query running against an edited-but-unsaved
/// buffer cannot re-derive an exact lexical scope; this mirrors what the
/// last build actually resolved, which is the same staleness every other
/// query already accepts.
pub fn find_value_symbol<'p>(program: &'p ResolvedProgram, module: &str, name: &str) -> Option<&'p Symbol> {
    if let Some(id) = program.symbols.find_in_module(module, name) {
        let sym = program.symbols.get(id);
        if matches!(
            sym.kind,
            SymbolKind::Var | SymbolKind::Const | SymbolKind::Field | SymbolKind::Param
        ) {
            return Some(sym);
        }
    }
    program
        .symbols
        .iter()
        .filter(|s| {
            s.module.eq_ignore_ascii_case(module)
                && s.name.eq_ignore_ascii_case(name)
                && matches!(
                    s.kind,
                    SymbolKind::Var | SymbolKind::Const | SymbolKind::Field | SymbolKind::Param
                )
        })
        .last()
}
