//! Hover.

use crate::lexer::Position;
use crate::resolver::ResolvedProgram;
use crate::symbols::SymbolKind;

use super::support::{routine_signature, symbol_at_position, value_signature};
use super::text::word_at_position;

/// A fixed lexicon for words that never resolve to a symbol: keywords and
/// built-in type names.
fn fixed_lexicon(word: &str) -> Option<&'static str> {
    Some(match word.to_ascii_lowercase().as_str() {
        "module" => "keyword: introduces a compilation unit",
        "exe" => "keyword: an executable module kind",
        "lib" => "keyword: a library module kind",
        "dll" => "keyword: a dynamic-library module kind",
        "import" => "keyword: brings another module's exports into scope",
        "export" => "keyword: marks a declaration reachable via Module.Name",
        "const" => "keyword: a compile-time constant, or a by-value readonly parameter",
        "type" => "keyword: introduces a type declaration",
        "var" => "keyword: a mutable variable, or a by-reference parameter",
        "routine" => "keyword: a free routine declaration",
        "method" => "keyword: a routine dispatched on an explicit receiver",
        "record" => "keyword: a structured type, optionally extending a parent",
        "array" => "keyword: a static or dynamic array type",
        "set" => "keyword: a set type",
        "pointer" => "keyword: an untyped or typed pointer",
        "begin" | "end" => "keyword: block delimiter",
        "if" | "then" | "else" => "keyword: conditional statement",
        "while" | "do" => "keyword: pre-tested loop",
        "for" | "to" | "downto" => "keyword: counted loop",
        "repeat" | "until" => "keyword: post-tested loop",
        "case" | "of" => "keyword: multi-way branch",
        "try" | "except" | "finally" => "keyword: exception handling block",
        "return" => "keyword: exits a routine, optionally with a value",
        "new" => "builtin: allocates a pointer cell",
        "dispose" => "builtin: releases a pointer cell",
        "setlength" => "builtin: resizes a dynamic array",
        "len" => "builtin: the element count of an array or string",
        "as" => "keyword: a checked narrowing cast",
        "is" => "keyword: a runtime type test",
        "nil" => "builtin: the null pointer value",
        "true" | "false" => "builtin: a boolean literal",
        "external" => "keyword: the routine is bound to a native implementation",
        "inherited" => "keyword: calls the parent type's overridden method",
        "integer" => "builtin type: signed 64-bit integer",
        "unsignedinteger" => "builtin type: unsigned 64-bit integer",
        "float" => "builtin type: 64-bit floating point",
        "boolean" => "builtin type: true or false",
        "char" => "builtin type: a single 8-bit character",
        "widechar" => "builtin type: a single wide character",
        "string" => "builtin type: a sequence of characters",
        _ => return None,
    })
}

pub fn hover(program: &ResolvedProgram, file: &str, buffer: &str, position: Position) -> Option<String> {
    if let Some(symbol_id) = symbol_at_position(program, file, position) {
        let sym = program.symbols.get(symbol_id);
        return Some(match sym.kind {
            SymbolKind::Routine => routine_signature(program, symbol_id),
            SymbolKind::Type => value_signature(program, symbol_id),
            SymbolKind::Var | SymbolKind::Const | SymbolKind::Field | SymbolKind::Param => {
                value_signature(program, symbol_id)
            }
            SymbolKind::Module => format!("module {}", sym.name),
        });
    }

    let word = word_at_position(buffer, position)?;
    fixed_lexicon(&word).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::support::fixtures;

    const SOURCE: &str = "module exe Main;\n\
type TShape = record X: Integer; end;\n\
routine Add(const a: Integer; const b: Integer): Integer;\n\
begin\n\
  return a;\n\
end\n\
begin\n\
end\n";

    #[test]
    fn hover_on_routine_renders_its_signature() {
        let (program, main) = fixtures::build(SOURCE);
        let rendered = hover(&program, &main, SOURCE, Position::new(3, 10)).unwrap();
        assert_eq!(rendered, "routine Add(a: Integer; b: Integer): Integer");
    }

    #[test]
    fn hover_on_type_renders_type_kind_only() {
        let (program, main) = fixtures::build(SOURCE);
        let rendered = hover(&program, &main, SOURCE, Position::new(2, 8)).unwrap();
        assert_eq!(rendered, "type TShape");
    }

    #[test]
    fn hover_on_unresolvable_keyword_falls_back_to_fixed_lexicon() {
        let (program, main) = fixtures::build(SOURCE);
        let rendered = hover(&program, &main, SOURCE, Position::new(1, 3)).unwrap();
        assert!(rendered.contains("keyword"));
    }
}
