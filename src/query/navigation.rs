//! Go-to-definition, type-definition, implementation, references and
//! document highlights.

use crate::lexer::Position;
use crate::resolver::ResolvedProgram;
use crate::symbols::SymbolId;

use super::support::{all_uses_of, declaration_location, name_span, symbol_at_position, Location};

/// The symbol referenced at `position`, and its own declaration location —
/// the starting point shared by every navigation query.
fn resolve(program: &ResolvedProgram, file: &str, position: Position) -> Option<(SymbolId, Location)> {
    let id = symbol_at_position(program, file, position)?;
    let location = declaration_location(program.symbols.get(id))?;
    Some((id, location))
}

pub fn go_to_definition(program: &ResolvedProgram, file: &str, position: Position) -> Option<Location> {
    resolve(program, file, position).map(|(_, loc)| loc)
}

/// Walks through the symbol's own type reference; built-ins have no
/// location and return an empty result.
pub fn type_definition(program: &ResolvedProgram, file: &str, position: Position) -> Option<Location> {
    let id = symbol_at_position(program, file, position)?;
    let type_id = program.symbols.get(id).type_ref?;
    declaration_location(program.symbols.get(type_id))
}

/// This language has no separate interface/implementation split, so
/// implementation returns the same location as definition.
pub fn implementation(program: &ResolvedProgram, file: &str, position: Position) -> Option<Location> {
    go_to_definition(program, file, position)
}

/// Every use of the symbol at `position`, across every module in the
/// session, including its own declaration site.
pub fn references(program: &ResolvedProgram, file: &str, position: Position) -> Vec<Location> {
    let Some((id, _)) = resolve(program, file, position) else {
        return Vec::new();
    };
    let len = program.symbols.get(id).name.chars().count().max(1);
    all_uses_of(program, id)
        .map(|(use_file, use_pos)| Location {
            file: use_file.to_string(),
            range: name_span(use_pos, len),
        })
        .collect()
}

/// Like [`references`], restricted to `file`.
pub fn document_highlights(program: &ResolvedProgram, file: &str, position: Position) -> Vec<Location> {
    references(program, file, position)
        .into_iter()
        .filter(|loc| loc.file == file)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::support::fixtures;

    /// Scenario A: a method override resolved on a more-derived receiver
    ///.
    const SCENARIO_A: &str = "module exe Main;\n\
type TShape = record X: Integer; end;\n\
type TCircle = record(TShape) R: Integer; end;\n\
method Describe(var Self: TShape);\n\
begin\n\
end\n\
method Describe(var Self: TCircle);\n\
begin\n\
end\n\
var c: TCircle;\n\
begin\n\
  c.Describe();\n\
end\n";

    #[test]
    fn method_override_resolves_to_the_most_derived_definition() {
        let (program, main) = fixtures::build(SCENARIO_A);
        // `c.Describe()` call site: column of "Describe" in "  c.Describe();".
        let call_site = Position::new(12, 5);
        let def = go_to_definition(&program, &main, call_site).expect("resolves");
        assert_eq!(def.range.start.line, 7, "resolves to TCircle's override, not TShape's");
    }

    #[test]
    fn references_on_either_definition_include_both_and_the_call_site() {
        let (program, main) = fixtures::build(SCENARIO_A);
        let at_tcircle_def = Position::new(7, 8);
        let refs = references(&program, &main, at_tcircle_def);
        assert!(refs.iter().any(|l| l.range.start.line == 7));
        assert!(refs.iter().any(|l| l.range.start.line == 12));
    }
}
