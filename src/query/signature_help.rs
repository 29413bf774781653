//! Signature help.

use crate::lexer::Position;
use crate::resolver::ResolvedProgram;
use crate::symbols::SymbolId;

use super::support::{find_value_symbol, module_for_file, routine_signature, type_ancestor_chain};
use super::text::callee_before_paren;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub label: String,
    pub param_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHelpResult {
    pub signatures: Vec<Signature>,
    pub active_parameter: usize,
}

pub fn signature_help(
    program: &ResolvedProgram,
    file: &str,
    buffer: &str,
    position: Position,
) -> Option<SignatureHelpResult> {
    let ctx = callee_before_paren(buffer, position)?;
    let module = module_for_file(program, file)?;

    let overloads = if let Some(qualifier) = &ctx.qualifier {
        overloads_for_qualifier(program, &module.name.text, qualifier, &ctx.name)
    } else {
        program.symbols.overloads_in_module(&module.name.text, &ctx.name)
    };

    if overloads.is_empty() {
        return None;
    }

    let signatures = overloads
        .into_iter()
        .map(|id| Signature {
            label: routine_signature(program, id),
            param_count: program
                .symbols
                .routines
                .get(&id)
                .map(|info| info.params.len())
                .unwrap_or(0),
        })
        .collect();

    Some(SignatureHelpResult {
        signatures,
        active_parameter: ctx.active_param,
    })
}

/// Overloads reachable through `qualifier.name(...)`: either a module's
/// exported overload group, or the method overload group of the value
/// `qualifier`'s type, base-inclusive.
fn overloads_for_qualifier(
    program: &ResolvedProgram,
    current_module: &str,
    qualifier: &str,
    name: &str,
) -> Vec<SymbolId> {
    if program
        .modules
        .values()
        .any(|m| m.name.text.eq_ignore_ascii_case(qualifier))
    {
        return program
            .symbols
            .overloads_in_module(qualifier, name)
            .into_iter()
            .filter(|&id| program.symbols.get(id).exported)
            .collect();
    }

    let Some(value) = find_value_symbol(program, current_module, qualifier) else {
        return Vec::new();
    };
    let Some(type_id) = value.type_ref else {
        return Vec::new();
    };

    let mut methods = Vec::new();
    for ancestor in type_ancestor_chain(&program.symbols, type_id) {
        let Some(info) = program.symbols.types.get(&ancestor) else {
            continue;
        };
        for &mid in &info.methods {
            if program.symbols.get(mid).name.eq_ignore_ascii_case(name) {
                methods.push(mid);
            }
        }
    }
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::support::fixtures;

    /// Scenario B: two overloads of `Add`, active parameter tracks the
    /// comma count at the cursor.
    const SCENARIO_B: &str = "module exe Main;\n\
routine Add(const a: Integer; const b: Integer): Integer;\n\
begin\n\
end\n\
routine Add(const a: Float; const b: Float): Float;\n\
begin\n\
end\n\
begin\n\
end\n";

    #[test]
    fn both_overloads_appear_in_declaration_order_with_active_parameter_zero() {
        let (program, main) = fixtures::build(SCENARIO_B);
        let result = signature_help(&program, &main, "Add(", Position::new(1, 5)).unwrap();
        assert_eq!(result.signatures.len(), 2);
        assert!(result.signatures[0].label.to_ascii_lowercase().contains("integer"));
        assert!(result.signatures[1].label.to_ascii_lowercase().contains("float"));
        assert_eq!(result.active_parameter, 0);
    }

    #[test]
    fn active_parameter_advances_to_one_after_typing_a_comma() {
        let (program, main) = fixtures::build(SCENARIO_B);
        let result = signature_help(&program, &main, "Add(1,", Position::new(1, 7)).unwrap();
        assert_eq!(result.active_parameter, 1);
    }
}
