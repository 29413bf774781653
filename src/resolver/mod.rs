//! Cross-module symbol resolver.
//!
//! Runs two passes over every module in a [`LoadedProgram`]: pass 1 seeds a
//! symbol per declaration (module, routine, type, var, const, field, param);
//! pass 2 links type references, detects inheritance cycles, binds methods
//! to their receiver types, and walks every routine/test/entry body
//! resolving identifier and field-access uses against a lexical scope
//! stack. The result is rebuilt from scratch on every call — nothing from a
//! prior resolution is reused.

mod expr;
mod types;

use std::collections::HashMap;

use crate::ast::{Module, Routine, TestDecl};
use crate::diagnostic::Diagnostic;
use crate::lexer::Position;
use crate::loader::LoadedProgram;
use crate::symbols::{Symbol, SymbolKind, SymbolTable};

pub use types::sorted_module_keys;

/// A name's own source position together with the file it was read from —
/// the key every navigation query looks up against.
pub type UseKey = (String, Position);

pub struct ResolvedProgram {
    pub modules: HashMap<String, Module>,
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
    /// Every name-bearing AST position, mapped to the symbol it declares or
    /// refers to. Covers declarations (the name's own position resolves to
    /// itself) and every later reference, so references and highlights stay
    /// point-accurate even when names appear as method binders, parent
    /// types, return types, cast targets, or loop variables.
    pub uses: HashMap<UseKey, usize>,
}

pub fn resolve(program: LoadedProgram) -> ResolvedProgram {
    let mut resolver = Resolver {
        program: &program,
        table: SymbolTable::new(),
        diagnostics: program.diagnostics.clone(),
        uses: HashMap::new(),
        const_ids: HashMap::new(),
        type_ids: HashMap::new(),
        field_ids: HashMap::new(),
        var_ids: HashMap::new(),
        routine_ids: HashMap::new(),
        param_ids: HashMap::new(),
        test_ids: HashMap::new(),
    };
    resolver.run();

    ResolvedProgram {
        modules: program.modules,
        symbols: resolver.table,
        diagnostics: resolver.diagnostics,
        uses: resolver.uses,
    }
}

struct Resolver<'p> {
    program: &'p LoadedProgram,
    table: SymbolTable,
    diagnostics: Vec<Diagnostic>,
    uses: HashMap<UseKey, usize>,

    // Positional indices from an AST declaration's place in its module's
    // arrays to the symbol id seeded for it. Needed because pass 1 (seeding)
    // and pass 2 (linking) both walk the same arrays independently — every
    // type symbol across the whole program must exist before any of them can
    // be cross-referenced, so linking cannot happen inline during seeding.
    const_ids: HashMap<(String, usize), usize>,
    type_ids: HashMap<(String, usize), usize>,
    field_ids: HashMap<(String, usize, usize), usize>,
    var_ids: HashMap<(String, usize), usize>,
    routine_ids: HashMap<(String, usize), usize>,
    param_ids: HashMap<(String, usize, usize), usize>,
    test_ids: HashMap<(String, usize), usize>,
}

/// One entry of the lexical scope stack.
pub(super) type Scope = HashMap<String, usize>;

fn module_key(module: &Module) -> String {
    module.name.text.to_ascii_lowercase()
}

impl<'p> Resolver<'p> {
    fn run(&mut self) {
        types::register_builtins(&mut self.table);

        let keys = types::sorted_module_keys(self.program);

        // Pass 1: declaration seeding.
        for key in &keys {
            let module = self.program.modules[key].clone();
            self.seed_module(&module);
        }

        // Pass 2a: type reference linking (parents, fields, params, return
        // types, var/const types) — must finish before body walking, which
        // depends on symbols' `type_ref` being populated.
        for key in &keys {
            let module = self.program.modules[key].clone();
            self.link_module_types(&module);
        }

        // Pass 2b: inheritance cycle detection, now that every base link is
        // assigned.
        self.break_inheritance_cycles();

        // Pass 2c: method binding and overload grouping.
        for key in &keys {
            let module = self.program.modules[key].clone();
            self.bind_methods(&module);
        }
        self.detect_invalid_overloads();

        // Pass 2d: body walking (identifiers, field access, casts).
        for key in &keys {
            let module = self.program.modules[key].clone();
            self.walk_module_bodies(&module);
        }
    }

    fn record_use(&mut self, file: &str, position: Position, symbol: usize) {
        self.uses.insert((file.to_string(), position), symbol);
    }

    fn seed_module(&mut self, module: &Module) {
        let mkey = module_key(module);

        let module_symbol = Symbol {
            id: 0,
            name: module.name.text.clone(),
            kind: SymbolKind::Module,
            module: module.name.text.clone(),
            file: Some(module.file.clone()),
            position: Some(module.position),
            exported: true,
            builtin: false,
            type_ref: None,
        };
        let id = self.table.insert_top_level(module_symbol);
        self.record_use(&module.file, module.name.position, id);

        for (i, c) in module.consts.iter().enumerate() {
            let sym_id = self.table.insert_top_level(Symbol {
                id: 0,
                name: c.name.text.clone(),
                kind: SymbolKind::Const,
                module: module.name.text.clone(),
                file: Some(module.file.clone()),
                position: Some(c.position),
                exported: c.exported,
                builtin: false,
                type_ref: literal_type_of(&c.value, &self.table),
            });
            self.record_use(&module.file, c.name.position, sym_id);
            self.const_ids.insert((mkey.clone(), i), sym_id);
        }

        for (i, t) in module.types.iter().enumerate() {
            let type_id = self.table.insert_top_level(Symbol {
                id: 0,
                name: t.name.text.clone(),
                kind: SymbolKind::Type,
                module: module.name.text.clone(),
                file: Some(module.file.clone()),
                position: Some(t.position),
                exported: t.exported,
                builtin: false,
                type_ref: None,
            });
            self.record_use(&module.file, t.name.position, type_id);
            self.table.types.insert(type_id, Default::default());
            self.type_ids.insert((mkey.clone(), i), type_id);

            if let crate::ast::TypeBody::Record(record) = &t.body {
                for (j, f) in record.fields.iter().enumerate() {
                    let field_id = self.table.insert(Symbol {
                        id: 0,
                        name: f.name.text.clone(),
                        kind: SymbolKind::Field,
                        module: module.name.text.clone(),
                        file: Some(module.file.clone()),
                        position: Some(f.position),
                        exported: true,
                        builtin: false,
                        type_ref: None,
                    });
                    self.record_use(&module.file, f.name.position, field_id);
                    self.table.types.get_mut(&type_id).unwrap().fields.push(field_id);
                    self.field_ids.insert((mkey.clone(), i, j), field_id);
                }
            }
        }

        for (i, v) in module.vars.iter().enumerate() {
            let sym_id = self.table.insert_top_level(Symbol {
                id: 0,
                name: v.name.text.clone(),
                kind: SymbolKind::Var,
                module: module.name.text.clone(),
                file: Some(module.file.clone()),
                position: Some(v.position),
                exported: v.exported,
                builtin: false,
                type_ref: None,
            });
            self.record_use(&module.file, v.name.position, sym_id);
            self.var_ids.insert((mkey.clone(), i), sym_id);
        }

        for (i, r) in module.routines.iter().enumerate() {
            self.seed_routine(module, &mkey, i, r);
        }

        for (i, test) in module.tests.iter().enumerate() {
            self.seed_test(module, &mkey, i, test);
        }

        self.detect_duplicate_declarations(&mkey);
    }

    /// Invariant 7: identifiers are unique within a module scope except for
    /// routine overloads. A name that collides across kinds, or that two
    /// non-routine declarations share, is flagged on every occurrence after
    /// the first; a name shared by routines alone is left to
    /// `detect_invalid_overloads`, which checks their signatures instead.
    fn detect_duplicate_declarations(&mut self, mkey: &str) {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for &id in self.table.members_of(mkey) {
            let sym = self.table.get(id);
            if sym.kind == SymbolKind::Module {
                continue;
            }
            by_name.entry(sym.name.to_ascii_lowercase()).or_default().push(id);
        }

        for ids in by_name.values() {
            if ids.len() < 2 {
                continue;
            }
            let all_routines = ids.iter().all(|&id| self.table.get(id).kind == SymbolKind::Routine);
            if all_routines {
                continue;
            }
            for &id in &ids[1..] {
                let sym = self.table.get(id);
                let (file, position) = match (sym.file.clone(), sym.position) {
                    (Some(f), Some(p)) => (f, p),
                    _ => continue,
                };
                let name = sym.name.clone();
                self.diagnostics.push(Diagnostic::new(
                    Code::DuplicateDeclaration,
                    file,
                    position,
                    format!("'{name}' is already declared in this module"),
                ));
            }
        }
    }

    /// Invariant 4: every member of an overload group must differ from its
    /// siblings by parameter types. Run once, after every module's types are
    /// linked and every method is bound (so `overload_group` already
    /// reflects method receivers, not just free-routine names).
    fn detect_invalid_overloads(&mut self) {
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for sym in self.table.iter() {
            if sym.kind != SymbolKind::Routine {
                continue;
            }
            let Some(info) = self.table.routines.get(&sym.id) else { continue };
            groups.entry(info.overload_group.clone()).or_default().push(sym.id);
        }

        for ids in groups.values() {
            if ids.len() < 2 {
                continue;
            }
            let signatures: Vec<Vec<Option<usize>>> = ids
                .iter()
                .map(|id| {
                    self.table.routines[id]
                        .params
                        .iter()
                        .map(|p| self.table.get(*p).type_ref)
                        .collect()
                })
                .collect();

            for i in 1..ids.len() {
                let clashes_with_earlier = signatures[..i].contains(&signatures[i]);
                if !clashes_with_earlier {
                    continue;
                }
                let sym = self.table.get(ids[i]);
                let (file, position) = match (sym.file.clone(), sym.position) {
                    (Some(f), Some(p)) => (f, p),
                    _ => continue,
                };
                let name = sym.name.clone();
                self.diagnostics.push(Diagnostic::new(
                    Code::InvalidOverload,
                    file,
                    position,
                    format!("'{name}' repeats an overload with identical parameter types"),
                ));
            }
        }
    }

    fn seed_routine(&mut self, module: &Module, mkey: &str, index: usize, r: &Routine) {
        let routine_id = self.table.insert_top_level(Symbol {
            id: 0,
            name: r.name.text.clone(),
            kind: SymbolKind::Routine,
            module: module.name.text.clone(),
            file: Some(module.file.clone()),
            position: Some(r.position),
            exported: r.exported,
            builtin: false,
            type_ref: None,
        });
        self.record_use(&module.file, r.name.position, routine_id);
        self.routine_ids.insert((mkey.to_string(), index), routine_id);

        let mut info = crate::symbols::RoutineInfo {
            variadic: r.variadic,
            overload_group: format!("{mkey}::{}", r.name.text.to_ascii_lowercase()),
            ..Default::default()
        };
        for (j, p) in r.params.iter().enumerate() {
            let param_id = self.table.insert(Symbol {
                id: 0,
                name: p.name.text.clone(),
                kind: SymbolKind::Param,
                module: module.name.text.clone(),
                file: Some(module.file.clone()),
                position: Some(p.position),
                exported: false,
                builtin: false,
                type_ref: None,
            });
            self.record_use(&module.file, p.name.position, param_id);
            self.param_ids.insert((mkey.to_string(), index, j), param_id);
            info.params.push(param_id);
        }
        self.table.routines.insert(routine_id, info);
    }

    fn seed_test(&mut self, module: &Module, mkey: &str, index: usize, test: &TestDecl) {
        let test_id = self.table.insert_top_level(Symbol {
            id: 0,
            name: test.name.text.clone(),
            kind: SymbolKind::Routine,
            module: module.name.text.clone(),
            file: Some(module.file.clone()),
            position: Some(test.position),
            exported: false,
            builtin: false,
            type_ref: None,
        });
        self.record_use(&module.file, test.name.position, test_id);
        self.table.routines.insert(test_id, crate::symbols::RoutineInfo::default());
        self.test_ids.insert((mkey.to_string(), index), test_id);
    }
}

/// A best-effort type for a const's initializer when it is a bare literal —
/// enough to make hover/completion show a type for the common case without
/// a full expression type checker.
fn literal_type_of(expr: &crate::ast::Expr, table: &SymbolTable) -> Option<usize> {
    use crate::ast::Expr;
    let builtin_name = match expr {
        Expr::IntLiteral { .. } => "integer",
        Expr::FloatLiteral { .. } => "float",
        Expr::StringLiteral { .. } => "string",
        Expr::CharLiteral { .. } => "char",
        Expr::BoolLiteral { .. } => "boolean",
        _ => return None,
    };
    table.find_in_module(crate::symbols::BUILTIN_MODULE, builtin_name)
}

#[cfg(test)]
mod tests {
    use crate::diagnostic::Code;
    use crate::query::support::fixtures;

    #[test]
    fn a_var_and_a_type_sharing_a_name_is_a_duplicate_declaration() {
        let (program, _) = fixtures::build(
            "module exe Main;\n\
type Foo = record X: Integer; end;\n\
var Foo: Integer;\n\
begin\n\
end\n",
        );
        let dups: Vec<_> = program
            .diagnostics
            .iter()
            .filter(|d| d.code == Code::DuplicateDeclaration)
            .collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].position.line, 3);
    }

    #[test]
    fn two_routines_with_the_same_name_are_not_flagged_as_duplicates() {
        let (program, _) = fixtures::build(
            "module exe Main;\n\
routine Add(const a: Integer; const b: Integer): Integer;\n\
begin\n\
  return a;\n\
end\n\
routine Add(const a: Float; const b: Float): Float;\n\
begin\n\
  return a;\n\
end\n\
begin\n\
end\n",
        );
        assert!(!program.diagnostics.iter().any(|d| d.code == Code::DuplicateDeclaration));
    }

    #[test]
    fn two_overloads_with_identical_parameter_types_is_an_invalid_overload() {
        let (program, _) = fixtures::build(
            "module exe Main;\n\
routine Add(const a: Integer; const b: Integer): Integer;\n\
begin\n\
  return a;\n\
end\n\
routine Add(const a: Integer; const b: Integer): Integer;\n\
begin\n\
  return a;\n\
end\n\
begin\n\
end\n",
        );
        let bad: Vec<_> = program
            .diagnostics
            .iter()
            .filter(|d| d.code == Code::InvalidOverload)
            .collect();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].position.line, 6);
    }
}
