//! The symbol model.
//!
//! Symbols live in a single flat arena per rebuild; every symbol is
//! addressed by a stable [`SymbolId`] for that rebuild's lifetime. Kind-specific data (a type's fields/methods/base, a
//! routine's parameters/return/receiver/overload-group) is held in side
//! tables keyed by `SymbolId` rather than as enum payload, so the resolver
//! can fill it in incrementally across its two passes without replacing the
//! whole symbol.

use std::collections::HashMap;

use crate::lexer::Position;

pub type SymbolId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Module,
    Routine,
    Type,
    Var,
    Const,
    Field,
    Param,
}

/// A declared (or built-in) entity. Built-ins have `file = None, position =
/// None` per invariant 5 — queries must treat that as "no source location".
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub module: String,
    pub file: Option<String>,
    pub position: Option<Position>,
    pub exported: bool,
    pub builtin: bool,
    /// Resolved type reference, for var/const/field/param symbols. Left
    /// `None` until pass 2 links it.
    pub type_ref: Option<SymbolId>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    pub fields: Vec<SymbolId>,
    pub methods: Vec<SymbolId>,
    pub base: Option<SymbolId>,
}

#[derive(Debug, Clone, Default)]
pub struct RoutineInfo {
    pub params: Vec<SymbolId>,
    pub return_type: Option<SymbolId>,
    pub receiver_type: Option<SymbolId>,
    /// Case-insensitive (module, name) identity shared by every member of
    /// an overload group.
    pub overload_group: String,
    pub variadic: bool,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    pub types: HashMap<SymbolId, TypeInfo>,
    pub routines: HashMap<SymbolId, RoutineInfo>,
    /// Top-level symbols declared directly in a module, keyed by
    /// case-insensitive module name, in source order.
    module_members: HashMap<String, Vec<SymbolId>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a symbol without registering it as a module top-level member
    /// — used for params, fields, local consts/vars, and loop variables,
    /// whose visibility is scoped rather than module-wide.
    pub fn insert(&mut self, mut symbol: Symbol) -> SymbolId {
        let id = self.symbols.len();
        symbol.id = id;
        self.symbols.push(symbol);
        id
    }

    /// Inserts a symbol and registers it in its owning module's top-level
    /// member list, in insertion order.
    pub fn insert_top_level(&mut self, symbol: Symbol) -> SymbolId {
        let module_key = symbol.module.to_ascii_lowercase();
        let id = self.insert(symbol);
        self.module_members.entry(module_key).or_default().push(id);
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Top-level members of a module, in declaration order, including every
    /// kind (routines appear once per overload).
    pub fn members_of(&self, module_name: &str) -> &[SymbolId] {
        self.module_members
            .get(&module_name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Finds the first top-level member of `module_name` matching `name`
    /// case-insensitively. For overload groups this returns the first
    /// declared overload; callers that need every overload should filter
    /// `members_of` themselves.
    pub fn find_in_module(&self, module_name: &str, name: &str) -> Option<SymbolId> {
        self.members_of(module_name)
            .iter()
            .copied()
            .find(|id| self.symbols[*id].name.eq_ignore_ascii_case(name))
    }

    /// Every overload sharing `name` (case-insensitive) among `module_name`'s
    /// routines, in source order.
    pub fn overloads_in_module(&self, module_name: &str, name: &str) -> Vec<SymbolId> {
        self.members_of(module_name)
            .iter()
            .copied()
            .filter(|id| {
                let sym = &self.symbols[*id];
                sym.kind == SymbolKind::Routine && sym.name.eq_ignore_ascii_case(name)
            })
            .collect()
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.module_members.keys().map(String::as_str)
    }
}

/// Reserved identifiers that resolve without a declaration: literals,
/// built-in call forms, and the command-argument accessors (`ParamCount`,
/// `ParamStr`). Kept separate from
/// [`SymbolTable`] because they carry no symbol id — callers check this set
/// before falling back to "unknown identifier".
pub fn is_reserved_identifier(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "nil", "true", "false", "new", "dispose", "setlength", "len", "self", "paramcount",
        "paramstr",
    ];
    RESERVED.iter().any(|r| name.eq_ignore_ascii_case(r))
}

/// The built-in type names installed into the synthetic built-in module
/// before pass 1. Two character variants are kept
/// distinct (`char` and `widechar`) matching the glossary's "two character
/// variants".
pub const BUILTIN_MODULE: &str = "@builtin";

pub const BUILTIN_TYPES: &[&str] = &[
    "integer", "unsignedinteger", "float", "boolean", "char", "widechar", "pointer", "string",
    "set",
];
