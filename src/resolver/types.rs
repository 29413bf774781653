//! Type reference linking.

use std::collections::HashSet;

use crate::ast::{Module, TypeExpr};
use crate::diagnostic::{Code, Diagnostic};
use crate::loader::LoadedProgram;
use crate::symbols::{SymbolKind, SymbolTable, BUILTIN_MODULE};

use super::{literal_type_of, Resolver};

impl<'p> Resolver<'p> {
    /// Resolves a bare type name visible from `from_module`: first the
    /// module's own types, then exported types of imported modules, then
    /// built-ins.
    pub(super) fn resolve_type_name(&self, from_module: &str, name: &str) -> Option<usize> {
        if let Some(id) = self.table.find_in_module(from_module, name) {
            if self.table.get(id).kind == SymbolKind::Type {
                return Some(id);
            }
        }

        if let Some(module) = self.program.modules.get(&from_module.to_ascii_lowercase()) {
            for import in &module.imports {
                if let Some(id) = self.table.find_in_module(&import.path.text, name) {
                    let sym = self.table.get(id);
                    if sym.kind == SymbolKind::Type && sym.exported {
                        return Some(id);
                    }
                }
            }
        }

        self.table
            .find_in_module(BUILTIN_MODULE, name)
            .filter(|id| self.table.get(*id).kind == SymbolKind::Type)
    }

    /// Recursively links every named type appearing inside `type_expr`,
    /// recording a use at each [`crate::ast::Name`]'s own position and diagnosing unknown names. Returns the type symbol for the
    /// expression when it boils down to a single name; compound shapes
    /// (array/set/pointer/routine) have no single defining symbol.
    pub(super) fn link_type_expr(
        &mut self,
        file: &str,
        module: &str,
        type_expr: &TypeExpr,
    ) -> Option<usize> {
        match type_expr {
            TypeExpr::Named(name) => match self.resolve_type_name(module, &name.text) {
                Some(id) => {
                    self.record_use(file, name.position, id);
                    Some(id)
                }
                None => {
                    self.diagnostics.push(Diagnostic::new(
                        Code::UnknownIdentifier,
                        file,
                        name.position,
                        format!("unknown type '{}'", name.text),
                    ));
                    None
                }
            },
            TypeExpr::StaticArray { element, .. } | TypeExpr::DynamicArray { element, .. } => {
                self.link_type_expr(file, module, element);
                None
            }
            TypeExpr::Set { element, .. } => {
                self.link_type_expr(file, module, element);
                None
            }
            TypeExpr::Pointer { target, .. } => {
                self.link_type_expr(file, module, target);
                None
            }
            TypeExpr::Routine {
                params,
                return_type,
                ..
            } => {
                for p in params {
                    self.link_type_expr(file, module, p);
                }
                if let Some(r) = return_type {
                    self.link_type_expr(file, module, r);
                }
                None
            }
        }
    }

    /// Walks `id`'s base-type chain looking for `id` itself; used both to
    /// detect a would-be cycle before assigning a base and to collect the
    /// base-inclusive member search order.
    pub(super) fn ancestor_chain(&self, id: usize) -> Vec<usize> {
        let mut chain = vec![id];
        let mut seen: HashSet<usize> = HashSet::from([id]);
        let mut current = id;
        while let Some(base) = self.table.types.get(&current).and_then(|t| t.base) {
            if !seen.insert(base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Links every type reference declared in `module`: record parent
    /// links, field types, parameter and return types, and var/const
    /// explicit types.
    pub(super) fn link_module_types(&mut self, module: &Module) {
        let mkey = module.name.text.to_ascii_lowercase();
        let file = module.file.clone();

        for (i, t) in module.types.iter().enumerate() {
            let type_id = self.type_ids[&(mkey.clone(), i)];
            if let crate::ast::TypeBody::Record(record) = &t.body {
                if let Some(parent) = &record.parent {
                    match self.resolve_type_name(&module.name.text, &parent.text) {
                        Some(base_id) => {
                            self.record_use(&file, parent.position, base_id);
                            self.table.types.get_mut(&type_id).unwrap().base = Some(base_id);
                        }
                        None => {
                            self.diagnostics.push(Diagnostic::new(
                                Code::UnknownIdentifier,
                                &file,
                                parent.position,
                                format!("unknown parent type '{}'", parent.text),
                            ));
                        }
                    }
                }
                for (j, f) in record.fields.iter().enumerate() {
                    let field_id = self.field_ids[&(mkey.clone(), i, j)];
                    let resolved = self.link_type_expr(&file, &module.name.text, &f.type_ref);
                    self.table.get_mut(field_id).type_ref = resolved;
                }
            }
        }

        for (i, c) in module.consts.iter().enumerate() {
            let _ = (i, c); // consts carry no explicit type annotation; see literal_type_of.
        }

        for (i, v) in module.vars.iter().enumerate() {
            let var_id = self.var_ids[&(mkey.clone(), i)];
            if let Some(type_ref) = &v.type_ref {
                let resolved = self.link_type_expr(&file, &module.name.text, type_ref);
                self.table.get_mut(var_id).type_ref = resolved;
            } else if let Some(init) = &v.init {
                self.table.get_mut(var_id).type_ref = literal_type_of(init, &self.table);
            }
        }

        for (i, r) in module.routines.iter().enumerate() {
            let routine_id = self.routine_ids[&(mkey.clone(), i)];
            for (j, p) in r.params.iter().enumerate() {
                let param_id = self.param_ids[&(mkey.clone(), i, j)];
                let resolved = self.link_type_expr(&file, &module.name.text, &p.type_ref);
                self.table.get_mut(param_id).type_ref = resolved;
            }
            if let Some(return_type) = &r.return_type {
                let resolved = self.link_type_expr(&file, &module.name.text, return_type);
                self.table.routines.get_mut(&routine_id).unwrap().return_type = resolved;
            }
        }
    }

    /// Breaks any inheritance cycle by clearing the offending base link and
    /// diagnosing it.
    pub(super) fn break_inheritance_cycles(&mut self) {
        let type_ids: Vec<usize> = self.table.types.keys().copied().collect();
        for id in type_ids {
            let mut seen = HashSet::new();
            let mut current = id;
            seen.insert(current);
            let mut cyclic = false;
            while let Some(base) = self.table.types.get(&current).and_then(|t| t.base) {
                if !seen.insert(base) {
                    cyclic = true;
                    break;
                }
                current = base;
            }
            if cyclic {
                let sym = self.table.get(id).clone();
                self.diagnostics.push(Diagnostic::new(
                    Code::InheritanceCycle,
                    sym.file.unwrap_or_default(),
                    sym.position.unwrap_or_default(),
                    format!("'{}' inherits from itself through its parent chain", sym.name),
                ));
                self.table.types.get_mut(&id).unwrap().base = None;
            }
        }
    }

    /// Binds every routine whose first parameter is a by-reference `Self`
    /// receiver as a method of that parameter's type.
    pub(super) fn bind_methods(&mut self, module: &Module) {
        let mkey = module.name.text.to_ascii_lowercase();
        for (i, r) in module.routines.iter().enumerate() {
            let Some(first) = r.params.first() else { continue };
            if first.mode != crate::ast::ParamMode::ByRef || !first.name.eq_ignore_case("self") {
                continue;
            }
            let routine_id = self.routine_ids[&(mkey.clone(), i)];
            let param_id = self.param_ids[&(mkey.clone(), i, 0)];
            let Some(receiver_type) = self.table.get(param_id).type_ref else {
                continue;
            };

            {
                let info = self.table.routines.get_mut(&routine_id).unwrap();
                info.receiver_type = Some(receiver_type);
                if !info.params.is_empty() {
                    info.params.remove(0);
                }
                let type_name = self
                    .table
                    .types
                    .get(&receiver_type)
                    .map(|_| self.table.get(receiver_type).name.to_ascii_lowercase())
                    .unwrap_or_default();
                info.overload_group = format!("method::{type_name}::{}", r.name.text.to_ascii_lowercase());
            }

            if let Some(type_info) = self.table.types.get_mut(&receiver_type) {
                type_info.methods.push(routine_id);
            }
        }
    }
}

pub(super) fn register_builtins(table: &mut SymbolTable) {
    for name in crate::symbols::BUILTIN_TYPES {
        table.insert_top_level(crate::symbols::Symbol {
            id: 0,
            name: (*name).to_string(),
            kind: SymbolKind::Type,
            module: BUILTIN_MODULE.to_string(),
            file: None,
            position: None,
            exported: true,
            builtin: true,
            type_ref: None,
        });
    }
}

/// Stable, deterministic iteration order over a loaded program's modules —
/// the resolver's output (method lists, diagnostics order) must not depend
/// on `HashMap` iteration order.
pub(super) fn sorted_module_keys(program: &LoadedProgram) -> Vec<String> {
    let mut keys: Vec<String> = program.modules.keys().cloned().collect();
    keys.sort();
    keys
}
