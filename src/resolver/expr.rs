//! Pass 2d: body walking.
//!
//! Every routine, test and the module's entry body is walked with a scope
//! stack: module scope (top-level symbols, reached through
//! [`crate::symbols::SymbolTable::find_in_module`]) at the bottom, a
//! routine/test scope holding its receiver, parameters and locals above
//! that, and one nested [`Scope`] per block (so a `for` loop variable is
//! visible only in its own body). Method calls, qualified
//! module calls and free-routine calls all fall back to the same overload
//! selection: filter by arity, then by exact parameter-type match where
//! both sides are resolvable, diagnosing E111 only when more than one
//! candidate remains fully concrete.

use crate::ast::{Block, CaseValue, Expr, Module, Name, Routine, Stmt, TestDecl, UnOp};
use crate::diagnostic::{Code, Diagnostic};
use crate::lexer::Position;
use crate::symbols::{Symbol, SymbolKind, BUILTIN_MODULE};

use super::{literal_type_of, module_key, Resolver, Scope};

impl<'p> Resolver<'p> {
    pub(super) fn walk_module_bodies(&mut self, module: &Module) {
        let mkey = module_key(module);

        for (i, r) in module.routines.iter().enumerate() {
            self.walk_routine_body(module, &mkey, i, r);
        }
        for (i, t) in module.tests.iter().enumerate() {
            self.walk_test_body(module, &mkey, i, t);
        }
        if let Some(body) = module.entry_body.clone() {
            let mut scopes: Vec<Scope> = vec![Scope::new()];
            self.walk_block(module, None, &mut scopes, &body);
        }
    }

    fn walk_routine_body(&mut self, module: &Module, mkey: &str, index: usize, r: &Routine) {
        let routine_id = self.routine_ids[&(mkey.to_string(), index)];
        let receiver_type = self
            .table
            .routines
            .get(&routine_id)
            .and_then(|info| info.receiver_type);

        let mut scope = Scope::new();
        for (j, p) in r.params.iter().enumerate() {
            if let Some(&id) = self.param_ids.get(&(mkey.to_string(), index, j)) {
                scope.insert(p.name.text.to_ascii_lowercase(), id);
            }
        }
        self.seed_locals_into_scope(module, &r.local_consts, &r.local_vars, &mut scope);

        let mut scopes = vec![scope];
        if let Some(body) = &r.body {
            self.walk_block(module, receiver_type, &mut scopes, body);
        }
    }

    fn walk_test_body(&mut self, module: &Module, _mkey: &str, _index: usize, test: &TestDecl) {
        let mut scopes: Vec<Scope> = vec![Scope::new()];
        self.walk_block(module, None, &mut scopes, &test.body);
    }

    /// Inserts a routine's local consts and vars as scoped symbols — unlike
    /// top-level declarations these are not seeded in pass 1, since their
    /// visibility never reaches beyond the owning routine.
    fn seed_locals_into_scope(
        &mut self,
        module: &Module,
        local_consts: &[crate::ast::ConstDecl],
        local_vars: &[crate::ast::VarDecl],
        scope: &mut Scope,
    ) {
        for c in local_consts {
            let type_ref = literal_type_of(&c.value, &self.table);
            let id = self.table.insert(Symbol {
                id: 0,
                name: c.name.text.clone(),
                kind: SymbolKind::Const,
                module: module.name.text.clone(),
                file: Some(module.file.clone()),
                position: Some(c.position),
                exported: false,
                builtin: false,
                type_ref,
            });
            self.record_use(&module.file, c.name.position, id);
            scope.insert(c.name.text.to_ascii_lowercase(), id);
        }

        for v in local_vars {
            let id = self.table.insert(Symbol {
                id: 0,
                name: v.name.text.clone(),
                kind: SymbolKind::Var,
                module: module.name.text.clone(),
                file: Some(module.file.clone()),
                position: Some(v.position),
                exported: false,
                builtin: false,
                type_ref: None,
            });
            self.record_use(&module.file, v.name.position, id);
            scope.insert(v.name.text.to_ascii_lowercase(), id);

            let resolved = if let Some(type_ref) = &v.type_ref {
                self.link_type_expr(&module.file, &module.name.text, type_ref)
            } else if let Some(init) = &v.init {
                self.walk_expr(module, None, &mut vec![scope.clone()], init)
                    .or_else(|| literal_type_of(init, &self.table))
            } else {
                None
            };
            self.table.get_mut(id).type_ref = resolved;
        }
    }

    fn walk_block(
        &mut self,
        module: &Module,
        receiver_type: Option<usize>,
        scopes: &mut Vec<Scope>,
        block: &Block,
    ) {
        scopes.push(Scope::new());
        for stmt in &block.statements {
            self.walk_stmt(module, receiver_type, scopes, stmt);
        }
        scopes.pop();
    }

    fn walk_stmt(
        &mut self,
        module: &Module,
        receiver_type: Option<usize>,
        scopes: &mut Vec<Scope>,
        stmt: &Stmt,
    ) {
        match stmt {
            Stmt::Block(b) => self.walk_block(module, receiver_type, scopes, b),
            Stmt::Assignment { target, value, .. } => {
                self.walk_expr(module, receiver_type, scopes, target);
                self.walk_expr(module, receiver_type, scopes, value);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.walk_expr(module, receiver_type, scopes, condition);
                self.walk_block(module, receiver_type, scopes, then_branch);
                if let Some(b) = else_branch {
                    self.walk_block(module, receiver_type, scopes, b);
                }
            }
            Stmt::While { condition, body, .. } => {
                self.walk_expr(module, receiver_type, scopes, condition);
                self.walk_block(module, receiver_type, scopes, body);
            }
            Stmt::For {
                loop_var,
                start,
                end,
                body,
                ..
            } => {
                self.walk_expr(module, receiver_type, scopes, start);
                self.walk_expr(module, receiver_type, scopes, end);
                let int_ty = self.table.find_in_module(BUILTIN_MODULE, "integer");
                let id = self.table.insert(Symbol {
                    id: 0,
                    name: loop_var.text.clone(),
                    kind: SymbolKind::Var,
                    module: module.name.text.clone(),
                    file: Some(module.file.clone()),
                    position: Some(loop_var.position),
                    exported: false,
                    builtin: false,
                    type_ref: int_ty,
                });
                self.record_use(&module.file, loop_var.position, id);
                let mut loop_scope = Scope::new();
                loop_scope.insert(loop_var.text.to_ascii_lowercase(), id);
                scopes.push(loop_scope);
                self.walk_block(module, receiver_type, scopes, body);
                scopes.pop();
            }
            Stmt::Repeat { body, condition, .. } => {
                self.walk_block(module, receiver_type, scopes, body);
                self.walk_expr(module, receiver_type, scopes, condition);
            }
            Stmt::Case {
                subject,
                branches,
                else_branch,
                ..
            } => {
                self.walk_expr(module, receiver_type, scopes, subject);
                for branch in branches {
                    for value in &branch.values {
                        match value {
                            CaseValue::Const(e) => {
                                self.walk_expr(module, receiver_type, scopes, e);
                            }
                            CaseValue::Range(lo, hi) => {
                                self.walk_expr(module, receiver_type, scopes, lo);
                                self.walk_expr(module, receiver_type, scopes, hi);
                            }
                        }
                    }
                    self.walk_block(module, receiver_type, scopes, &branch.body);
                }
                if let Some(b) = else_branch {
                    self.walk_block(module, receiver_type, scopes, b);
                }
            }
            Stmt::Try {
                body,
                except,
                finally,
                ..
            } => {
                self.walk_block(module, receiver_type, scopes, body);
                if let Some(b) = except {
                    self.walk_block(module, receiver_type, scopes, b);
                }
                if let Some(b) = finally {
                    self.walk_block(module, receiver_type, scopes, b);
                }
            }
            Stmt::Return { value, .. } => {
                if let Some(e) = value {
                    self.walk_expr(module, receiver_type, scopes, e);
                }
            }
            Stmt::New {
                target,
                as_type,
                ..
            } => {
                let target_ty = self.walk_expr(module, receiver_type, scopes, target);
                if let Some(type_name) = as_type {
                    match self.resolve_type_name(&module.name.text, &type_name.text) {
                        Some(id) => {
                            self.record_use(&module.file, type_name.position, id);
                            self.check_new_target_ancestor(module, target_ty, id, type_name);
                        }
                        None => self.diagnostics.push(Diagnostic::new(
                            Code::UnknownIdentifier,
                            module.file.as_str(),
                            type_name.position,
                            format!("unknown type '{}'", type_name.text),
                        )),
                    }
                }
            }
            Stmt::Dispose { target, .. } => {
                self.walk_expr(module, receiver_type, scopes, target);
            }
            Stmt::SetLength { target, length, .. } => {
                self.walk_expr(module, receiver_type, scopes, target);
                self.walk_expr(module, receiver_type, scopes, length);
            }
            Stmt::Expr(e) => {
                self.walk_expr(module, receiver_type, scopes, e);
            }
        }
    }

    /// Walks `expr`, recording every identifier/field/cast/call use, and
    /// returns a best-effort type symbol for it. The core never needs full
    /// type inference — this is only precise enough to
    /// drive method binding and overload selection; compound shapes
    /// (array/set/pointer indexing and dereference) have no single defining
    /// symbol and resolve to `None`, matching [`crate::ast::TypeExpr::as_named`].
    fn walk_expr(
        &mut self,
        module: &Module,
        receiver_type: Option<usize>,
        scopes: &mut Vec<Scope>,
        expr: &Expr,
    ) -> Option<usize> {
        match expr {
            Expr::Ident(name) => self.resolve_ident_expr(module, scopes, name),
            Expr::IntLiteral { .. } => self.table.find_in_module(BUILTIN_MODULE, "integer"),
            Expr::FloatLiteral { .. } => self.table.find_in_module(BUILTIN_MODULE, "float"),
            Expr::StringLiteral { .. } => self.table.find_in_module(BUILTIN_MODULE, "string"),
            Expr::CharLiteral { .. } => self.table.find_in_module(BUILTIN_MODULE, "char"),
            Expr::BoolLiteral { .. } => self.table.find_in_module(BUILTIN_MODULE, "boolean"),
            Expr::NilLiteral { .. } => self.table.find_in_module(BUILTIN_MODULE, "pointer"),
            Expr::Binary { op, lhs, rhs, .. } => {
                let lt = self.walk_expr(module, receiver_type, scopes, lhs);
                let rt = self.walk_expr(module, receiver_type, scopes, rhs);
                use crate::ast::BinOp::*;
                match op {
                    Eq | NotEq | Lt | LtEq | Gt | GtEq | And | Or => {
                        self.table.find_in_module(BUILTIN_MODULE, "boolean")
                    }
                    _ => lt.or(rt),
                }
            }
            Expr::Unary { op, operand, .. } => {
                let t = self.walk_expr(module, receiver_type, scopes, operand);
                match op {
                    UnOp::Not => self.table.find_in_module(BUILTIN_MODULE, "boolean"),
                    UnOp::Neg => t,
                }
            }
            Expr::Call {
                callee,
                args,
                position,
            } => self.walk_call(module, receiver_type, scopes, callee, args, *position),
            Expr::FieldAccess { target, field, .. } => {
                self.walk_field_access(module, receiver_type, scopes, target, field)
            }
            Expr::Index { target, index, .. } => {
                self.walk_expr(module, receiver_type, scopes, target);
                self.walk_expr(module, receiver_type, scopes, index);
                None
            }
            Expr::Deref { target, .. } => {
                self.walk_expr(module, receiver_type, scopes, target);
                None
            }
            Expr::Range { start, end, .. } => {
                self.walk_expr(module, receiver_type, scopes, start);
                self.walk_expr(module, receiver_type, scopes, end)
            }
            Expr::SetLiteral { elements, .. } => {
                for e in elements {
                    self.walk_expr(module, receiver_type, scopes, e);
                }
                self.table.find_in_module(BUILTIN_MODULE, "set")
            }
            Expr::Cast {
                target, type_name, ..
            } => {
                let target_ty = self.walk_expr(module, receiver_type, scopes, target);
                self.resolve_cast_type(module, target_ty, type_name)
            }
            Expr::TypeTest {
                target, type_name, ..
            } => {
                let target_ty = self.walk_expr(module, receiver_type, scopes, target);
                self.resolve_cast_type(module, target_ty, type_name);
                self.table.find_in_module(BUILTIN_MODULE, "boolean")
            }
            Expr::Inherited {
                method,
                args,
                position,
            } => self.walk_inherited(module, receiver_type, scopes, method, args, *position),
        }
    }

    fn lookup_scopes(&self, scopes: &[Scope], name: &str) -> Option<usize> {
        let key = name.to_ascii_lowercase();
        scopes.iter().rev().find_map(|s| s.get(&key).copied())
    }

    /// The [`crate::symbols::Symbol`] for a loaded module itself, found by
    /// its own name among its top-level members (the module symbol is
    /// seeded as a member of itself — see `seed_module`).
    fn module_symbol_id(&self, name: &str) -> Option<usize> {
        let key = name.to_ascii_lowercase();
        if !self.program.modules.contains_key(&key) {
            return None;
        }
        self.table
            .members_of(&key)
            .iter()
            .copied()
            .find(|&id| self.table.get(id).kind == SymbolKind::Module)
    }

    fn resolve_ident_expr(&mut self, module: &Module, scopes: &[Scope], name: &Name) -> Option<usize> {
        if let Some(id) = self.lookup_scopes(scopes, &name.text) {
            self.record_use(&module.file, name.position, id);
            return self.table.get(id).type_ref;
        }
        if let Some(id) = self.table.find_in_module(&module.name.text, &name.text) {
            self.record_use(&module.file, name.position, id);
            return self.table.get(id).type_ref;
        }
        if let Some(id) = self.module_symbol_id(&name.text) {
            self.record_use(&module.file, name.position, id);
            return None;
        }
        if crate::symbols::is_reserved_identifier(&name.text) {
            return self.reserved_identifier_type(&name.text);
        }
        self.diagnostics.push(Diagnostic::new(
            Code::UnknownIdentifier,
            module.file.as_str(),
            name.position,
            format!("unknown identifier '{}'", name.text),
        ));
        None
    }

    /// The built-in return type of a reserved keyword-like call, where one
    /// is known at a call site rather than a bare reference: `ParamCount`
    /// (no arguments) is `Integer`, `ParamStr` (an index argument) is
    /// `String`. Every other reserved name has no fixed type here.
    fn reserved_identifier_type(&self, name: &str) -> Option<usize> {
        if name.eq_ignore_ascii_case("paramcount") {
            self.table.find_in_module(BUILTIN_MODULE, "integer")
        } else if name.eq_ignore_ascii_case("paramstr") {
            self.table.find_in_module(BUILTIN_MODULE, "string")
        } else {
            None
        }
    }

    fn resolve_cast_type(
        &mut self,
        module: &Module,
        target_ty: Option<usize>,
        type_name: &Name,
    ) -> Option<usize> {
        let Some(resolved) = self.resolve_type_name(&module.name.text, &type_name.text) else {
            self.diagnostics.push(Diagnostic::new(
                Code::UnknownIdentifier,
                module.file.as_str(),
                type_name.position,
                format!("unknown type '{}'", type_name.text),
            ));
            return None;
        };
        self.record_use(&module.file, type_name.position, resolved);

        if let Some(target_id) = target_ty {
            let both_records =
                self.table.types.contains_key(&target_id) && self.table.types.contains_key(&resolved);
            if both_records {
                let from_chain = self.ancestor_chain(target_id);
                let to_chain = self.ancestor_chain(resolved);
                if !from_chain.contains(&resolved) && !to_chain.contains(&target_id) {
                    self.diagnostics.push(Diagnostic::new(
                        Code::MisuseOfCast,
                        module.file.as_str(),
                        type_name.position,
                        format!(
                            "'{}' is neither an ancestor nor a descendant of the cast's operand type",
                            type_name.text
                        ),
                    ));
                }
            }
        }
        Some(resolved)
    }

    /// `NEW(p AS T)` requires `p`'s compile-time type to be an ancestor of
    /// `T` — the allocated cell's runtime type may only be narrowed, not
    /// moved sideways or widened. Unlike [`Self::resolve_cast_type`]'s `AS`/
    /// `IS` check, only this one direction is valid here.
    fn check_new_target_ancestor(
        &mut self,
        module: &Module,
        target_ty: Option<usize>,
        as_type: usize,
        type_name: &Name,
    ) {
        let Some(target_id) = target_ty else { return };
        if !self.table.types.contains_key(&target_id) || !self.table.types.contains_key(&as_type) {
            return;
        }
        if !self.ancestor_chain(as_type).contains(&target_id) {
            self.diagnostics.push(Diagnostic::new(
                Code::MisuseOfCast,
                module.file.as_str(),
                type_name.position,
                format!(
                    "'{}' is not a descendant of the pointer's declared type",
                    type_name.text
                ),
            ));
        }
    }

    fn walk_call(
        &mut self,
        module: &Module,
        receiver_type: Option<usize>,
        scopes: &mut Vec<Scope>,
        callee: &Expr,
        args: &[Expr],
        position: Position,
    ) -> Option<usize> {
        let arg_types: Vec<Option<usize>> = args
            .iter()
            .map(|a| self.walk_expr(module, receiver_type, scopes, a))
            .collect();

        match callee {
            Expr::Ident(name) => self.resolve_free_call(module, scopes, name, &arg_types),
            Expr::FieldAccess { target, field, .. } => {
                self.resolve_dotted_call(module, receiver_type, scopes, target, field, &arg_types)
            }
            other => {
                self.walk_expr(module, receiver_type, scopes, other);
                let _ = position;
                None
            }
        }
    }

    fn resolve_free_call(
        &mut self,
        module: &Module,
        scopes: &[Scope],
        name: &Name,
        arg_types: &[Option<usize>],
    ) -> Option<usize> {
        if let Some(id) = self.lookup_scopes(scopes, &name.text) {
            self.record_use(&module.file, name.position, id);
            return self.table.get(id).type_ref;
        }

        let overloads = self.table.overloads_in_module(&module.name.text, &name.text);
        if overloads.is_empty() {
            if crate::symbols::is_reserved_identifier(&name.text) {
                return self.reserved_identifier_type(&name.text);
            }
            self.diagnostics.push(Diagnostic::new(
                Code::UnknownIdentifier,
                module.file.as_str(),
                name.position,
                format!("unknown routine '{}'", name.text),
            ));
            return None;
        }

        let chosen = self.select_overload(&overloads, arg_types, &module.file, name.position);
        if let Some(id) = chosen {
            self.record_use(&module.file, name.position, id);
            self.table.routines.get(&id).and_then(|info| info.return_type)
        } else {
            None
        }
    }

    fn resolve_dotted_call(
        &mut self,
        module: &Module,
        receiver_type: Option<usize>,
        scopes: &mut Vec<Scope>,
        target: &Expr,
        field: &Name,
        arg_types: &[Option<usize>],
    ) -> Option<usize> {
        if let Expr::Ident(target_name) = target {
            let shadowed = self.lookup_scopes(scopes, &target_name.text).is_some()
                || self
                    .table
                    .find_in_module(&module.name.text, &target_name.text)
                    .is_some();
            if !shadowed {
                if let Some(mod_id) = self.module_symbol_id(&target_name.text) {
                    self.record_use(&module.file, target_name.position, mod_id);
                    let target_module = self.table.get(mod_id).module.clone();
                    let overloads: Vec<usize> = self
                        .table
                        .overloads_in_module(&target_module, &field.text)
                        .into_iter()
                        .filter(|id| self.table.get(*id).exported)
                        .collect();
                    if overloads.is_empty() {
                        self.diagnostics.push(Diagnostic::new(
                            Code::UnknownIdentifier,
                            module.file.as_str(),
                            field.position,
                            format!(
                                "'{}' is not an exported routine of module '{}'",
                                field.text, target_name.text
                            ),
                        ));
                        return None;
                    }
                    let chosen = self.select_overload(&overloads, arg_types, &module.file, field.position);
                    return chosen.and_then(|id| {
                        self.record_use(&module.file, field.position, id);
                        self.table.routines.get(&id).and_then(|info| info.return_type)
                    });
                }
            }
        }

        let target_ty = self.walk_expr(module, receiver_type, scopes, target)?;
        for ancestor in self.ancestor_chain(target_ty) {
            let methods: Vec<usize> = self
                .table
                .types
                .get(&ancestor)
                .map(|ti| ti.methods.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|id| self.table.get(*id).name.eq_ignore_ascii_case(&field.text))
                .collect();
            if methods.is_empty() {
                continue;
            }
            let chosen = self.select_overload(&methods, arg_types, &module.file, field.position);
            return chosen.and_then(|id| {
                self.record_use(&module.file, field.position, id);
                self.table.routines.get(&id).and_then(|info| info.return_type)
            });
        }

        self.diagnostics.push(Diagnostic::new(
            Code::UnknownIdentifier,
            module.file.as_str(),
            field.position,
            format!("no method '{}' on this type", field.text),
        ));
        None
    }

    fn walk_field_access(
        &mut self,
        module: &Module,
        receiver_type: Option<usize>,
        scopes: &mut Vec<Scope>,
        target: &Expr,
        field: &Name,
    ) -> Option<usize> {
        if let Expr::Ident(target_name) = target {
            let shadowed = self.lookup_scopes(scopes, &target_name.text).is_some()
                || self
                    .table
                    .find_in_module(&module.name.text, &target_name.text)
                    .is_some();
            if !shadowed {
                if let Some(mod_id) = self.module_symbol_id(&target_name.text) {
                    self.record_use(&module.file, target_name.position, mod_id);
                    let target_module = self.table.get(mod_id).module.clone();
                    return match self.table.find_in_module(&target_module, &field.text) {
                        Some(id) if self.table.get(id).exported => {
                            self.record_use(&module.file, field.position, id);
                            self.table.get(id).type_ref
                        }
                        _ => {
                            self.diagnostics.push(Diagnostic::new(
                                Code::UnknownIdentifier,
                                module.file.as_str(),
                                field.position,
                                format!(
                                    "'{}' is not an exported member of module '{}'",
                                    field.text, target_name.text
                                ),
                            ));
                            None
                        }
                    };
                }
            }
        }

        let target_ty = self.walk_expr(module, receiver_type, scopes, target)?;
        for ancestor in self.ancestor_chain(target_ty) {
            if let Some(ti) = self.table.types.get(&ancestor) {
                if let Some(fid) = ti
                    .fields
                    .iter()
                    .copied()
                    .find(|id| self.table.get(*id).name.eq_ignore_ascii_case(&field.text))
                {
                    self.record_use(&module.file, field.position, fid);
                    return self.table.get(fid).type_ref;
                }
            }
        }

        self.diagnostics.push(Diagnostic::new(
            Code::UnknownIdentifier,
            module.file.as_str(),
            field.position,
            format!("no field '{}' on this type", field.text),
        ));
        None
    }

    fn walk_inherited(
        &mut self,
        module: &Module,
        receiver_type: Option<usize>,
        scopes: &mut Vec<Scope>,
        method: &Name,
        args: &[Expr],
        _position: Position,
    ) -> Option<usize> {
        let arg_types: Vec<Option<usize>> = args
            .iter()
            .map(|a| self.walk_expr(module, receiver_type, scopes, a))
            .collect();

        let Some(recv) = receiver_type else {
            self.diagnostics.push(Diagnostic::new(
                Code::UnknownIdentifier,
                module.file.as_str(),
                method.position,
                "'inherited' used outside a method",
            ));
            return None;
        };
        let Some(base) = self.table.types.get(&recv).and_then(|t| t.base) else {
            self.diagnostics.push(Diagnostic::new(
                Code::UnknownIdentifier,
                module.file.as_str(),
                method.position,
                "receiver type has no parent to inherit from",
            ));
            return None;
        };

        for ancestor in self.ancestor_chain(base) {
            let methods: Vec<usize> = self
                .table
                .types
                .get(&ancestor)
                .map(|ti| ti.methods.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|id| self.table.get(*id).name.eq_ignore_ascii_case(&method.text))
                .collect();
            if methods.is_empty() {
                continue;
            }
            let chosen = self.select_overload(&methods, &arg_types, &module.file, method.position);
            return chosen.and_then(|id| {
                self.record_use(&module.file, method.position, id);
                self.table.routines.get(&id).and_then(|info| info.return_type)
            });
        }

        self.diagnostics.push(Diagnostic::new(
            Code::UnknownIdentifier,
            module.file.as_str(),
            method.position,
            format!("no inherited method '{}'", method.text),
        ));
        None
    }

    /// Picks one member of an overload group for a call site: filter by
    /// arity (a variadic member always matches), then by exact
    /// parameter-type match wherever both the declared parameter and the
    /// supplied argument's inferred type are known. Diagnoses E111 only
    /// when more than one candidate remains after both filters and every
    /// comparison that ruled a candidate in was concrete — overload groups
    /// are guaranteed to differ in signature, so a tie here
    /// means the argument types genuinely left the call ambiguous.
    fn select_overload(
        &mut self,
        candidates: &[usize],
        arg_types: &[Option<usize>],
        file: &str,
        position: Position,
    ) -> Option<usize> {
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }

        let arity_pool: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|id| {
                let info = self.table.routines.get(id);
                info.map(|i| i.variadic || i.params.len() == arg_types.len())
                    .unwrap_or(false)
            })
            .collect();
        let pool = if arity_pool.is_empty() {
            candidates.to_vec()
        } else {
            arity_pool
        };

        let mut exact = Vec::new();
        for &id in &pool {
            let Some(info) = self.table.routines.get(&id) else { continue };
            if info.variadic {
                exact.push(id);
                continue;
            }
            let matches = info.params.iter().zip(arg_types.iter()).all(|(p, a)| {
                match (self.table.get(*p).type_ref, a) {
                    (Some(pt), Some(at)) => pt == *at,
                    _ => true,
                }
            });
            if matches {
                exact.push(id);
            }
        }

        match exact.len() {
            0 => pool.first().copied(),
            1 => Some(exact[0]),
            _ => {
                self.diagnostics.push(Diagnostic::new(
                    Code::AmbiguousCall,
                    file,
                    position,
                    "call matches more than one overload",
                ));
                exact.first().copied()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::Position;
    use crate::query::navigation::go_to_definition;
    use crate::query::support::fixtures;

    const SOURCE: &str = "module exe Main;\n\
routine Add(const a: Integer; const b: Integer): Integer;\n\
begin\n\
  return a;\n\
end\n\
routine Add(const a: Float; const b: Float): Float;\n\
begin\n\
  return a;\n\
end\n\
begin\n\
  Add(1, 2);\n\
end\n";

    #[test]
    fn call_with_integer_arguments_picks_the_integer_overload() {
        let (program, main) = fixtures::build(SOURCE);
        // Column of "Add" on `  Add(1, 2);`.
        let call_site = Position::new(11, 3);
        let def = go_to_definition(&program, &main, call_site).expect("resolves");
        assert_eq!(def.range.start.line, 2, "picks the Integer overload, not the Float one");
    }

    #[test]
    fn command_argument_accessors_resolve_without_a_diagnostic() {
        let source = "module exe Main;\n\
var n: Integer;\n\
var a: String;\n\
begin\n\
  n := ParamCount();\n\
  a := ParamStr(1);\n\
end\n";
        let (program, _main) = fixtures::build(source);
        assert!(
            program.diagnostics.iter().all(|d| d.code != crate::diagnostic::Code::UnknownIdentifier),
            "ParamCount/ParamStr must not raise E103: {:?}",
            program.diagnostics
        );
    }

    #[test]
    fn new_as_an_unrelated_type_raises_misuse_of_cast() {
        let source = "module exe Main;\n\
type TShape = record X: Integer; end;\n\
type TOther = record Y: Integer; end;\n\
var p: TShape;\n\
begin\n\
  new(p as TOther);\n\
end\n";
        let (program, _main) = fixtures::build(source);
        assert!(
            program
                .diagnostics
                .iter()
                .any(|d| d.code == crate::diagnostic::Code::MisuseOfCast),
            "unrelated NEW(p AS T) target must raise E110: {:?}",
            program.diagnostics
        );
    }

    #[test]
    fn an_overload_whose_arity_does_not_match_is_not_selected() {
        let source = "module exe Main;\n\
routine F(const a: Integer): Integer;\n\
begin\n\
  return a;\n\
end\n\
routine F(const a: Integer; const b: Integer): Integer;\n\
begin\n\
  return a;\n\
end\n\
begin\n\
  F(1, 2);\n\
end\n";
        let (program, main) = fixtures::build(source);
        let call_site = Position::new(11, 3);
        let def = go_to_definition(&program, &main, call_site).expect("resolves");
        assert_eq!(def.range.start.line, 6, "two-argument call picks the two-parameter overload");
    }
}
