//! Declaration elaboration.
//!
//! [`Elaborator`] owns the module while it is being checked. Each pass is an
//! `impl Elaborator` block in a child module; passes call into each other
//! freely and rely on the per-declaration [`crate::state`] flags for
//! termination.

mod access;
mod access_check;
mod accessors;
mod attributes;
mod bindings;
mod circularity;
mod conformance;
mod decl_checker;
mod generics;
mod implicit_init;
mod inheritance;
mod lazy;
mod overrides;
mod raw_values;
mod redecl;
mod resolve;
mod subtype;
mod validate;

#[cfg(test)]
mod accessors_tests;
#[cfg(test)]
mod attributes_tests;
#[cfg(test)]
mod bindings_tests;
#[cfg(test)]
mod generics_tests;
#[cfg(test)]
mod inheritance_tests;
#[cfg(test)]
mod overrides_tests;
#[cfg(test)]
mod redecl_tests;
#[cfg(test)]
mod sema_tests;
#[cfg(test)]
mod validate_tests;

use std::collections::HashMap;

use kestrel_core::Symbol;

pub use inheritance::InheritanceError;
pub(crate) use resolve::ResolveMode;

use crate::ast::{Accessibility, Ast, DeclContext, DeclId, DeclKind, Span};
use crate::collab::{ArchetypeBuilderFactory, ExprChecker, ExprContext, ExprError, NameLookup};
use crate::config::SemaConfig;
use crate::diagnostics::{DiagnosticBuilder, DiagnosticKind, Diagnostics};
use crate::prelude::KnownDecls;
use crate::types::{TYPE_ERROR, TypeContext, TypeId};
use crate::{Error, PassResult};

/// Checker state for one module.
pub struct Elaborator {
    ast: Ast,
    types: TypeContext,
    diag: Diagnostics,
    config: SemaConfig,
    known: KnownDecls,
    lookup: Box<dyn NameLookup>,
    exprs: Box<dyn ExprChecker>,
    archetypes: Box<dyn ArchetypeBuilderFactory>,
    /// Minimum accessibility of a canonical type.
    access_cache: HashMap<TypeId, Accessibility>,
    /// Interface type of a generic parameter or associated type -> its archetype.
    contextual: HashMap<TypeId, TypeId>,
    /// Declarations on the current inheritance DFS path, shared by nested checks.
    circularity_path: Vec<DeclId>,
    depth: u32,
    fatal: Option<Error>,
}

impl Elaborator {
    pub(crate) fn new(
        ast: Ast,
        config: SemaConfig,
        known: KnownDecls,
        lookup: Box<dyn NameLookup>,
        exprs: Box<dyn ExprChecker>,
        archetypes: Box<dyn ArchetypeBuilderFactory>,
    ) -> Self {
        Self {
            ast,
            types: TypeContext::new(),
            diag: Diagnostics::new(),
            config,
            known,
            lookup,
            exprs,
            archetypes,
            access_cache: HashMap::new(),
            contextual: HashMap::new(),
            circularity_path: Vec::new(),
            depth: 0,
            fatal: None,
        }
    }

    /// Check the whole module.
    pub(crate) fn run(mut self) -> PassResult<(Ast, TypeContext)> {
        self.bind_extensions();
        self.check_files();
        if let Some(err) = self.fatal.take() {
            return Err(err);
        }
        Ok(((self.ast, self.types), self.diag))
    }

    fn is_aborted(&self) -> bool {
        self.fatal.is_some()
    }

    fn report(&mut self, kind: DiagnosticKind, span: Span) -> DiagnosticBuilder<'_> {
        self.diag.report(kind, span)
    }

    fn span(&self, d: DeclId) -> Span {
        self.ast.decl(d).span()
    }

    fn span_of(&self, d: DeclId, range: rowan::TextRange) -> Span {
        Span::new(self.ast.decl(d).file, range)
    }

    fn name(&self, d: DeclId) -> String {
        self.ast.name_of(d)
    }

    fn display(&self, ty: TypeId) -> String {
        self.types.display(ty, &self.ast.interner).to_string()
    }

    fn intern(&mut self, s: &str) -> Symbol {
        self.ast.intern(s)
    }

    fn is_invalid(&self, d: DeclId) -> bool {
        self.ast.decl(d).invalid
    }

    /// Mark `d` invalid and give it the error type.
    fn mark_invalid(&mut self, d: DeclId) {
        let decl = self.ast.decl_mut(d);
        decl.invalid = true;
        decl.ty = Some(TYPE_ERROR);
        decl.interface_ty = Some(TYPE_ERROR);
    }

    fn interface_type_of(&mut self, d: DeclId) -> TypeId {
        self.validate_decl(d);
        self.ast.decl(d).interface_ty.unwrap_or(TYPE_ERROR)
    }

    /// Declaration context introduced by a nominal or extension.
    fn context_of(&self, d: DeclId) -> DeclContext {
        match self.ast.decl(d).kind {
            DeclKind::Extension(_) => DeclContext::Extension(d),
            _ => DeclContext::Nominal(d),
        }
    }

    /// Resolve extension targets before anything else looks at members.
    fn bind_extensions(&mut self) {
        let extensions: Vec<DeclId> = self
            .ast
            .decls()
            .filter(|(_, d)| matches!(d.kind, DeclKind::Extension(_)))
            .map(|(id, _)| id)
            .collect();

        for ext in extensions {
            let mut loc = match self.ast.decl(ext).as_extension() {
                Some(data) => data.extended.clone(),
                None => continue,
            };
            let dc = self.ast.decl(ext).parent;
            let ty = self.resolve_type_loc(&mut loc, dc, ResolveMode::Interface);
            let nominal = self.types.nominal_decl(ty);
            if nominal.is_none() && !self.types.is_error(ty) {
                let span = self.span(ext);
                let shown = self.display(ty);
                self.report(DiagnosticKind::NonNominalExtension, span)
                    .message(shown)
                    .emit();
            }
            if nominal.is_none() {
                self.mark_invalid(ext);
            }
            if let Some(data) = self.ast.decl_mut(ext).as_extension_mut() {
                data.extended = loc;
                data.nominal = nominal;
            }
        }
    }

    /// Type-check `expr` through the expression oracle.
    fn check_expr(
        &mut self,
        expr: &mut crate::ast::Expr,
        dc: DeclContext,
        contextual: Option<TypeId>,
    ) -> Result<TypeId, ExprError> {
        self.prepare_expr(expr, dc);
        if let Some(ctx) = contextual {
            self.prepare_conformance_query(ctx);
        }
        let mut cx = ExprContext {
            ast: &self.ast,
            types: &mut self.types,
            known: &self.known,
        };
        self.exprs.type_check(&mut cx, expr, dc, contextual)
    }

    /// Resolve bare names in `expr` and validate every declaration it refers to.
    fn prepare_expr(&mut self, expr: &mut crate::ast::Expr, dc: DeclContext) {
        use crate::ast::{AccessSemantics, ExprKind};

        let mut pending = Vec::new();
        let mut stack = vec![&mut *expr];
        while let Some(e) = stack.pop() {
            if let ExprKind::UnresolvedDeclRef(name) = e.kind {
                let found = self.lookup.lookup_unqualified(&self.ast, dc, name);
                e.kind = match found.first().copied() {
                    Some(d) if self.ast.decl(d).is_type_decl() => {
                        ExprKind::TypeRef(self.declared_type_of(d))
                    }
                    Some(d) => {
                        pending.push(d);
                        ExprKind::DeclRef {
                            decl: d,
                            semantics: AccessSemantics::Ordinary,
                        }
                    }
                    None => ExprKind::Error,
                };
                continue;
            }
            match &mut e.kind {
                ExprKind::DeclRef { decl, .. } => pending.push(*decl),
                ExprKind::MemberRef { base, member, .. } => {
                    pending.push(*member);
                    stack.push(base);
                }
                ExprKind::Call { callee, args } => {
                    stack.push(callee);
                    stack.extend(args.iter_mut().map(|a| &mut a.value));
                }
                ExprKind::Tuple(args) => stack.extend(args.iter_mut().map(|a| &mut a.value)),
                ExprKind::Assign { dest, source } => {
                    stack.push(dest);
                    stack.push(source);
                }
                ExprKind::ForceUnwrap(sub)
                | ExprKind::AddressOf(sub)
                | ExprKind::ForcedCast { sub, .. }
                | ExprKind::ConditionalCast { sub, .. } => stack.push(sub),
                _ => {}
            }
        }
        for d in pending {
            self.validate_decl(d);
        }
    }

    /// Make sure conformance information of the nominal behind `ty` is final.
    fn prepare_conformance_query(&mut self, ty: TypeId) {
        let object = self.types.optional_object(ty).unwrap_or(ty);
        if let Some(nominal) = self.types.nominal_decl(object) {
            self.resolve_conformance_graph(nominal);
        }
    }
}
