//! Pattern bindings: pattern types, initializers and default initialization.

use tracing::{debug, trace};

use super::{Elaborator, ResolveMode};
use crate::ast::{
    AttrKind, DeclContext, DeclId, Expr, ExprKind, FileKind, Ownership, Pattern, PatternKind,
    StaticSpelling, StorageKind, TypeRepr, TypeReprKind,
};
use crate::diagnostics::DiagnosticKind;
use crate::types::{TYPE_ERROR, TupleElement, TypeId, TypeShape};

impl Elaborator {
    /// Validate the shape of binding `d` and give its variables their types.
    pub(super) fn validate_binding(&mut self, d: DeclId) {
        self.validate_container(d);
        self.check_static_spelling(d);

        let dc = self.ast.decl(d).parent;
        let Some(mut pattern) = self.ast.decl(d).as_binding().map(|b| b.pattern.clone()) else {
            return;
        };
        let annotated = self.resolve_pattern(&mut pattern, dc);
        let has_init = self
            .ast
            .decl(d)
            .as_binding()
            .is_some_and(|b| b.init.is_some());
        if let Some(b) = self.ast.decl_mut(d).as_binding_mut() {
            b.pattern = pattern.clone();
        }

        let vars = pattern.bound_vars();
        if vars.is_empty() && (dc.is_type_context() || dc.is_module_scope()) {
            let span = self.span_of(d, pattern.range);
            self.report(DiagnosticKind::PatternBindsNoVariables, span)
                .emit();
        }

        match annotated {
            Some(_) => {}
            None if has_init => self.type_check_binding(d),
            None => {
                let span = self.span_of(d, pattern.range);
                self.report(DiagnosticKind::PatternWithoutType, span).emit();
                self.ast.decl_mut(d).invalid = true;
                for v in vars.iter().copied() {
                    if self.ast.decl(v).ty.is_none() {
                        self.mark_invalid(v);
                    }
                }
            }
        }

        self.check_static_storage(d, &vars);
    }

    /// `static` outside a type and `class` inside a value type.
    fn check_static_spelling(&mut self, d: DeclId) {
        let dc = self.ast.decl(d).parent;
        let Some(b) = self.ast.decl(d).as_binding() else {
            return;
        };
        if !b.is_static {
            return;
        }
        let spelling = b.static_spelling;
        let range = b.static_range.unwrap_or(self.ast.decl(d).range);
        let span = self.span_of(d, range);

        if !dc.is_type_context() {
            let keyword = match spelling {
                StaticSpelling::Class => "class",
                _ => "static",
            };
            self.report(DiagnosticKind::StaticOutsideType, span)
                .fix(format!("remove '{keyword}'"), span, "")
                .emit();
            let vars = self.set_binding_static(d, false);
            debug!(binding = d.as_u32(), vars = vars.len(), "static cleared outside type");
        } else if spelling == StaticSpelling::Class && self.ast.is_value_type_context(dc) {
            self.report(DiagnosticKind::ClassVarInValueType, span)
                .fix("replace 'class' with 'static'", span, "static")
                .emit();
            if let Some(b) = self.ast.decl_mut(d).as_binding_mut() {
                b.static_spelling = StaticSpelling::Static;
            }
        }
    }

    fn set_binding_static(&mut self, d: DeclId, is_static: bool) -> Vec<DeclId> {
        let vars = match self.ast.decl_mut(d).as_binding_mut() {
            Some(b) => {
                b.is_static = is_static;
                if !is_static {
                    b.static_spelling = StaticSpelling::None;
                }
                b.pattern.bound_vars()
            }
            None => return Vec::new(),
        };
        for &v in &vars {
            if let Some(var) = self.ast.decl_mut(v).as_var_mut() {
                var.is_static = is_static;
            }
        }
        vars
    }

    /// Static stored properties the language does not support yet.
    fn check_static_storage(&mut self, d: DeclId, vars: &[DeclId]) {
        let dc = self.ast.decl(d).parent;
        let Some(b) = self.ast.decl(d).as_binding() else {
            return;
        };
        if !b.is_static || !dc.is_type_context() || self.ast.is_protocol_context(dc) {
            return;
        }
        let spelling = b.static_spelling;
        let stored = vars.iter().any(|&v| {
            self.ast
                .decl(v)
                .storage()
                .is_some_and(|s| s.has_storage())
        });
        if !stored {
            return;
        }
        let kind = if self.ast.is_generic_context(dc) {
            DiagnosticKind::StaticStoredInGenericType
        } else if spelling == StaticSpelling::Class && self.ast.is_class_context(dc) {
            DiagnosticKind::ClassStoredProperty
        } else {
            return;
        };
        let span = self.span(d);
        self.report(kind, span).emit();
        self.ast.decl_mut(d).invalid = true;
    }

    /// Resolve every annotation in `pattern` and type its variables.
    ///
    /// Returns the interface type when the whole pattern is annotated.
    fn resolve_pattern(&mut self, pattern: &mut Pattern, dc: DeclContext) -> Option<TypeId> {
        let ty = match &mut pattern.kind {
            PatternKind::Typed { sub, annotation } => {
                let interface = self.resolve_type_loc(annotation, dc, ResolveMode::Interface);
                let contextual = self.map_to_archetypes(interface);
                self.bind_pattern(sub, interface, contextual);
                Some(interface)
            }
            PatternKind::Paren(sub) | PatternKind::Var(sub) => self.resolve_pattern(sub, dc),
            PatternKind::Tuple(elements) => {
                let mut types = Vec::with_capacity(elements.len());
                for e in elements.iter_mut() {
                    types.push(self.resolve_pattern(e, dc));
                }
                let types: Option<Vec<TypeId>> = types.into_iter().collect();
                types.map(|tys| {
                    self.types
                        .tuple(tys.into_iter().map(|t| TupleElement::new(None, t)).collect())
                })
            }
            PatternKind::Named(_) | PatternKind::Any => None,
        };
        if let Some(interface) = ty {
            pattern.ty = Some(self.map_to_archetypes(interface));
        }
        ty
    }

    /// Give the variables of `pattern` the matching parts of a type.
    fn bind_pattern(&mut self, pattern: &mut Pattern, interface: TypeId, contextual: TypeId) {
        pattern.ty = Some(contextual);
        match &mut pattern.kind {
            PatternKind::Named(var) => {
                let var = *var;
                if self.types.contains_error(contextual) {
                    self.mark_invalid(var);
                } else {
                    let decl = self.ast.decl_mut(var);
                    decl.interface_ty = Some(interface);
                    decl.ty = Some(contextual);
                }
            }
            PatternKind::Any => {}
            PatternKind::Paren(sub) | PatternKind::Var(sub) => {
                self.bind_pattern(sub, interface, contextual)
            }
            // The annotation already typed the subpattern.
            PatternKind::Typed { .. } => {}
            PatternKind::Tuple(elements) => {
                let parts = |ty| {
                    self.types
                        .tuple_elements(self.types.desugar(ty))
                        .map(|e| e.iter().map(|e| e.ty).collect::<Vec<_>>())
                };
                let ctx_parts = parts(contextual).filter(|p| p.len() == elements.len());
                let iface_parts = parts(interface).filter(|p| p.len() == elements.len());
                for (i, e) in elements.iter_mut().enumerate() {
                    let c = ctx_parts.as_ref().map_or(TYPE_ERROR, |p| p[i]);
                    let f = iface_parts.as_ref().map_or(c, |p| p[i]);
                    self.bind_pattern(e, f, c);
                }
            }
        }
    }

    /// Type-check the initializer of binding `d` once.
    ///
    /// An unannotated pattern takes the inferred type.
    pub(super) fn type_check_binding(&mut self, d: DeclId) {
        let Some(b) = self.ast.decl_mut(d).as_binding_mut() else {
            return;
        };
        if b.init_checked {
            return;
        }
        let Some(mut init) = b.init.take() else {
            return;
        };
        b.init_checked = true;
        let mut pattern = b.pattern.clone();
        let annotated = pattern.annotation().and_then(|loc| loc.ty);
        let contextual = annotated.map(|ty| self.map_to_archetypes(ty));
        trace!(binding = d.as_u32(), "type-check initializer");

        match self.check_expr(&mut init, DeclContext::Initializer(d), contextual) {
            Ok(ty) if annotated.is_none() => {
                if !self.types.is_error(ty) && !self.types.is_materializable(ty) {
                    let span = self.span_of(d, pattern.range);
                    let message = format!(
                        "variable has type '{}' which cannot be stored",
                        self.display(ty)
                    );
                    self.report(DiagnosticKind::TypeNotMaterializable, span)
                        .message(message)
                        .emit();
                    self.ast.decl_mut(d).invalid = true;
                    self.bind_pattern(&mut pattern, TYPE_ERROR, TYPE_ERROR);
                } else {
                    self.bind_pattern(&mut pattern, ty, ty);
                }
            }
            Ok(_) => {}
            Err(err) => {
                let span = self.span_of(d, init.range);
                self.report(DiagnosticKind::InitializerTypeMismatch, span)
                    .message(err.to_string())
                    .emit();
                self.ast.decl_mut(d).invalid = true;
                if annotated.is_none() {
                    self.bind_pattern(&mut pattern, TYPE_ERROR, TYPE_ERROR);
                }
            }
        }

        if let Some(b) = self.ast.decl_mut(d).as_binding_mut() {
            b.init = Some(init);
            b.pattern = pattern;
        }
    }

    /// First-sweep work on a binding: default initialization and required
    /// initializers.
    pub(super) fn visit_binding(&mut self, d: DeclId) {
        self.validate_decl(d);
        let vars = self.binding_vars(d);
        for &v in &vars {
            self.validate_decl(v);
        }
        if self.is_invalid(d) {
            return;
        }
        self.add_default_initializer(d, &vars);
        self.check_required_initializer(d, &vars);
    }

    /// Second-sweep work on a binding.
    pub(super) fn check_binding_body(&mut self, d: DeclId) {
        let pending = self
            .ast
            .decl(d)
            .as_binding()
            .is_some_and(|b| b.init.is_some() && !b.init_checked);
        if pending {
            self.type_check_binding(d);
        }
        self.check_access(d);
    }

    pub(super) fn binding_vars(&self, d: DeclId) -> Vec<DeclId> {
        self.ast
            .decl(d)
            .as_binding()
            .map(|b| b.pattern.bound_vars())
            .unwrap_or_default()
    }

    fn binding_has_storage(&self, vars: &[DeclId]) -> bool {
        vars.iter()
            .any(|&v| self.ast.decl(v).storage().is_some_and(|s| s.has_storage()))
    }

    fn add_default_initializer(&mut self, d: DeclId, vars: &[DeclId]) {
        let Some(b) = self.ast.decl(d).as_binding() else {
            return;
        };
        if b.init.is_some() || !self.binding_has_storage(vars) {
            return;
        }
        let managed = vars
            .iter()
            .any(|&v| self.ast.decl(v).attrs.has(&AttrKind::Managed));
        if managed || !self.pattern_default_initializable(d) {
            return;
        }
        let Some(ty) = b.pattern.annotation().and_then(|loc| loc.ty) else {
            return;
        };
        let ty = self.map_to_archetypes(ty);
        let Some(init) = self.default_initializer(ty) else {
            return;
        };

        let dc = self.ast.decl(d).parent;
        let is_let = vars
            .iter()
            .any(|&v| self.ast.decl(v).as_var().is_some_and(|v| v.is_let));
        if is_let && !dc.is_type_context() {
            let span = self.span(vars[0]);
            self.report(DiagnosticKind::LetDefaultInit, span).emit();
        }
        trace!(binding = d.as_u32(), "default initializer");
        if let Some(b) = self.ast.decl_mut(d).as_binding_mut() {
            b.init = Some(init);
            b.init_checked = false;
        }
        self.type_check_binding(d);
    }

    /// The implicit value of a default-initializable type.
    pub(super) fn default_initializer(&mut self, ty: TypeId) -> Option<Expr> {
        let ty = self.types.desugar(ty);
        match self.types.get(ty).clone() {
            TypeShape::Optional(_) | TypeShape::ImplicitlyUnwrappedOptional(_) => {
                Some(Expr::implicit(ExprKind::NilLiteral))
            }
            TypeShape::ReferenceStorage {
                ownership: Ownership::Weak,
                ..
            } => Some(Expr::implicit(ExprKind::NilLiteral)),
            TypeShape::Tuple(elements) if !elements.is_empty() => {
                let mut args = Vec::with_capacity(elements.len());
                for e in elements {
                    if e.variadic {
                        return None;
                    }
                    args.push(crate::ast::Arg::new(e.label, self.default_initializer(e.ty)?));
                }
                Some(Expr::tuple(args))
            }
            _ => None,
        }
    }

    /// Whether the binding can be left without an initializer.
    pub(super) fn binding_default_initializable(&self, d: DeclId) -> bool {
        let Some(b) = self.ast.decl(d).as_binding() else {
            return false;
        };
        if b.init.is_some() {
            return true;
        }
        let vars = b.pattern.bound_vars();
        let special = vars.iter().any(|&v| {
            let attrs = &self.ast.decl(v).attrs;
            attrs.has(&AttrKind::Managed) || attrs.has(&AttrKind::Lazy)
        });
        special || self.pattern_default_initializable(d)
    }

    fn pattern_default_initializable(&self, d: DeclId) -> bool {
        let Some(b) = self.ast.decl(d).as_binding() else {
            return false;
        };
        let weak = b.pattern.bound_vars().iter().any(|&v| {
            self.ast.decl(v).attrs.ownership() == Some(Ownership::Weak)
        });
        match b.pattern.annotation().and_then(|loc| loc.repr.as_ref()) {
            Some(repr) => weak || repr_default_initializable(repr),
            None => {
                // Implicit bindings carry resolved types without source.
                let ty = b.pattern.annotation().and_then(|loc| loc.ty);
                weak || ty.is_some_and(|ty| self.type_default_initializable(ty))
            }
        }
    }

    fn type_default_initializable(&self, ty: TypeId) -> bool {
        match self.types.get(self.types.desugar(ty)) {
            TypeShape::Optional(_) | TypeShape::ImplicitlyUnwrappedOptional(_) => true,
            TypeShape::Tuple(elements) => elements
                .iter()
                .all(|e| !e.variadic && self.type_default_initializable(e.ty)),
            _ => false,
        }
    }

    /// Bindings outside types that need an initializer but have none.
    fn check_required_initializer(&mut self, d: DeclId, vars: &[DeclId]) {
        if self
            .ast
            .decl(d)
            .as_binding()
            .is_none_or(|b| b.init.is_some())
        {
            return;
        }
        let Some(&first) = vars.first() else {
            return;
        };
        let dc = self.ast.decl(d).parent;
        let var = self.ast.decl(first);
        let Some(data) = var.as_var() else {
            return;
        };
        let in_type = dc.is_type_context();
        let has_storage = data.storage.has_storage();
        let kind = if data.is_let && !in_type {
            DiagnosticKind::LetRequiresInitializer
        } else if data.storage.kind == StorageKind::Observing && !in_type {
            DiagnosticKind::ObservingPropertyRequiresInitializer
        } else if data.is_static && has_storage && !self.ast.is_protocol_context(dc) {
            DiagnosticKind::StaticRequiresInitializer
        } else if dc.is_module_scope() && has_storage && !self.in_main_file(d) {
            DiagnosticKind::GlobalRequiresInitializer
        } else {
            return;
        };

        let span = self.span(first);
        self.report(kind, span).emit();
        self.ast.decl_mut(d).invalid = true;
        for &v in vars {
            self.mark_invalid(v);
        }
    }

    fn in_main_file(&self, d: DeclId) -> bool {
        let file = self.ast.decl(d).file;
        self.ast.file(file).kind == FileKind::Main
    }
}

/// Whether a written annotation admits an implicit initial value.
fn repr_default_initializable(repr: &TypeRepr) -> bool {
    match &repr.kind {
        TypeReprKind::Optional(_) | TypeReprKind::ImplicitlyUnwrappedOptional(_) => true,
        TypeReprKind::Ownership {
            ownership: Ownership::Weak,
            ..
        } => true,
        TypeReprKind::Tuple(elements) => elements
            .iter()
            .all(|e| !e.variadic && repr_default_initializable(&e.ty)),
        _ => false,
    }
}
