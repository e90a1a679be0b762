//! Override matching for class members.
//!
//! A member of a class overrides the superclass member with the same full
//! name whose type it can stand in for. Matching prefers exact type matches;
//! once a base is chosen, the override is checked for accessibility, type
//! and storage compatibility, and the link is recorded in both directions.

use std::collections::HashMap;

use kestrel_core::DeclName;
use tracing::{debug, trace};

use super::Elaborator;
use crate::ast::{
    AccessorKind, Accessibility, AttrKind, CtorKind, DeclId, DeclKind, Failability, ObjCName,
    StorageKind,
};
use crate::collab::LookupOptions;
use crate::diagnostics::DiagnosticKind;
use crate::state::Entry;
use crate::types::{TYPE_ERROR, TYPE_UNIT, TupleElement, TypeId, TypeShape};

/// A superclass member `d` could override.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    decl: DeclId,
    exact: bool,
    ty: TypeId,
}

fn objc_name_text(name: &ObjCName, interner: &kestrel_core::Interner) -> String {
    let mut out = String::new();
    for piece in &name.pieces {
        out.push_str(interner.resolve(*piece));
        if name.num_args > 0 {
            out.push(':');
        }
    }
    out
}

impl Elaborator {
    /// Find and record the superclass member `d` overrides.
    pub(super) fn check_overrides(&mut self, d: DeclId) {
        if self.ast.decl_mut(d).state.overrides.enter() != Entry::Fresh {
            return;
        }
        self.validate_decl(d);
        if self.overrides_candidate(d) {
            self.match_override(d);
        }
        self.ast.decl_mut(d).state.overrides.finish();
    }

    fn overrides_candidate(&self, d: DeclId) -> bool {
        let decl = self.ast.decl(d);
        !decl.invalid
            && decl.overridden.is_none()
            && !decl.is_accessor()
            && matches!(
                decl.kind,
                DeclKind::Func(_) | DeclKind::Subscript(_) | DeclKind::Var(_) | DeclKind::Constructor(_)
            )
    }

    /// The class `d` is a member of, directly or through an extension.
    fn containing_class(&self, d: DeclId) -> Option<DeclId> {
        let dc = self.ast.decl(d).parent;
        self.ast
            .nominal_of(dc)
            .filter(|&n| self.ast.decl(n).is_class())
    }

    fn match_override(&mut self, d: DeclId) {
        let superclass = self.containing_class(d).and_then(|class| {
            self.resolve_inheritance(class);
            self.ast.decl(class).as_nominal().and_then(|n| n.superclass)
        });
        let Some(superclass) = superclass else {
            self.report_does_not_override(d);
            return;
        };
        let Some(super_decl) = self.types.class_decl(superclass) else {
            return;
        };

        let decl_ty = self.override_match_type(d, self.ast.decl(d).interface_ty.unwrap_or(TYPE_ERROR));
        let name = self.ast.decl(d).name.clone();
        let candidates = self.find_candidates(d, decl_ty, super_decl, superclass, &name, false);
        let Ok(mut matches) = candidates else {
            return;
        };

        let mut retried = false;
        let has_override = self.has_written_override(d);
        if matches.is_empty() && name.is_compound() && !name.labels().is_empty() && has_override {
            retried = true;
            let base_name = name.base_name();
            match self.find_candidates(d, decl_ty, super_decl, superclass, &base_name, true) {
                Ok(found) => matches = found,
                Err(()) => return,
            }
        }

        if matches.is_empty() {
            self.report_does_not_override(d);
            return;
        }
        if matches.iter().any(|m| m.exact) {
            matches.retain(|m| m.exact);
        }
        if let [only] = matches.as_slice() {
            let only = *only;
            if retried {
                self.report_label_mismatch(d, only.decl);
            }
            self.finish_override_match(d, only, decl_ty);
            return;
        }

        let span = self.span(d);
        let message = format!(
            "declaration '{}' cannot override more than one superclass declaration",
            self.name(d)
        );
        let notes: Vec<_> = matches.iter().map(|m| self.span(m.decl)).collect();
        let mut diag = self
            .report(DiagnosticKind::OverrideMultipleDecls, span)
            .message(message);
        for note in notes {
            diag = diag.related_to("overridden declaration is here", note);
        }
        diag.emit();
    }

    /// Superclass members named `name` that `d` could override. `Err` means a
    /// diagnostic already ended matching.
    fn find_candidates(
        &mut self,
        d: DeclId,
        decl_ty: TypeId,
        super_decl: DeclId,
        superclass: TypeId,
        name: &DeclName,
        base_name_only: bool,
    ) -> Result<Vec<Candidate>, ()> {
        let mut options = LookupOptions::default();
        if base_name_only {
            options = options.by_base_name();
        }
        let found = self
            .lookup
            .lookup_member(&self.ast, &self.types, super_decl, name, options);
        for &c in &found {
            self.check_overrides(c);
        }
        // Members overridden by another candidate are hidden behind it.
        let visible: Vec<DeclId> = found
            .iter()
            .copied()
            .filter(|&c| !found.iter().any(|&o| self.ast.decl(o).overridden == Some(c)))
            .collect();

        let decl = self.ast.decl(d);
        let kind = std::mem::discriminant(&decl.kind);
        let arity = decl.name.arity();
        let is_static = decl.is_static();
        let is_objc = decl.is_objc();
        let is_var = decl.as_var().is_some();

        let mut out = Vec::new();
        for c in visible {
            let cand = self.ast.decl(c);
            if std::mem::discriminant(&cand.kind) != kind
                || cand.is_accessor()
                || cand.name.arity() != arity
                || cand.is_static() != is_static
            {
                continue;
            }
            self.validate_decl(c);
            if self.is_invalid(c) {
                continue;
            }
            let base_ty = self.member_type_in(c, superclass);
            let base_ty = self.override_match_type(c, base_ty);
            let objc_match = is_objc && self.ast.decl(c).is_objc() && self.objc_signatures_match(d, c);

            if self.types.same_type(decl_ty, base_ty) {
                out.push(Candidate {
                    decl: c,
                    exact: true,
                    ty: base_ty,
                });
            } else if is_var {
                out.push(Candidate {
                    decl: c,
                    exact: false,
                    ty: base_ty,
                });
            } else if self.is_subtype_of(decl_ty, base_ty) {
                out.push(Candidate {
                    decl: c,
                    exact: objc_match,
                    ty: base_ty,
                });
            } else if objc_match {
                let span = self.span(d);
                let message = format!(
                    "overriding {} with interop name '{}' has incompatible type '{}'",
                    self.ast.decl(d).descriptive_kind(),
                    self.objc_selector(d),
                    self.display(decl_ty)
                );
                let base_span = self.span(c);
                let base_shown = format!("overridden declaration here has type '{}'", self.display(base_ty));
                self.report(DiagnosticKind::OverrideObjCTypeMismatch, span)
                    .message(message)
                    .related_to(base_shown, base_span)
                    .emit();
                return Err(());
            }
        }
        trace!(decl = %self.name(d), candidates = out.len(), "override candidates");
        Ok(out)
    }

    /// Interface type of superclass member `member` as seen from a class
    /// whose superclass is `superclass`.
    fn member_type_in(&mut self, member: DeclId, superclass: TypeId) -> TypeId {
        let ty = self.interface_type_of(member);
        let Some(owner) = self.ast.nominal_of(self.ast.decl(member).parent) else {
            return ty;
        };
        let chain = self.superclass_chain(superclass);
        let Some(bound) = chain
            .into_iter()
            .find(|&t| self.types.class_decl(t) == Some(owner))
        else {
            return ty;
        };
        let args = match self.types.get(bound) {
            TypeShape::Nominal { args, .. } => args.clone(),
            _ => return ty,
        };
        let params: Vec<DeclId> = self
            .ast
            .decl(owner)
            .generic_params()
            .map(|list| list.params.clone())
            .unwrap_or_default();
        let map: HashMap<DeclId, TypeId> = params.into_iter().zip(args).collect();
        self.types.substitute(ty, &map)
    }

    /// Type compared during matching: methods without `self` and
    /// `@noreturn`, initializers by their parameters, storage by referent.
    /// Argument labels are compared through names, not types.
    fn override_match_type(&mut self, d: DeclId, ty: TypeId) -> TypeId {
        match self.ast.decl(d).kind {
            DeclKind::Func(_) | DeclKind::Constructor(_) => {
                let is_ctor = matches!(self.ast.decl(d).kind, DeclKind::Constructor(_));
                let Some(method) = self.types.function_result(ty) else {
                    return ty;
                };
                let Some((input, result, _)) = self.types.function_parts(method) else {
                    return method;
                };
                let input = self.unlabeled(input);
                let result = if is_ctor { TYPE_UNIT } else { result };
                self.types.intern(TypeShape::Function {
                    input,
                    result,
                    no_return: false,
                })
            }
            DeclKind::Subscript(_) => {
                let Some((input, result, _)) = self.types.function_parts(ty) else {
                    return ty;
                };
                let input = self.unlabeled(input);
                self.types.function(input, result)
            }
            _ => self.types.reference_storage_referent(ty),
        }
    }

    fn unlabeled(&mut self, ty: TypeId) -> TypeId {
        match self.types.tuple_elements(ty) {
            Some(elements) => {
                let elements: Vec<TupleElement> = elements
                    .iter()
                    .map(|e| TupleElement {
                        label: None,
                        ..e.clone()
                    })
                    .collect();
                self.types.tuple(elements)
            }
            None => ty,
        }
    }

    /// Interop selector: the explicit `@objc` name or the declaration name.
    fn objc_selector(&self, d: DeclId) -> String {
        match self.ast.decl(d).attrs.objc_name() {
            Some(name) => objc_name_text(name, &self.ast.interner),
            None => self.name(d),
        }
    }

    /// Methods compare selectors; subscripts compare whether they are
    /// indexed by integers.
    fn objc_signatures_match(&mut self, d: DeclId, c: DeclId) -> bool {
        match self.ast.decl(d).kind {
            DeclKind::Func(_) | DeclKind::Constructor(_) => {
                self.objc_selector(d) == self.objc_selector(c)
            }
            DeclKind::Subscript(_) => self.subscript_is_indexed(d) == self.subscript_is_indexed(c),
            _ => false,
        }
    }

    fn subscript_is_indexed(&mut self, s: DeclId) -> bool {
        let Some(&index) = self.ast.decl(s).params().first() else {
            return false;
        };
        let ty = self.interface_type_of(index);
        self.known
            .int
            .is_some_and(|int| self.types.nominal_decl(ty) == Some(int))
    }

    fn has_written_override(&self, d: DeclId) -> bool {
        self.ast
            .decl(d)
            .attrs
            .get(&AttrKind::Override)
            .is_some_and(|a| !a.implicit)
    }

    fn report_does_not_override(&mut self, d: DeclId) {
        if !self.has_written_override(d) {
            return;
        }
        let kind = match self.ast.decl(d).kind {
            DeclKind::Func(_) => DiagnosticKind::MethodDoesNotOverride,
            DeclKind::Constructor(_) => DiagnosticKind::InitializerDoesNotOverride,
            _ => DiagnosticKind::PropertyDoesNotOverride,
        };
        let span = self.span(d);
        self.report(kind, span).emit();
        self.ast.decl_mut(d).attrs.invalidate(&AttrKind::Override);
    }

    /// Found a base by name only: point at the labels that differ.
    fn report_label_mismatch(&mut self, d: DeclId, base: DeclId) {
        let what = if matches!(self.ast.decl(d).kind, DeclKind::Constructor(_)) {
            "initializer"
        } else {
            "method"
        };
        let message = format!(
            "argument names for {what} '{}' do not match those of overridden {what} '{}'",
            self.name(d),
            self.name(base)
        );
        let span = self.span(d);
        let base_labels = self.ast.decl(base).name.labels().to_vec();
        let mut fixes = Vec::new();
        for (i, &p) in self.ast.decl(d).params().iter().enumerate() {
            let label = self.ast.decl(p).as_param().and_then(|p| p.api_label);
            let Some(&wanted) = base_labels.get(i) else {
                continue;
            };
            if label == wanted {
                continue;
            }
            let param_name = self.ast.base_name_of(p).to_string();
            let replacement = match wanted {
                Some(w) => {
                    let w = self.ast.resolve(w);
                    if w == param_name {
                        param_name.clone()
                    } else {
                        format!("{w} {param_name}")
                    }
                }
                None => format!("_ {param_name}"),
            };
            let Some(names) = self.ast.decl(p).as_param().and_then(|p| p.names_range) else {
                continue;
            };
            fixes.push((self.span_of(p, names), replacement));
        }
        let base_span = self.span(base);
        let mut diag = self
            .report(DiagnosticKind::OverrideArgumentNameMismatch, span)
            .message(message);
        for (fix_span, replacement) in fixes {
            diag = diag.fix(format!("use '{replacement}'"), fix_span, replacement);
        }
        diag.related_to("overridden declaration is here", base_span)
            .emit();
    }

    /// Checks on a chosen base that precede recording the link.
    fn finish_override_match(&mut self, d: DeclId, m: Candidate, decl_ty: TypeId) {
        let base = m.decl;
        if !self.check_override_access(d, base) {
            return;
        }

        let exact = self.types.same_type(decl_ty, m.ty);
        let base_span = self.span(base);
        let span = self.span(d);
        let is_subscript = matches!(self.ast.decl(d).kind, DeclKind::Subscript(_));
        let is_var = self.ast.decl(d).as_var().is_some();

        if is_subscript && !exact && self.base_has_setter(base) {
            self.report(DiagnosticKind::OverrideMutableCovariantSubscript, span)
                .related_to("overridden subscript is here", base_span)
                .emit();
            return;
        }
        if is_var && !exact {
            if !self.is_subtype_of(decl_ty, m.ty) {
                let message = format!(
                    "property '{}' with type '{}' cannot override a property with type '{}'",
                    self.name(d),
                    self.display(decl_ty),
                    self.display(m.ty)
                );
                self.report(DiagnosticKind::OverridePropertyTypeMismatch, span)
                    .message(message)
                    .related_to("overridden property is here", base_span)
                    .emit();
                return;
            }
            // `T?` over `T!` and the reverse are the same property.
            let silent = match (
                self.types.optional_object(decl_ty),
                self.types.optional_object(m.ty),
            ) {
                (Some(a), Some(b)) => self.types.same_type(a, b),
                _ => false,
            };
            if self.base_has_setter(base) && !silent {
                self.report(DiagnosticKind::OverrideMutableCovariantProperty, span)
                    .related_to("overridden property is here", base_span)
                    .emit();
                return;
            }
        }

        if let DeclKind::Constructor(_) = self.ast.decl(d).kind {
            self.check_initializer_override(d, base);
        }
        self.record_override(d, base);
    }

    fn base_has_setter(&self, base: DeclId) -> bool {
        self.ast
            .decl(base)
            .storage()
            .is_some_and(|s| s.accessors.setter.is_some())
            || (self.ast.decl(base).storage().is_some_and(|s| s.has_storage())
                && self.is_settable(base))
    }

    /// The override must be as accessible as `min(class, base)`; setters
    /// separately. Returns whether matching may continue.
    fn check_override_access(&mut self, d: DeclId, base: DeclId) -> bool {
        if matches!(self.ast.decl(d).kind, DeclKind::Constructor(_)) {
            return true;
        }
        let Some(class) = self.containing_class(d) else {
            return true;
        };
        let class_access = self.accessibility_of(class);
        let base_access = self.accessibility_of(base);
        let required = class_access.min(base_access);
        if required == Accessibility::Private {
            return true;
        }

        let mut setter = false;
        let mut diagnose = self.accessibility_of(d) < required;
        if !diagnose && self.ast.decl(base).is_storage() && self.is_settable(base) {
            let class_dc = self.context_of(class);
            if self.is_setter_accessible_from(base, class_dc) {
                diagnose = self.setter_accessibility_of(d) < required;
                setter = diagnose;
            }
        }
        if !diagnose {
            return true;
        }

        let what = self.ast.decl(d).descriptive_kind();
        let forced_by = if required == base_access {
            "the declaration it overrides"
        } else {
            "its enclosing type"
        };
        let message = format!(
            "overriding {what}{} must be as accessible as {forced_by}",
            if setter { " setter" } else { "" }
        );
        let attr = if setter {
            AttrKind::SetterAccessibility(required)
        } else {
            AttrKind::Accessibility(required)
        };
        let existing = self.ast.decl(d).attrs.range_of(&attr);
        let (fix_span, replacement) = match existing {
            Some(range) => (self.span_of(d, range), attr.spelling().to_string()),
            None => {
                let start = self.ast.decl(d).full_span().start();
                (start, format!("{} ", attr.spelling()))
            }
        };
        let base_span = self.span(base);
        let span = self.span(d);
        self.report(DiagnosticKind::OverrideNotAccessible, span)
            .message(message)
            .fix(format!("mark it '{}'", attr.spelling()), fix_span, replacement)
            .related_to("overridden declaration is here", base_span)
            .emit();
        true
    }

    /// `required` and failability rules between initializers.
    fn check_initializer_override(&mut self, d: DeclId, base: DeclId) {
        let span = self.span(d);
        let start = self.ast.decl(d).full_span().start();
        if self.ast.decl(base).attrs.has(&AttrKind::Required) {
            let override_attr = self
                .ast
                .decl(d)
                .attrs
                .get(&AttrKind::Override)
                .filter(|a| !a.implicit)
                .map(|a| a.range);
            let has_required = self.ast.decl(d).attrs.has(&AttrKind::Required);
            match (override_attr, has_required) {
                (Some(range), true) => {
                    let attr_span = self.span_of(d, range);
                    self.report(DiagnosticKind::RequiredInitializerOverrideKeyword, attr_span)
                        .fix("remove 'override'", attr_span, "")
                        .emit();
                }
                (Some(range), false) => {
                    let attr_span = self.span_of(d, range);
                    self.report(DiagnosticKind::RequiredInitializerOverrideWrongKeyword, attr_span)
                        .fix("replace 'override' with 'required'", attr_span, "required")
                        .emit();
                    self.ast.decl_mut(d).attrs.add_implicit(AttrKind::Required);
                }
                (None, false) if !self.ast.decl(d).implicit => {
                    self.report(DiagnosticKind::RequiredInitializerMissingKeyword, span)
                        .fix("insert 'required'", start, "required ")
                        .emit();
                    self.ast.decl_mut(d).attrs.add_implicit(AttrKind::Required);
                }
                (None, false) => self.ast.decl_mut(d).attrs.add_implicit(AttrKind::Required),
                (None, true) => {}
            }
        }

        let failable = |c: Option<&crate::ast::ConstructorData>| {
            c.is_some_and(|c| c.failability != Failability::None)
        };
        if failable(self.ast.decl(d).as_ctor()) && !failable(self.ast.decl(base).as_ctor()) {
            let base_span = self.span(base);
            self.report(DiagnosticKind::FailableInitializerOverride, span)
                .related_to("non-failable initializer is here", base_span)
                .emit();
        }
    }

    /// Whether overriding `base` needs the `override` keyword: everything but
    /// convenience and required initializers.
    fn override_requires_keyword(&self, base: DeclId) -> bool {
        let decl = self.ast.decl(base);
        match decl.as_ctor() {
            Some(ctor) => ctor.kind == CtorKind::Designated && !decl.attrs.has(&AttrKind::Required),
            None => true,
        }
    }

    /// Storage compatibility, keyword and attribute checks, then the link.
    pub(super) fn record_override(&mut self, d: DeclId, base: DeclId) {
        let span = self.span(d);
        let base_span = self.span(base);
        if self.ast.decl(base).is_storage() && !self.check_storage_override(d, base) {
            return;
        }

        let base_in_ext = self.ast.decl(base).parent.is_extension_context();
        let decl_in_ext = self.ast.decl(d).parent.is_extension_context();
        if (base_in_ext || decl_in_ext) && !self.ast.decl(base).is_objc() {
            self.report(DiagnosticKind::OverrideDeclExtension, span)
                .related_to("overridden declaration is here", base_span)
                .emit();
            return;
        }

        if !self.ast.decl(d).attrs.has(&AttrKind::Override) && self.override_requires_keyword(base) {
            let fixable = self.ast.decl(d).as_var().is_none();
            let start = self.ast.decl(d).full_span().start();
            let mut diag = self.report(DiagnosticKind::MissingOverride, span);
            if fixable {
                diag = diag.fix("insert 'override'", start, "override ");
            }
            diag.related_to("overridden declaration is here", base_span)
                .emit();
            self.ast.decl_mut(d).attrs.add_implicit(AttrKind::Override);
        }

        if self.ast.decl(base).attrs.has(&AttrKind::Unavailable) {
            let message = format!("cannot override '{}' which has been marked unavailable", self.name(d));
            self.report(DiagnosticKind::OverrideUnavailable, span)
                .message(message)
                .emit();
        }

        self.check_attribute_overrides(d, base);
        self.link_override(d, base);

        if self.ast.decl(base).is_storage() {
            self.check_storage(base);
            if self
                .ast
                .decl(base)
                .storage()
                .is_some_and(|s| !s.has_accessor_functions())
            {
                self.add_trivial_accessors(base);
            }
            self.link_accessor_overrides(d);
        }
        debug!(decl = %self.name(d), base = %self.name(base), "override recorded");
    }

    fn link_override(&mut self, d: DeclId, base: DeclId) {
        self.ast.decl_mut(d).overridden = Some(base);
        let overriders = &mut self.ast.decl_mut(base).overriders;
        if !overriders.contains(&d) {
            overriders.push(d);
        }
    }

    /// Returns `false` when the storage cannot override `base`.
    fn check_storage_override(&mut self, d: DeclId, base: DeclId) -> bool {
        let span = self.span(d);
        let base_span = self.span(base);
        let name = self.name(d);
        let kind = self.ast.decl(d).storage().map(|s| s.kind);
        let stored = self.ast.decl(d).storage().is_some_and(|s| s.has_storage());

        if stored && kind != Some(StorageKind::Observing) {
            self.report(DiagnosticKind::OverrideWithStoredProperty, span)
                .message(format!("cannot override with a stored property '{name}'"))
                .related_to("overridden property is here", base_span)
                .emit();
            return false;
        }

        let mut base_settable = self.is_settable(base);
        if base_settable && self.config.enable_access_control {
            let dc = self.ast.decl(d).parent;
            base_settable = self.is_setter_accessible_from(base, dc);
        }
        if kind == Some(StorageKind::Observing) && !base_settable {
            self.report(DiagnosticKind::ObservingReadonlyProperty, span)
                .message(format!("cannot observe read-only property '{name}'; it can't change"))
                .related_to("overridden property is here", base_span)
                .emit();
            return false;
        }
        if base_settable && !self.is_settable(d) {
            self.report(DiagnosticKind::OverrideMutableWithReadonlyProperty, span)
                .related_to("overridden property is here", base_span)
                .emit();
            return false;
        }
        if self.ast.decl(base).as_var().is_some_and(|v| v.is_let) {
            self.report(DiagnosticKind::OverrideLetProperty, span)
                .message(format!(
                    "cannot override immutable 'let' property '{name}' with the getter of a 'var'"
                ))
                .related_to("overridden property is here", base_span)
                .emit();
            return false;
        }
        true
    }

    /// Attributes of `base` that constrain or propagate to `d`.
    fn check_attribute_overrides(&mut self, d: DeclId, base: DeclId) {
        let base_attrs: Vec<AttrKind> = self
            .ast
            .decl(base)
            .attrs
            .iter()
            .filter(|a| !a.invalid)
            .map(|a| a.kind.clone())
            .collect();
        let span = self.span(d);
        let base_span = self.span(base);

        for attr in base_attrs {
            match attr {
                AttrKind::Final => {
                    // Already reported against the storage.
                    let storage_base_final = self
                        .ast
                        .decl(d)
                        .accessor()
                        .and_then(|info| self.ast.decl(info.storage).overridden)
                        .is_some_and(|b| self.ast.decl(b).is_final());
                    if storage_base_final {
                        continue;
                    }
                    let what = self.ast.decl(d).descriptive_kind();
                    let base_what = self.ast.decl(base).descriptive_kind();
                    self.report(DiagnosticKind::OverrideFinal, span)
                        .message(format!("{what} overrides a 'final' {base_what}"))
                        .related_to("overridden declaration is here", base_span)
                        .emit();
                }
                AttrKind::NoReturn if !self.ast.decl(d).attrs.has(&AttrKind::NoReturn) => {
                    self.report(DiagnosticKind::OverrideNoReturnWithReturn, span)
                        .related_to("overridden declaration is here", base_span)
                        .emit();
                }
                AttrKind::ObjC(Some(name)) => self.inherit_objc_name(d, base, name),
                AttrKind::Dynamic => {
                    self.ast.decl_mut(d).attrs.add_implicit(AttrKind::Dynamic);
                }
                _ => {}
            }
        }
    }

    fn inherit_objc_name(&mut self, d: DeclId, base: DeclId, name: ObjCName) {
        let existing = self.ast.decl(d).attrs.objc().cloned();
        match existing {
            Some(attr) => {
                if let AttrKind::ObjC(Some(own)) = &attr.kind
                    && *own != name
                {
                    let message = format!(
                        "interop name '{}' differs from the name '{}' of the overridden declaration",
                        objc_name_text(own, &self.ast.interner),
                        objc_name_text(&name, &self.ast.interner)
                    );
                    let attr_span = self.span_of(d, attr.range);
                    let base_span = self.span(base);
                    self.report(DiagnosticKind::ObjCOverrideNameMismatch, attr_span)
                        .message(message)
                        .related_to("overridden declaration is here", base_span)
                        .emit();
                }
                if let Some(slot) = self.ast.decl_mut(d).attrs.get_mut(&AttrKind::ObjC(None)) {
                    slot.kind = AttrKind::ObjC(Some(name));
                }
            }
            None => self
                .ast
                .decl_mut(d)
                .attrs
                .add_implicit(AttrKind::ObjC(Some(name))),
        }
    }

    /// Link getter, setter and `materializeForSet` of storage `s` to the
    /// accessors of the storage it overrides.
    pub(super) fn link_accessor_overrides(&mut self, s: DeclId) {
        let Some(base) = self.ast.decl(s).overridden else {
            return;
        };
        for kind in [
            AccessorKind::Getter,
            AccessorKind::Setter,
            AccessorKind::MaterializeForSet,
        ] {
            let base_acc = self.ast.decl(base).storage().and_then(|st| st.accessors.get(kind));
            let own_acc = self.ast.decl(s).storage().and_then(|st| st.accessors.get(kind));
            let (Some(base_acc), Some(own_acc)) = (base_acc, own_acc) else {
                continue;
            };
            if self.ast.decl(own_acc).overridden.is_some() {
                continue;
            }
            if kind != AccessorKind::Getter && self.config.enable_access_control {
                let dc = self.ast.decl(s).parent;
                if !self.is_setter_accessible_from(base, dc) {
                    continue;
                }
            }
            self.ast.decl_mut(own_acc).attrs.add_implicit(AttrKind::Override);
            self.check_attribute_overrides(own_acc, base_acc);
            self.link_override(own_acc, base_acc);
        }
    }
}
