//! Type-access consistency: a declaration may not expose a type that is
//! less accessible than itself.

use rowan::TextRange;
use tracing::debug;

use super::Elaborator;
use crate::ast::{
    Accessibility, DeclId, DeclKind, Pattern, PatternKind, RequirementKind,
    TypeLoc, TypeReprKind,
};
use crate::diagnostics::DiagnosticKind;
use crate::types::{TypeId, TypeShape};

/// Least accessible part found while checking one declaration.
#[derive(Debug, Clone, Copy)]
struct Violation<T> {
    access: Accessibility,
    /// Written component naming the offending type, and its declaration.
    component: Option<(TextRange, DeclId)>,
    detail: T,
}

/// Keep the most restrictive violation.
fn record<T>(slot: &mut Option<Violation<T>>, found: Violation<T>) {
    if slot.as_ref().is_none_or(|v| found.access < v.access) {
        *slot = Some(found);
    }
}

/// `an internal`, `a private`.
fn article(level: Accessibility) -> String {
    match level {
        Accessibility::Internal => "an internal".to_string(),
        _ => format!("a {level}"),
    }
}

/// `cannot be declared public` for explicit levels, else `must be declared internal`.
fn phrase(explicit: bool, access: Accessibility, type_access: Accessibility) -> String {
    if explicit {
        format!("cannot be declared {access}")
    } else {
        format!("must be declared {type_access}")
    }
}

enum PatternItem {
    Typed {
        range: TextRange,
        annotation: TypeLoc,
        var: DeclId,
    },
    Named {
        range: TextRange,
        var: DeclId,
    },
}

fn pattern_items(pattern: &Pattern, seen: &mut Vec<DeclId>, out: &mut Vec<PatternItem>) {
    match &pattern.kind {
        PatternKind::Named(var) => {
            if !seen.contains(var) {
                out.push(PatternItem::Named {
                    range: pattern.range,
                    var: *var,
                });
            }
        }
        PatternKind::Typed { sub, annotation } => {
            let vars = sub.bound_vars();
            if let Some(&var) = vars.first() {
                seen.extend(vars.iter().copied());
                out.push(PatternItem::Typed {
                    range: pattern.range,
                    annotation: annotation.clone(),
                    var,
                });
            }
            pattern_items(sub, seen, out);
        }
        PatternKind::Tuple(elements) => {
            for e in elements {
                pattern_items(e, seen, out);
            }
        }
        PatternKind::Paren(sub) | PatternKind::Var(sub) => pattern_items(sub, seen, out),
        PatternKind::Any => {}
    }
}

impl Elaborator {
    /// Minimum accessibility over the nominal and alias references in `ty`.
    pub(super) fn type_accessibility(&mut self, ty: TypeId) -> Accessibility {
        if let Some(&cached) = self.access_cache.get(&ty) {
            return cached;
        }
        let mut referenced = Vec::new();
        self.types.walk(ty, &mut |shape| match *shape {
            TypeShape::Alias { decl, .. }
            | TypeShape::Nominal { decl, .. }
            | TypeShape::UnboundGeneric { decl, .. } => referenced.push(decl),
            _ => {}
        });
        let access = referenced
            .into_iter()
            .map(|d| self.accessibility_of(d))
            .min()
            .unwrap_or(Accessibility::Public);
        self.access_cache.insert(ty, access);
        access
    }

    /// Least accessible written component of `loc`.
    fn offending_component(&mut self, loc: &TypeLoc) -> Option<(TextRange, DeclId)> {
        let repr = loc.repr.as_ref()?;
        let mut components = Vec::new();
        repr.walk(&mut |r| {
            if let TypeReprKind::Ident(idents) = &r.kind {
                components.extend(idents.iter().filter_map(|c| Some((c.range, c.bound?))));
            }
        });
        let mut best: Option<(TextRange, DeclId, Accessibility)> = None;
        for (range, decl) in components {
            let access = self.accessibility_of(decl);
            if best.is_none_or(|(_, _, min)| access < min) {
                best = Some((range, decl, access));
            }
        }
        best.map(|(range, decl, _)| (range, decl))
    }

    /// Check one annotation against `access`, recording a violation.
    fn check_type_loc<T>(
        &mut self,
        loc: &TypeLoc,
        access: Accessibility,
        detail: T,
        slot: &mut Option<Violation<T>>,
    ) {
        if access == Accessibility::Private {
            return;
        }
        let Some(ty) = loc.ty else {
            return;
        };
        let type_access = self.type_accessibility(ty);
        if type_access >= access {
            return;
        }
        let component = self.offending_component(loc);
        record(
            slot,
            Violation {
                access: type_access,
                component,
                detail,
            },
        );
    }

    fn emit_access_violation<T>(
        &mut self,
        owner: DeclId,
        kind: DiagnosticKind,
        range: TextRange,
        message: String,
        violation: &Violation<T>,
    ) {
        debug!(decl = %self.name(owner), ?kind, "type access violation");
        let span = self.span_of(owner, range);
        let related = violation
            .component
            .map(|(component, decl)| (crate::ast::Span::new(span.file, component), self.ast.decl(decl).span()));
        let mut diag = self.report(kind, span).message(message);
        if let Some((highlight, declared)) = related {
            diag = diag
                .highlight(highlight)
                .related_to("type declared here", declared);
        }
        diag.emit();
    }

    fn has_explicit_access(&self, d: DeclId) -> bool {
        self.ast.decl(d).attrs.accessibility().is_some()
            || self.ast.is_protocol_context(self.ast.decl(d).parent)
    }

    /// Check that the signature of `d` only uses sufficiently accessible types.
    pub(super) fn check_access(&mut self, d: DeclId) {
        let decl = self.ast.decl(d);
        if decl.invalid || decl.implicit {
            return;
        }
        match &decl.kind {
            DeclKind::PatternBinding(_) => self.check_binding_access(d),
            DeclKind::TypeAlias(_) => self.check_alias_access(d),
            DeclKind::AssociatedType(_) => self.check_associated_type_access(d),
            DeclKind::Enum(_) | DeclKind::Struct(_) | DeclKind::Class(_) => {
                self.check_generic_param_access(d);
                self.check_base_access(d);
            }
            DeclKind::Protocol(_) => self.check_protocol_access(d),
            DeclKind::Subscript(_) => self.check_subscript_access(d),
            DeclKind::Func(f) if f.accessor.is_some() => {}
            DeclKind::Func(_) | DeclKind::Constructor(_) => {
                self.check_generic_param_access(d);
                self.check_function_access(d);
            }
            DeclKind::EnumElement(_) => self.check_element_access(d),
            _ => {}
        }
    }

    fn check_binding_access(&mut self, d: DeclId) {
        let Some(binding) = self.ast.decl(d).as_binding() else {
            return;
        };
        let in_type = self.ast.decl(d).parent.is_type_context();
        let mut items = Vec::new();
        pattern_items(&binding.pattern, &mut Vec::new(), &mut items);

        for item in items {
            let (range, var, loc, inferred) = match item {
                PatternItem::Typed {
                    range,
                    annotation,
                    var,
                } => (range, var, annotation, false),
                PatternItem::Named { range, var } => {
                    let Some(ty) = self.ast.decl(var).ty else {
                        continue;
                    };
                    (range, var, TypeLoc::without_loc(ty), true)
                }
            };
            if self.is_invalid(var) {
                continue;
            }
            let access = self.accessibility_of(var);
            let mut violation = None;
            self.check_type_loc(&loc, access, (), &mut violation);
            let Some(violation) = violation else {
                continue;
            };

            let noun = match (in_type, self.ast.decl(var).as_var().is_some_and(|v| v.is_let)) {
                (true, _) => "property",
                (false, true) => "constant",
                (false, false) => "variable",
            };
            let explicit = self.has_explicit_access(var);
            let wording = phrase(explicit, access, violation.access);
            let (kind, message) = if inferred {
                let shown = loc.ty.map(|t| self.display(t)).unwrap_or_default();
                (
                    DiagnosticKind::PatternTypeAccessInferred,
                    format!(
                        "{noun} {wording} because its type '{shown}' uses {} type",
                        article(violation.access)
                    ),
                )
            } else {
                (
                    DiagnosticKind::PatternTypeAccess,
                    format!(
                        "{noun} {wording} because its type uses {} type",
                        article(violation.access)
                    ),
                )
            };
            self.emit_access_violation(d, kind, range, message, &violation);
        }
    }

    fn check_alias_access(&mut self, d: DeclId) {
        let DeclKind::TypeAlias(alias) = &self.ast.decl(d).kind else {
            return;
        };
        let loc = alias.underlying.clone();
        let access = self.accessibility_of(d);
        let mut violation = None;
        self.check_type_loc(&loc, access, (), &mut violation);
        if let Some(v) = violation {
            let message = format!(
                "type alias {} because its underlying type uses {} type",
                phrase(self.has_explicit_access(d), access, v.access),
                article(v.access)
            );
            let range = self.ast.decl(d).name_range;
            self.emit_access_violation(d, DiagnosticKind::TypeAliasUnderlyingTypeAccess, range, message, &v);
        }
    }

    fn check_associated_type_access(&mut self, d: DeclId) {
        let Some(data) = self.ast.decl(d).as_type_param() else {
            return;
        };
        let inherited = data.inherited.clone();
        let default = data.default.clone();
        let access = self.accessibility_of(d);
        let mut violation = None;
        for loc in &inherited {
            self.check_type_loc(loc, access, "requirement", &mut violation);
        }
        if let Some(loc) = &default {
            self.check_type_loc(loc, access, "default definition", &mut violation);
        }
        if let Some(v) = violation {
            let message = format!(
                "associated type in {} protocol uses {} type in its {}",
                article(access),
                article(v.access),
                v.detail
            );
            let range = self.ast.decl(d).name_range;
            self.emit_access_violation(d, DiagnosticKind::AssociatedTypeAccess, range, message, &v);
        }
    }

    /// Superclass of a class or raw type of an enum.
    fn check_base_access(&mut self, d: DeclId) {
        let (base, kind, what) = match &self.ast.decl(d).kind {
            DeclKind::Class(n) => (n.superclass, DiagnosticKind::ClassSuperAccess, "class"),
            DeclKind::Enum(n) => (n.raw_type, DiagnosticKind::EnumRawTypeAccess, "enum"),
            _ => return,
        };
        let Some(base) = base else {
            return;
        };
        let Some(loc) = self
            .ast
            .decl(d)
            .inherited()
            .iter()
            .find(|loc| loc.ty == Some(base))
            .cloned()
        else {
            return;
        };
        let access = self.accessibility_of(d);
        let mut violation = None;
        self.check_type_loc(&loc, access, (), &mut violation);
        if let Some(v) = violation {
            let wording = phrase(self.has_explicit_access(d), access, v.access);
            let message = if kind == DiagnosticKind::ClassSuperAccess {
                format!("{what} {wording} because its superclass is {}", v.access)
            } else {
                format!(
                    "{what} {wording} because its raw type uses {} type",
                    article(v.access)
                )
            };
            let range = self.ast.decl(d).name_range;
            self.emit_access_violation(d, kind, range, message, &v);
        }
    }

    fn check_protocol_access(&mut self, d: DeclId) {
        let inherited = self.ast.decl(d).inherited().to_vec();
        let access = self.accessibility_of(d);
        let mut violation = None;
        for loc in &inherited {
            self.check_type_loc(loc, access, (), &mut violation);
        }
        if let Some(v) = violation {
            let message = format!(
                "protocol {} because it refines {} protocol",
                phrase(self.has_explicit_access(d), access, v.access),
                article(v.access)
            );
            let range = self.ast.decl(d).name_range;
            self.emit_access_violation(d, DiagnosticKind::ProtocolRefineAccess, range, message, &v);
        }
    }

    fn param_annotations(&self, params: &[DeclId]) -> Vec<TypeLoc> {
        params
            .iter()
            .filter_map(|&p| self.ast.decl(p).as_param())
            .map(|p| p.annotation.clone())
            .filter(|loc| loc.repr.is_some())
            .collect()
    }

    fn check_subscript_access(&mut self, d: DeclId) {
        let DeclKind::Subscript(s) = &self.ast.decl(d).kind else {
            return;
        };
        let element = s.element.clone();
        let indices = self.param_annotations(&s.indices.clone());
        let access = self.accessibility_of(d);
        let mut violation = None;
        for loc in &indices {
            self.check_type_loc(loc, access, "index", &mut violation);
        }
        self.check_type_loc(&element, access, "element type", &mut violation);
        if let Some(v) = violation {
            let message = format!(
                "subscript {} because its {} uses {} type",
                phrase(self.has_explicit_access(d), access, v.access),
                v.detail,
                article(v.access)
            );
            let range = self.ast.decl(d).name_range;
            self.emit_access_violation(d, DiagnosticKind::SubscriptTypeAccess, range, message, &v);
        }
    }

    fn check_function_access(&mut self, d: DeclId) {
        let decl = self.ast.decl(d);
        let params = self.param_annotations(decl.params());
        let result = decl.as_func().map(|f| f.result.clone());
        let noun = match &decl.kind {
            DeclKind::Constructor(_) => "initializer",
            _ if decl.parent.is_type_context() => "method",
            _ => "function",
        };
        let access = self.accessibility_of(d);
        let mut violation = None;
        for loc in &params {
            self.check_type_loc(loc, access, "parameter", &mut violation);
        }
        if let Some(loc) = &result {
            self.check_type_loc(loc, access, "result", &mut violation);
        }
        let Some(v) = violation else {
            return;
        };
        let message = format!(
            "{noun} {} because its {} uses {} type",
            phrase(self.has_explicit_access(d), access, v.access),
            v.detail,
            article(v.access)
        );
        let range = self.ast.decl(d).name_range;
        self.emit_access_violation(d, DiagnosticKind::FunctionTypeAccess, range, message, &v);
        // Types stay assigned; only the declaration is poisoned.
        self.ast.decl_mut(d).invalid = true;
    }

    fn check_element_access(&mut self, d: DeclId) {
        let Some(argument) = self.ast.decl(d).as_element().and_then(|e| e.argument.clone()) else {
            return;
        };
        let access = self.accessibility_of(d);
        let mut violation = None;
        self.check_type_loc(&argument, access, (), &mut violation);
        if let Some(v) = violation {
            let message = format!(
                "enum case in {} enum uses {} type",
                article(access),
                article(v.access)
            );
            let range = self.ast.decl(d).name_range;
            self.emit_access_violation(d, DiagnosticKind::EnumCaseAccess, range, message, &v);
        }
    }

    fn check_generic_param_access(&mut self, owner: DeclId) {
        let Some(list) = self.ast.decl(owner).generic_params() else {
            return;
        };
        let params = list.params.clone();
        let requirements = list.requirements.clone();
        let access = self.accessibility_of(owner);
        let mut violation = None;
        for p in params {
            let inherited = self.ast.decl(p).inherited().to_vec();
            for loc in &inherited {
                self.check_type_loc(loc, access, "parameter", &mut violation);
            }
        }
        for req in requirements.iter().filter(|r| !r.invalid) {
            let (a, b) = match &req.kind {
                RequirementKind::Conformance {
                    subject,
                    constraint,
                } => (subject, constraint),
                RequirementKind::SameType { first, second } => (first, second),
            };
            self.check_type_loc(a, access, "requirement", &mut violation);
            self.check_type_loc(b, access, "requirement", &mut violation);
        }
        if let Some(v) = violation {
            let message = format!(
                "{} {} because its generic {} uses {} type",
                self.ast.decl(owner).descriptive_kind(),
                phrase(self.has_explicit_access(owner), access, v.access),
                v.detail,
                article(v.access)
            );
            let range = self.ast.decl(owner).name_range;
            self.emit_access_violation(owner, DiagnosticKind::GenericParamAccess, range, message, &v);
        }
    }
}
