//! Attribute validation against the declaration they are written on.

use tracing::trace;

use super::Elaborator;
use crate::ast::{
    AccessorKind, AttrKind, Attribute, DeclContext, DeclId, DeclKind, ObjCName, StorageKind,
};
use crate::diagnostics::DiagnosticKind;
use crate::state::Entry;

impl Elaborator {
    /// Check the attributes of `d` once, invalidating the ones that do not apply.
    pub(super) fn validate_attributes(&mut self, d: DeclId) {
        if self.ast.decl_mut(d).state.attributes.enter() != Entry::Fresh {
            return;
        }
        trace!(decl = %self.name(d), "validate attributes");

        self.check_attribute_targets(d);
        self.check_attribute_conflicts(d);
        if self.ast.decl(d).as_var().is_some() {
            self.check_storage_attributes(d);
        }
        if self.ast.decl(d).as_func().is_some() {
            self.check_mutating(d);
        }
        self.check_objc(d);
        self.check_protocol_member_attributes(d);

        self.ast.decl_mut(d).state.attributes.finish();
    }

    fn written_attrs(&self, d: DeclId) -> Vec<Attribute> {
        self.ast
            .decl(d)
            .attrs
            .iter()
            .filter(|a| !a.implicit && !a.invalid)
            .cloned()
            .collect()
    }

    /// Report `attr` with a removal fix-it and invalidate it.
    fn reject_attr(&mut self, d: DeclId, kind: DiagnosticKind, attr: &Attribute, message: Option<String>) {
        let span = self.span_of(d, attr.range);
        let mut diag = self.report(kind, span);
        if let Some(message) = message {
            diag = diag.message(message);
        }
        diag.fix(format!("remove '{}'", attr.kind.spelling()), span, "")
            .emit();
        self.ast.decl_mut(d).attrs.invalidate(&attr.kind);
    }

    /// Span of a written attribute, or of the declaration name.
    fn attr_span(&self, d: DeclId, kind: &AttrKind) -> crate::ast::Span {
        match self.ast.decl(d).attrs.range_of(kind) {
            Some(range) => self.span_of(d, range),
            None => self.span(d),
        }
    }

    fn check_attribute_targets(&mut self, d: DeclId) {
        for attr in self.written_attrs(d) {
            if attr.kind.allowed_on(&self.ast.decl(d).kind) {
                continue;
            }
            let message = format!(
                "'{}' cannot be applied to this {}",
                attr.kind.spelling().trim_start_matches('@'),
                self.ast.decl(d).descriptive_kind()
            );
            self.reject_attr(d, DiagnosticKind::AttributeNotAllowed, &attr, Some(message));
        }
    }

    fn check_attribute_conflicts(&mut self, d: DeclId) {
        let attrs = &self.ast.decl(d).attrs;
        if attrs.is_final() && attrs.is_dynamic() {
            let span = self.attr_span(d, &AttrKind::Dynamic);
            self.report(DiagnosticKind::ConflictingAttributes, span)
                .message("a declaration cannot be both 'final' and 'dynamic'")
                .emit();
            self.ast.decl_mut(d).attrs.invalidate(&AttrKind::Dynamic);
        }

        let attrs = &self.ast.decl(d).attrs;
        if attrs.has(&AttrKind::Mutating) && attrs.has(&AttrKind::NonMutating) {
            let span = self.attr_span(d, &AttrKind::NonMutating);
            self.report(DiagnosticKind::ConflictingAttributes, span)
                .message("method may not be declared both mutating and nonmutating")
                .emit();
            self.ast.decl_mut(d).attrs.invalidate(&AttrKind::NonMutating);
        }

        let fixities: Vec<Attribute> = self
            .written_attrs(d)
            .into_iter()
            .filter(|a| matches!(a.kind, AttrKind::Prefix | AttrKind::Postfix | AttrKind::Infix))
            .collect();
        if let [first, rest @ ..] = fixities.as_slice() {
            for attr in rest {
                let message = format!(
                    "'{}' contradicts previous modifier '{}'",
                    attr.kind.spelling(),
                    first.kind.spelling()
                );
                self.reject_attr(d, DiagnosticKind::ConflictingAttributes, attr, Some(message));
            }
        }
    }

    /// `lazy`, `@managed` and `@copying`.
    fn check_storage_attributes(&mut self, d: DeclId) {
        let decl = self.ast.decl(d);
        let Some(var) = decl.as_var() else {
            return;
        };
        let is_let = var.is_let;
        let is_static = var.is_static;
        let kind = var.storage.kind;
        let has_init = var
            .binding
            .and_then(|b| self.ast.decl(b).as_binding())
            .is_some_and(|b| b.init.is_some());
        let in_class = self.ast.is_class_context(decl.parent);

        if let Some(lazy) = decl.attrs.get(&AttrKind::Lazy).cloned() {
            let problem = if is_let {
                Some(DiagnosticKind::LazyOnLet)
            } else if matches!(kind, StorageKind::Computed | StorageKind::Observing) {
                Some(DiagnosticKind::LazyOnComputed)
            } else if is_static {
                Some(DiagnosticKind::LazyOnStatic)
            } else if !has_init {
                Some(DiagnosticKind::LazyRequiresInitializer)
            } else {
                None
            };
            if let Some(kind) = problem {
                self.reject_attr(d, kind, &lazy, None);
            }
        }

        if let Some(managed) = self.ast.decl(d).attrs.get(&AttrKind::Managed).cloned()
            && !in_class
        {
            self.reject_attr(d, DiagnosticKind::ManagedOutsideClass, &managed, None);
        }

        if let Some(copying) = self.ast.decl(d).attrs.get(&AttrKind::CopyOnAssign).cloned() {
            if is_let {
                self.reject_attr(d, DiagnosticKind::CopyOnAssignOnLet, &copying, None);
            } else if !in_class {
                self.reject_attr(d, DiagnosticKind::CopyOnAssignOutsideClass, &copying, None);
            }
        }
    }

    fn check_mutating(&mut self, d: DeclId) {
        let parent = self.ast.decl(d).parent;
        let value_or_protocol =
            self.ast.is_value_type_context(parent) || self.ast.is_protocol_context(parent);
        for kind in [AttrKind::Mutating, AttrKind::NonMutating] {
            if value_or_protocol {
                continue;
            }
            let Some(attr) = self.ast.decl(d).attrs.get(&kind).filter(|a| !a.implicit).cloned()
            else {
                continue;
            };
            self.reject_attr(d, DiagnosticKind::MutatingInvalidContext, &attr, None);
            if let Some(f) = self.ast.decl_mut(d).as_func_mut() {
                f.is_mutating = false;
            }
        }
    }

    /// Containers whose members may be `@objc`.
    fn objc_member_context(&self, dc: DeclContext) -> bool {
        self.ast.nominal_of(dc).is_some_and(|n| {
            let n = self.ast.decl(n);
            n.is_class() || (n.is_protocol() && n.is_objc())
        })
    }

    fn check_objc(&mut self, d: DeclId) {
        let decl = self.ast.decl(d);
        let parent = decl.parent;

        // Members of @objc protocols are @objc.
        if decl.attrs.objc().is_none()
            && self.ast.is_protocol_context(parent)
            && self.ast.nominal_of(parent).is_some_and(|p| self.ast.decl(p).is_objc())
            && matches!(decl.kind, DeclKind::Var(_) | DeclKind::Subscript(_) | DeclKind::Func(_) | DeclKind::Constructor(_))
            && !decl.is_accessor()
        {
            self.ast.decl_mut(d).attrs.add_implicit(AttrKind::ObjC(None));
            return;
        }

        let Some(attr) = decl.attrs.objc().filter(|a| !a.implicit).cloned() else {
            return;
        };

        let problem = match &decl.kind {
            DeclKind::Class(_) | DeclKind::Protocol(_) => None,
            DeclKind::Destructor(_) if self.ast.is_class_context(parent) => None,
            DeclKind::Func(f) if f.operator.is_some() => {
                Some("@objc cannot be applied to an operator".to_string())
            }
            DeclKind::Func(f) => match f.accessor {
                Some(info) if matches!(info.kind, AccessorKind::WillSet | AccessorKind::DidSet) => {
                    Some("observing accessors cannot be @objc".to_string())
                }
                Some(info) if !self.ast.decl(info.storage).is_objc() => Some(
                    "@objc getters and setters require @objc storage".to_string(),
                ),
                _ if !self.objc_member_context(parent) => Some(
                    "@objc can only be used with members of classes and @objc protocols"
                        .to_string(),
                ),
                _ => None,
            },
            DeclKind::Var(_) | DeclKind::Subscript(_) | DeclKind::Constructor(_)
                if !self.objc_member_context(parent) =>
            {
                Some(
                    "@objc can only be used with members of classes and @objc protocols"
                        .to_string(),
                )
            }
            DeclKind::Var(_) | DeclKind::Subscript(_) | DeclKind::Constructor(_) => None,
            _ => Some(format!(
                "only classes, protocols and their members can be @objc, not this {}",
                decl.descriptive_kind()
            )),
        };
        if let Some(message) = problem {
            self.reject_attr(d, DiagnosticKind::InvalidObjCDecl, &attr, Some(message));
            return;
        }

        self.check_objc_name(d, &attr);
    }

    fn check_objc_name(&mut self, d: DeclId, attr: &Attribute) {
        let AttrKind::ObjC(Some(name)) = &attr.kind else {
            return;
        };
        let span = self.span_of(d, attr.range);
        let decl = self.ast.decl(d);
        let named_entity = matches!(
            decl.kind,
            DeclKind::Class(_) | DeclKind::Protocol(_) | DeclKind::Var(_)
        );
        let is_subscript = matches!(decl.kind, DeclKind::Subscript(_));
        let is_function = matches!(decl.kind, DeclKind::Func(_) | DeclKind::Constructor(_));
        let params = decl.params().len();
        let what = decl.descriptive_kind();

        let replacement = if named_entity && !name.is_nullary() {
            self.report(DiagnosticKind::ObjCNameReqNullary, span).emit();
            name.pieces.first().map(|&piece| Some(ObjCName::nullary(piece)))
        } else if is_subscript {
            self.report(DiagnosticKind::ObjCNameSubscript, span).emit();
            Some(None)
        } else if is_function && name.num_args != params {
            let message = format!(
                "@objc name provides {} argument {}, but the {} has {} {}",
                name.num_args,
                if name.num_args == 1 { "name" } else { "names" },
                what,
                params,
                if params == 1 { "parameter" } else { "parameters" }
            );
            self.report(DiagnosticKind::ObjCNameFuncMismatch, span)
                .message(message)
                .emit();
            Some(None)
        } else {
            None
        };
        if let Some(fixed) = replacement
            && let Some(slot) = self.ast.decl_mut(d).attrs.get_mut(&AttrKind::ObjC(None))
        {
            slot.kind = AttrKind::ObjC(fixed);
        }
    }

    /// `optional` and `@unavailable` on protocol members.
    fn check_protocol_member_attributes(&mut self, d: DeclId) {
        let parent = self.ast.decl(d).parent;
        let in_protocol = self.ast.is_protocol_context(parent);
        let objc_protocol = in_protocol
            && self
                .ast
                .nominal_of(parent)
                .is_some_and(|p| self.ast.decl(p).is_objc());

        if let Some(optional) = self.ast.decl(d).attrs.get(&AttrKind::Optional).cloned() {
            let problem = if !in_protocol {
                Some(DiagnosticKind::OptionalAttributeNonProtocol)
            } else if !objc_protocol {
                Some(DiagnosticKind::OptionalAttributeNonObjCProtocol)
            } else if matches!(self.ast.decl(d).kind, DeclKind::Constructor(_)) {
                Some(DiagnosticKind::OptionalAttributeInitializer)
            } else {
                None
            };
            if let Some(kind) = problem {
                self.reject_attr(d, kind, &optional, None);
            }
        }

        if in_protocol
            && !objc_protocol
            && let Some(unavailable) = self
                .ast
                .decl(d)
                .attrs
                .get(&AttrKind::Unavailable)
                .filter(|a| !a.implicit)
                .cloned()
        {
            self.reject_attr(d, DiagnosticKind::UnavailableMethodNonObjCProtocol, &unavailable, None);
        }
    }
}
