//! Redeclaration checking.

use kestrel_core::DeclName;
use tracing::debug;

use super::Elaborator;
use crate::ast::{DeclContext, DeclId, DeclKind};
use crate::collab::LookupOptions;
use crate::diagnostics::DiagnosticKind;
use crate::types::{TYPE_ERROR, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignatureClass {
    /// Functions, initializers, subscripts and enum cases overload by type.
    Function,
    Property,
    Type,
}

/// What two declarations must share to conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OverloadSignature {
    name: DeclName,
    class: SignatureClass,
    /// Canonical interface type; functions only.
    interface: Option<TypeId>,
    is_instance: bool,
}

impl OverloadSignature {
    fn conflicts_with(&self, other: &OverloadSignature) -> bool {
        if !self.names_conflict(other) {
            return false;
        }
        match (self.class, other.class) {
            (SignatureClass::Function, SignatureClass::Function) => {
                self.is_instance == other.is_instance && self.interface == other.interface
            }
            _ => true,
        }
    }

    /// A simple name only collides with a compound name that takes no arguments.
    fn names_conflict(&self, other: &OverloadSignature) -> bool {
        if self.name.base() != other.name.base() {
            return false;
        }
        match (self.name.arity(), other.name.arity()) {
            (None, None) => true,
            (None, Some(n)) | (Some(n), None) => n == 0,
            (Some(_), Some(_)) => self.name == other.name,
        }
    }
}

impl Elaborator {
    fn overload_signature(&mut self, d: DeclId) -> Option<OverloadSignature> {
        let class = match self.ast.decl(d).kind {
            DeclKind::Func(_)
            | DeclKind::Constructor(_)
            | DeclKind::Subscript(_)
            | DeclKind::EnumElement(_) => SignatureClass::Function,
            DeclKind::Var(_) => SignatureClass::Property,
            _ if self.ast.decl(d).is_type_decl() => SignatureClass::Type,
            _ => return None,
        };
        let interface = match class {
            SignatureClass::Function => {
                let ty = self.interface_type_of(d);
                Some(self.types.canonical(ty))
            }
            _ => None,
        };
        let decl = self.ast.decl(d);
        Some(OverloadSignature {
            name: decl.name.clone(),
            class,
            interface,
            is_instance: decl.parent.is_type_context() && !decl.is_static(),
        })
    }

    /// Diagnose `d` or an earlier declaration of the same signature in the
    /// same context.
    pub(super) fn check_redeclaration(&mut self, d: DeclId) {
        if std::mem::replace(&mut self.ast.decl_mut(d).state.redeclaration, true) {
            return;
        }
        let decl = self.ast.decl(d);
        if decl.invalid || decl.implicit || decl.is_accessor() {
            return;
        }
        let dc = decl.parent;
        if self.ast.is_local_context(dc) || self.ast.file_of_context(dc).is_none() {
            return;
        }

        let base = decl.name.base();
        let candidates = match self.ast.nominal_of(dc) {
            Some(nominal) if dc.is_type_context() => {
                let name = DeclName::simple(base);
                self.lookup.lookup_member(
                    &self.ast,
                    &self.types,
                    nominal,
                    &name,
                    LookupOptions::direct(),
                )
            }
            _ => self.lookup.lookup_unqualified(&self.ast, DeclContext::Module, base),
        };

        let Some(signature) = self.overload_signature(d) else {
            return;
        };
        for other in candidates {
            if other == d || self.is_invalid(other) {
                continue;
            }
            if dc.is_type_context() != self.ast.decl(other).parent.is_type_context() {
                continue;
            }
            if self.ast.decl(other).is_accessor() {
                continue;
            }
            self.validate_decl(other);
            if self.is_invalid(other) {
                continue;
            }
            let Some(other_signature) = self.overload_signature(other) else {
                continue;
            };
            if !signature.conflicts_with(&other_signature) {
                continue;
            }

            let (current, previous) = {
                let a = self.ast.decl(d);
                let b = self.ast.decl(other);
                if a.file == b.file && a.name_range.start() < b.name_range.start() {
                    (other, d)
                } else {
                    (d, other)
                }
            };
            let shown = self.name(current);
            let span = self.span(current);
            let previous_span = self.span(previous);
            let previous_name = self.name(previous);
            self.report(DiagnosticKind::InvalidRedecl, span)
                .message(shown)
                .related_to(format!("'{previous_name}' previously declared here"), previous_span)
                .emit();
            let decl = self.ast.decl_mut(current);
            decl.invalid = true;
            if decl.ty.is_some() {
                decl.ty = Some(TYPE_ERROR);
                decl.interface_ty = Some(TYPE_ERROR);
            }
            debug!(redeclared = %self.name(current), "invalid redeclaration");
            break;
        }
    }
}
