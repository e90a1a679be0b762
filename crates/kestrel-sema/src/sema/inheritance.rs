//! Inheritance clause resolution.
//!
//! Splits a written inheritance clause into a protocol set plus an
//! optional superclass (classes, generic parameters, associated types) or
//! raw type (enums).

use std::collections::HashMap;

use indexmap::IndexSet;
use rowan::TextRange;
use tracing::{debug, trace};

use super::{Elaborator, ResolveMode};
use crate::ast::{DeclContext, DeclId, DeclKind, Span, TypeLoc};
use crate::diagnostics::DiagnosticKind;
use crate::state::Entry;
use crate::types::{TYPE_ERROR, TypeId};

/// Why an inheritance clause entry was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InheritanceError {
    #[error("type is inherited more than once")]
    Duplicate,

    #[error("more than one superclass or raw type")]
    MultipleSuperclasses,

    #[error("superclass or raw type is not the first entry")]
    SuperclassNotFirst,

    #[error("type cannot be inherited from")]
    NonInheritableType,

    #[error("dynamic class constraint on a concrete type")]
    DynamicConstraintInInheritance,
}

/// What the declaration owning a clause may inherit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
    Class,
    Enum,
    /// Generic parameters and associated types.
    TypeParam,
    Protocol,
    Struct,
    Extension,
}

impl Subject {
    fn of(kind: &DeclKind) -> Option<Self> {
        Some(match kind {
            DeclKind::Class(_) => Subject::Class,
            DeclKind::Enum(_) => Subject::Enum,
            DeclKind::Struct(_) => Subject::Struct,
            DeclKind::Protocol(_) => Subject::Protocol,
            DeclKind::GenericParam(_) | DeclKind::AssociatedType(_) => Subject::TypeParam,
            DeclKind::Extension(_) => Subject::Extension,
            _ => return None,
        })
    }

    fn can_have_superclass(self) -> bool {
        matches!(self, Subject::Class | Subject::TypeParam)
    }
}

/// Outcome of classifying one clause entry.
enum Classified {
    Protocols(Vec<DeclId>),
    /// Superclass or raw type, with whether it was written first.
    Base { ty: TypeId, first: bool },
}

#[derive(Default)]
struct Clause {
    protocols: IndexSet<DeclId>,
    base: Option<TypeId>,
}

impl Elaborator {
    /// Resolve the inheritance clause of `d` once.
    ///
    /// Re-entrant calls return with whatever was recorded so far.
    pub(super) fn resolve_inheritance(&mut self, d: DeclId) {
        let Some(subject) = Subject::of(&self.ast.decl(d).kind) else {
            return;
        };
        if self.ast.decl_mut(d).state.inheritance.enter() != Entry::Fresh {
            return;
        }
        trace!(decl = %self.name(d), "resolve inheritance clause");

        let dc = self.ast.context_of(d).unwrap_or(self.ast.decl(d).parent);
        let mut entries = self.ast.decl(d).inherited().to_vec();
        let clause = self.classify_clause(d, subject, dc, &mut entries);
        if let Some(slot) = self.ast.decl_mut(d).inherited_mut() {
            *slot = entries;
        }
        self.record_clause(d, subject, clause);

        self.ast.decl_mut(d).state.inheritance.finish();

        if subject == Subject::Class {
            self.finish_superclass(d);
        }
    }

    fn classify_clause(
        &mut self,
        d: DeclId,
        subject: Subject,
        dc: DeclContext,
        entries: &mut [TypeLoc],
    ) -> Clause {
        let mut clause = Clause::default();
        let mut seen: HashMap<TypeId, usize> = HashMap::new();

        for i in 0..entries.len() {
            let ty = self.resolve_type_loc(&mut entries[i], dc, ResolveMode::Interface);
            if self.types.is_error(ty) {
                continue;
            }
            let canonical = self.types.canonical(ty);
            let outcome = match seen.get(&canonical) {
                Some(&prev) => Err((InheritanceError::Duplicate, Some(prev))),
                None => {
                    seen.insert(canonical, i);
                    self.classify_entry(d, subject, ty, i, clause.base)
                        .map_err(|e| (e, None))
                }
            };
            match outcome {
                Ok(Classified::Protocols(protocols)) => clause.protocols.extend(protocols),
                Ok(Classified::Base { ty, first }) => {
                    if !first {
                        let err = InheritanceError::SuperclassNotFirst;
                        self.report_inheritance_error(d, subject, err, entries, i, None, clause.base);
                    }
                    clause.base = Some(ty);
                }
                Err((err, prev)) => {
                    self.report_inheritance_error(d, subject, err, entries, i, prev, clause.base);
                    entries[i].invalid = true;
                }
            }
        }
        clause
    }

    fn classify_entry(
        &mut self,
        d: DeclId,
        subject: Subject,
        ty: TypeId,
        index: usize,
        base: Option<TypeId>,
    ) -> Result<Classified, InheritanceError> {
        if self.types.is_existential(ty) {
            let protocols = self.types.existential_protocols(ty);
            let concrete = !matches!(subject, Subject::Protocol | Subject::TypeParam);
            if concrete
                && !self.ast.decl(d).implicit
                && self.known.any_object.is_some_and(|any| protocols.contains(&any))
            {
                return Err(InheritanceError::DynamicConstraintInInheritance);
            }
            return Ok(Classified::Protocols(protocols));
        }

        let is_base = match subject {
            Subject::Enum => true,
            _ => self.types.is_class(ty) && subject.can_have_superclass(),
        };
        if !is_base {
            return Err(InheritanceError::NonInheritableType);
        }
        if base.is_some() {
            return Err(InheritanceError::MultipleSuperclasses);
        }
        Ok(Classified::Base {
            ty,
            first: index == 0,
        })
    }

    fn entry_span(&self, d: DeclId, entries: &[TypeLoc], i: usize) -> Span {
        let range = entries[i].range().unwrap_or(self.ast.decl(d).name_range);
        self.span_of(d, range)
    }

    /// Span from the end of the entry before `i` to the end of entry `i`.
    fn removal_span(&self, d: DeclId, entries: &[TypeLoc], i: usize) -> Option<Span> {
        let this = entries[i].range()?;
        let prev = entries[..i].iter().rev().find_map(TypeLoc::range)?;
        Some(self.span_of(d, TextRange::new(prev.end(), this.end())))
    }

    #[allow(clippy::too_many_arguments)]
    fn report_inheritance_error(
        &mut self,
        d: DeclId,
        subject: Subject,
        err: InheritanceError,
        entries: &[TypeLoc],
        i: usize,
        prev: Option<usize>,
        base: Option<TypeId>,
    ) {
        let span = self.entry_span(d, entries, i);
        let ty = entries[i].ty.unwrap_or(TYPE_ERROR);
        let shown = self.display(ty);
        debug!(decl = %self.name(d), entry = %shown, error = %err, "inheritance entry rejected");

        match err {
            InheritanceError::Duplicate => {
                let removal = self.removal_span(d, entries, i);
                let earlier = prev.map(|p| self.entry_span(d, entries, p));
                let mut diag = self
                    .report(DiagnosticKind::DuplicateInheritance, span)
                    .message(shown);
                if let Some(removal) = removal {
                    diag = diag.fix("remove duplicate", removal, "");
                }
                if let Some(earlier) = earlier {
                    diag = diag.highlight(earlier);
                }
                diag.emit();
            }
            InheritanceError::MultipleSuperclasses => {
                let first = base.map(|b| self.display(b)).unwrap_or_default();
                let (kind, message) = if subject == Subject::Enum {
                    (
                        DiagnosticKind::MultipleEnumRawTypes,
                        format!("multiple enum raw types '{first}' and '{shown}'"),
                    )
                } else {
                    (
                        DiagnosticKind::MultipleInheritance,
                        format!("multiple inheritance from classes '{first}' and '{shown}'"),
                    )
                };
                self.report(kind, span).message(message).emit();
            }
            InheritanceError::NonInheritableType => {
                let (kind, message) = if self.types.is_class(ty) {
                    match subject {
                        Subject::Extension => {
                            let extended = self
                                .ast
                                .decl(d)
                                .as_extension()
                                .and_then(|e| e.extended.ty)
                                .map(|t| self.display(t))
                                .unwrap_or_default();
                            (
                                DiagnosticKind::ExtensionClassInheritance,
                                format!(
                                    "extension of type '{extended}' cannot inherit from class '{shown}'"
                                ),
                            )
                        }
                        _ => (
                            DiagnosticKind::NonClassInheritance,
                            format!(
                                "non-class type '{}' cannot inherit from class '{shown}'",
                                self.name(d)
                            ),
                        ),
                    }
                } else if subject.can_have_superclass() {
                    (
                        DiagnosticKind::InheritanceFromNonProtocolOrClass,
                        format!("inheritance from non-protocol, non-class type '{shown}'"),
                    )
                } else {
                    (
                        DiagnosticKind::InheritanceFromNonProtocol,
                        format!("inheritance from non-protocol type '{shown}'"),
                    )
                };
                self.report(kind, span).message(message).emit();
            }
            InheritanceError::DynamicConstraintInInheritance => {
                self.report(DiagnosticKind::DynamicLookupConformance, span)
                    .emit();
            }
            InheritanceError::SuperclassNotFirst => self.report_not_first(d, subject, ty, entries, i),
        }
    }

    /// Superclass or raw type written after other entries: diagnose with
    /// fix-its moving it to the front. It is still recorded.
    fn report_not_first(
        &mut self,
        d: DeclId,
        subject: Subject,
        ty: TypeId,
        entries: &[TypeLoc],
        i: usize,
    ) {
        let span = self.entry_span(d, entries, i);
        let shown = self.display(ty);
        let text = self.ast.text(span).to_string();
        let first = self.entry_span(d, entries, 0).start();
        let removal = self.removal_span(d, entries, i);

        let (kind, message) = if subject == Subject::Enum {
            (
                DiagnosticKind::RawTypeNotFirst,
                format!("raw type '{shown}' must appear first in the enum inheritance clause"),
            )
        } else {
            (
                DiagnosticKind::SuperclassNotFirst,
                format!("superclass '{shown}' must appear first in the inheritance clause"),
            )
        };
        let mut diag = self.report(kind, span).message(message);
        if let Some(removal) = removal {
            diag = diag.fix(format!("move '{shown}' to the front"), removal, "");
        }
        diag.fix(format!("insert '{shown}' first"), first, format!("{text}, "))
            .emit();
    }

    fn record_clause(&mut self, d: DeclId, subject: Subject, clause: Clause) {
        let Clause {
            mut protocols,
            base,
        } = clause;

        if subject == Subject::Enum
            && base.is_some()
            && let Some(raw) = self.known.raw_representable
        {
            protocols.insert(raw);
        }
        if subject == Subject::Protocol && self.ast.decl(d).is_objc() {
            self.check_objc_refinement(d, &protocols);
        }

        let slots = vec![None; protocols.len()];
        match &mut self.ast.decl_mut(d).kind {
            DeclKind::Class(n) => {
                n.superclass = base;
                n.protocols = protocols;
                n.conformances = slots;
            }
            DeclKind::Enum(n) => {
                n.raw_type = base;
                n.protocols = protocols;
                n.conformances = slots;
            }
            DeclKind::Struct(n) | DeclKind::Protocol(n) => {
                n.protocols = protocols;
                n.conformances = slots;
            }
            DeclKind::GenericParam(p) | DeclKind::AssociatedType(p) => {
                p.superclass = base;
                p.protocols = protocols;
            }
            DeclKind::Extension(e) => {
                e.protocols = protocols;
                e.conformances = slots;
            }
            _ => {}
        }
    }

    fn check_objc_refinement(&mut self, d: DeclId, protocols: &IndexSet<DeclId>) {
        for &p in protocols {
            if self.ast.decl(p).is_objc() {
                continue;
            }
            let span = self.span(d);
            let message = format!(
                "@objc protocol '{}' cannot refine non-@objc protocol '{}'",
                self.name(d),
                self.name(p)
            );
            self.report(DiagnosticKind::ObjCProtocolInheritsNonObjCProtocol, span)
                .message(message)
                .emit();
        }
    }

    /// Superclass work that must follow recording: cycle check, the
    /// superclass's own clause, finality and its implicit initializers.
    fn finish_superclass(&mut self, d: DeclId) {
        self.check_circularity(d);
        let Some(superclass) = self
            .ast
            .decl(d)
            .as_nominal()
            .and_then(|n| n.superclass)
            .and_then(|s| self.types.class_decl(s))
        else {
            return;
        };
        self.resolve_inheritance(superclass);

        if self.ast.decl(superclass).is_final() {
            let span = self
                .ast
                .decl(d)
                .inherited()
                .first()
                .and_then(TypeLoc::range)
                .map_or_else(|| self.span(d), |r| self.span_of(d, r));
            let name = self.name(superclass);
            self.report(DiagnosticKind::InheritanceFromFinalClass, span)
                .message(name)
                .emit();
        }
        self.add_implicit_constructors(superclass);
    }

    /// `protocols` plus every protocol they inherit, in discovery order.
    pub(super) fn protocol_closure(
        &mut self,
        protocols: impl IntoIterator<Item = DeclId>,
    ) -> IndexSet<DeclId> {
        let mut out = IndexSet::new();
        let mut work: Vec<DeclId> = protocols.into_iter().collect();
        work.reverse();
        while let Some(p) = work.pop() {
            if !out.insert(p) {
                continue;
            }
            self.resolve_inheritance(p);
            let inherited: Vec<DeclId> = self
                .ast
                .decl(p)
                .protocols()
                .into_iter()
                .flatten()
                .rev()
                .copied()
                .collect();
            work.extend(inherited);
        }
        out
    }

    /// Resolve every clause that contributes to the conformances of
    /// `nominal`: its own, its extensions', its superclasses' and the
    /// protocols they name.
    pub(super) fn resolve_conformance_graph(&mut self, nominal: DeclId) {
        let mut seen = IndexSet::new();
        let mut current = Some(nominal);
        while let Some(n) = current {
            if !seen.insert(n) {
                break;
            }
            self.resolve_inheritance(n);
            let mut roots: Vec<DeclId> =
                self.ast.decl(n).protocols().into_iter().flatten().copied().collect();
            for ext in crate::collab::extensions_of(&self.ast, n) {
                self.resolve_inheritance(ext);
                roots.extend(self.ast.decl(ext).protocols().into_iter().flatten().copied());
            }
            self.protocol_closure(roots);
            current = self
                .ast
                .decl(n)
                .as_nominal()
                .and_then(|data| data.superclass)
                .and_then(|s| self.types.class_decl(s));
        }
    }

    /// Whether `nominal` conforms to `protocol`, resolving clauses as needed.
    pub(super) fn conforms_to(&mut self, nominal: DeclId, protocol: DeclId) -> bool {
        self.resolve_conformance_graph(nominal);
        crate::collab::nominal_conforms(&self.ast, &self.types, nominal, protocol)
    }

    /// Whether values of `ty` conform to `protocol`.
    pub(super) fn type_conforms_to(&mut self, ty: TypeId, protocol: DeclId) -> bool {
        if let Some(nominal) = self.types.nominal_decl(ty) {
            return self.conforms_to(nominal, protocol);
        }
        let protocols = self.types.existential_protocols(ty);
        if !protocols.is_empty() {
            return self.protocol_closure(protocols).contains(&protocol);
        }
        self.archetype_protocols(ty).contains(&protocol)
    }

    /// Protocols a generic parameter, associated type or archetype is
    /// known to conform to.
    fn archetype_protocols(&mut self, ty: TypeId) -> IndexSet<DeclId> {
        use crate::types::TypeShape;
        let decl = match *self.types.get(self.types.desugar(ty)) {
            TypeShape::GenericParam { decl, .. } | TypeShape::Archetype { decl, .. } => decl,
            TypeShape::DependentMember { assoc, .. } => assoc,
            _ => return IndexSet::new(),
        };
        self.resolve_inheritance(decl);
        let direct: Vec<DeclId> = self
            .ast
            .decl(decl)
            .protocols()
            .into_iter()
            .flatten()
            .copied()
            .collect();
        self.protocol_closure(direct)
    }
}
