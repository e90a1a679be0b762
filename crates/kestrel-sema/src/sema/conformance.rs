//! Protocol conformance checking.
//!
//! Every protocol in the protocol set of a nominal type or extension gets a
//! [`Conformance`] record in the slot aligned with it. Requirements of the
//! protocol and of the protocols it inherits are matched against members
//! of the conforming type by name and by type, with `Self` replaced by the
//! conforming type.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::Elaborator;
use crate::ast::{AttrKind, Conformance, DeclId, DeclKind, Witness};
use crate::collab::LookupOptions;
use crate::diagnostics::DiagnosticKind;
use crate::state::Entry;
use crate::types::{TYPE_ERROR, TypeId};

/// Requirements of one conformance that found no witness.
#[derive(Debug, Default)]
struct Missing {
    requirements: Vec<DeclId>,
}

impl Elaborator {
    /// Check every conformance declared by nominal or extension `d`.
    pub(super) fn check_conformances(&mut self, d: DeclId) {
        if self.ast.decl_mut(d).state.conformances.enter() != Entry::Fresh {
            return;
        }
        self.resolve_inheritance(d);
        let nominal = match &self.ast.decl(d).kind {
            DeclKind::Extension(ext) => ext.nominal,
            DeclKind::Protocol(_) => None,
            _ if self.ast.decl(d).is_nominal() => Some(d),
            _ => None,
        };
        if let Some(nominal) = nominal
            && !self.is_invalid(d)
        {
            let protocols: Vec<DeclId> =
                self.ast.decl(d).protocols().into_iter().flatten().copied().collect();
            let mut table = Vec::with_capacity(protocols.len());
            for &protocol in &protocols {
                table.push(Some(self.check_conformance(d, nominal, protocol)));
            }
            match &mut self.ast.decl_mut(d).kind {
                DeclKind::Extension(ext) => ext.conformances = table,
                DeclKind::Enum(n) | DeclKind::Struct(n) | DeclKind::Class(n) => {
                    n.conformances = table;
                }
                _ => {}
            }
        }
        self.ast.decl_mut(d).state.conformances.finish();
    }

    fn check_conformance(&mut self, d: DeclId, nominal: DeclId, protocol: DeclId) -> Conformance {
        let mut conformance = Conformance {
            protocol,
            witnesses: IndexMap::new(),
            type_witnesses: IndexMap::new(),
            invalid: false,
        };
        if self.is_derived_conformance(nominal, protocol) {
            self.derive_raw_representable(nominal, protocol, &mut conformance);
            debug!(conforming = %self.name(nominal), protocol = %self.name(protocol), "derived conformance");
            return conformance;
        }

        let conforming_ty = self.declared_type_of(nominal);
        let closure = self.protocol_closure([protocol]);
        let mut missing = Missing::default();

        // Type witnesses first; value requirements mention them.
        for &p in &closure {
            for req in self.ast.decl(p).members().to_vec() {
                if !matches!(self.ast.decl(req).kind, DeclKind::AssociatedType(_)) {
                    continue;
                }
                match self.type_witness(nominal, req) {
                    Some(ty) => {
                        let ty = self.types.desugar(ty);
                        conformance.type_witnesses.insert(req, ty);
                    }
                    None => missing.requirements.push(req),
                }
            }
        }

        let type_witnesses: HashMap<DeclId, TypeId> = conformance
            .type_witnesses
            .iter()
            .map(|(&k, &v)| (k, v))
            .collect();
        for &p in &closure {
            let self_map: HashMap<DeclId, TypeId> = self
                .ast
                .decl(p)
                .as_nominal()
                .and_then(|n| n.self_param)
                .map(|s| (s, conforming_ty))
                .into_iter()
                .collect();
            for req in self.ast.decl(p).members().to_vec() {
                if !self.is_value_requirement(req) {
                    continue;
                }
                self.validate_decl(req);
                if self.is_invalid(req) {
                    continue;
                }
                let expected = self.interface_type_of(req);
                let expected = self.types.substitute_members(expected, &type_witnesses);
                let expected = self.types.substitute(expected, &self_map);
                match self.find_witness(nominal, req, expected) {
                    Some(witness) => {
                        trace!(requirement = %self.name(req), witness = %self.name(witness), "witness");
                        if self.ast.decl(witness).is_storage() {
                            self.add_witness_accessors(witness);
                        }
                        conformance.witnesses.insert(req, Witness::Decl(witness));
                    }
                    None if self.ast.decl(req).attrs.has(&AttrKind::Optional) => {}
                    None => missing.requirements.push(req),
                }
            }
        }

        if !missing.requirements.is_empty() {
            conformance.invalid = true;
            self.report_nonconformance(d, conforming_ty, protocol, &missing);
        }
        conformance
    }

    fn is_value_requirement(&self, req: DeclId) -> bool {
        let decl = self.ast.decl(req);
        !decl.is_accessor()
            && matches!(
                decl.kind,
                DeclKind::Func(_) | DeclKind::Var(_) | DeclKind::Subscript(_) | DeclKind::Constructor(_)
            )
    }

    fn is_derived_conformance(&self, nominal: DeclId, protocol: DeclId) -> bool {
        Some(protocol) == self.known.raw_representable
            && matches!(self.ast.decl(nominal).kind, DeclKind::Enum(_))
            && self
                .ast
                .decl(nominal)
                .as_nominal()
                .is_some_and(|n| n.raw_type.is_some())
    }

    /// `RawValue` is the raw type; every value requirement is compiler-provided.
    fn derive_raw_representable(&mut self, nominal: DeclId, protocol: DeclId, out: &mut Conformance) {
        let raw_type = self
            .ast
            .decl(nominal)
            .as_nominal()
            .and_then(|n| n.raw_type)
            .unwrap_or(TYPE_ERROR);
        for req in self.ast.decl(protocol).members().to_vec() {
            match self.ast.decl(req).kind {
                DeclKind::AssociatedType(_) => {
                    out.type_witnesses.insert(req, raw_type);
                }
                _ if self.is_value_requirement(req) => {
                    out.witnesses.insert(req, Witness::Derived);
                }
                _ => {}
            }
        }
    }

    /// A member type named like associated type `req`, or its default.
    fn type_witness(&mut self, nominal: DeclId, req: DeclId) -> Option<TypeId> {
        let name = self.ast.decl(req).name.clone();
        let found = self.lookup.lookup_member(
            &self.ast,
            &self.types,
            nominal,
            &name,
            LookupOptions::default(),
        );
        let generic_params: Vec<DeclId> = self
            .ast
            .decl(nominal)
            .generic_params()
            .map(|list| {
                list.params
                    .iter()
                    .copied()
                    .filter(|&p| self.ast.decl(p).name.base() == name.base())
                    .collect()
            })
            .unwrap_or_default();
        let candidate = found
            .into_iter()
            .chain(generic_params)
            .find(|&m| self.ast.decl(m).is_type_decl());
        if let Some(member) = candidate {
            self.validate_decl(member);
            let ty = self.declared_type_of(member);
            return (!self.types.is_error(ty)).then_some(ty);
        }
        self.ast
            .decl(req)
            .as_type_param()
            .and_then(|a| a.default.as_ref())
            .and_then(|loc| loc.ty)
            .filter(|&ty| !self.types.is_error(ty))
    }

    /// A member of `nominal` that satisfies value requirement `req` whose
    /// type, seen from the conforming type, is `expected`.
    fn find_witness(&mut self, nominal: DeclId, req: DeclId, expected: TypeId) -> Option<DeclId> {
        let name = self.ast.decl(req).name.clone();
        let candidates = self.lookup.lookup_member(
            &self.ast,
            &self.types,
            nominal,
            &name,
            LookupOptions::default(),
        );
        let kind = std::mem::discriminant(&self.ast.decl(req).kind);
        let is_static = self.ast.decl(req).is_static();
        for c in candidates {
            if std::mem::discriminant(&self.ast.decl(c).kind) != kind
                || self.ast.decl(c).is_static() != is_static
            {
                continue;
            }
            self.validate_decl(c);
            if self.is_invalid(c) {
                continue;
            }
            if self.witness_type_matches(c, req, expected) && self.witness_settable_enough(c, req) {
                return Some(c);
            }
        }
        None
    }

    fn witness_type_matches(&mut self, witness: DeclId, req: DeclId, expected: TypeId) -> bool {
        let actual = self.interface_type_of(witness);
        let actual = self.rename_generic_params(witness, req, actual);
        match self.ast.decl(req).kind {
            DeclKind::Func(_) | DeclKind::Constructor(_) => {
                match (self.types.function_result(actual), self.types.function_result(expected)) {
                    (Some(a), Some(e)) => self.types.same_type(a, e),
                    _ => false,
                }
            }
            DeclKind::Var(_) => {
                let a = self.types.reference_storage_referent(actual);
                let e = self.types.reference_storage_referent(expected);
                self.types.same_type(a, e)
            }
            _ => self.types.same_type(actual, expected),
        }
    }

    /// Express the generic parameters of `witness` through those of `req`
    /// so generic functions compare by position.
    fn rename_generic_params(&mut self, witness: DeclId, req: DeclId, ty: TypeId) -> TypeId {
        let own = self
            .ast
            .decl(witness)
            .generic_params()
            .map(|list| list.params.clone())
            .unwrap_or_default();
        let theirs = self
            .ast
            .decl(req)
            .generic_params()
            .map(|list| list.params.clone())
            .unwrap_or_default();
        if own.is_empty() || own.len() != theirs.len() {
            return ty;
        }
        let mut map = HashMap::new();
        for (mine, other) in own.into_iter().zip(theirs) {
            let target = self.generic_param_type(other);
            map.insert(mine, target);
        }
        self.types.substitute(ty, &map)
    }

    /// Settable requirements need settable witnesses.
    fn witness_settable_enough(&mut self, witness: DeclId, req: DeclId) -> bool {
        if !self.ast.decl(req).is_storage() {
            return true;
        }
        self.check_storage(req);
        if !self.is_settable(req) {
            return true;
        }
        self.check_storage(witness);
        self.is_settable(witness)
    }

    fn report_nonconformance(
        &mut self,
        d: DeclId,
        conforming_ty: TypeId,
        protocol: DeclId,
        missing: &Missing,
    ) {
        let message = format!(
            "type '{}' does not conform to protocol '{}'",
            self.display(conforming_ty),
            self.name(protocol)
        );
        let notes: Vec<(String, _)> = missing
            .requirements
            .iter()
            .map(|&req| {
                let what = match self.ast.decl(req).kind {
                    DeclKind::AssociatedType(_) => "nested type",
                    _ => self.ast.decl(req).descriptive_kind(),
                };
                (format!("protocol requires {what} '{}'", self.name(req)), self.span(req))
            })
            .collect();
        let span = self.span(d);
        let mut diag = self
            .report(DiagnosticKind::TypeDoesNotConform, span)
            .message(message);
        for (note, note_span) in notes {
            diag = diag.related_to(note, note_span);
        }
        diag.emit();
    }
}
