//! Generic signatures: parameter binding, requirements and archetypes.
//!
//! Checking registers every parameter (and, for protocols, `Self` and the
//! associated types) with an archetype builder, then feeds it the inherited
//! types and the written requirements. Finalization assigns archetypes and
//! re-resolves the requirements so they see them.

use tracing::{debug, trace};

use super::{Elaborator, ResolveMode};
use crate::ast::{DeclContext, DeclId, DeclKind, RequirementKind, TypeLoc};
use crate::collab::{ArchetypeBuilder, ArchetypeError, PotentialArchetype};
use crate::diagnostics::DiagnosticKind;
use crate::state::Entry;
use crate::types::TypeId;

impl Elaborator {
    /// Check the generic signature of `owner` and of every enclosing
    /// generic context, outermost first.
    pub(super) fn check_generic_signature(&mut self, owner: DeclId) {
        if self.ast.decl_mut(owner).state.generics.enter() != Entry::Fresh {
            return;
        }
        if let Some(outer) = self.outer_generic_owner(owner) {
            self.check_generic_signature(outer);
        }

        let has_list = self.ast.decl(owner).generic_params().is_some();
        let is_protocol = self.ast.decl(owner).is_protocol();
        if has_list || is_protocol {
            trace!(owner = %self.name(owner), "check generic signature");
            let mut builder = self.archetypes.create();
            self.seed_builder(owner, builder.as_mut());
            self.add_requirements(owner, builder.as_mut());
            self.finalize_signature(owner, builder.as_mut());
        }

        self.ast.decl_mut(owner).state.generics.finish();
    }

    /// Nearest enclosing declaration that introduces generic parameters.
    fn outer_generic_owner(&self, owner: DeclId) -> Option<DeclId> {
        let mut current = Some(self.ast.decl(owner).parent);
        while let Some(dc) = current {
            let candidate = match dc {
                DeclContext::Nominal(_) | DeclContext::Extension(_) => self.ast.nominal_of(dc),
                DeclContext::Function(f) => Some(f),
                _ => None,
            };
            if let Some(c) = candidate {
                let decl = self.ast.decl(c);
                if decl.is_protocol() || decl.generic_params().is_some() {
                    return Some(c);
                }
            }
            current = self.ast.parent_context(dc);
        }
        None
    }

    fn potential(&mut self, decl: DeclId, interface: TypeId) -> PotentialArchetype {
        PotentialArchetype {
            decl,
            name: self.ast.decl(decl).name.base(),
            interface,
        }
    }

    /// Register parameters, their inherited types and, for protocols, the
    /// implicit `Self` and associated types.
    fn seed_builder(&mut self, owner: DeclId, builder: &mut dyn ArchetypeBuilder) {
        let params: Vec<DeclId> = self
            .ast
            .decl(owner)
            .generic_params()
            .map(|list| list.params.clone())
            .unwrap_or_default();
        for p in params {
            let interface = self.generic_param_type(p);
            let pa = self.potential(p, interface);
            builder.add_param(pa);
            self.resolve_inheritance(p);
            self.add_inherited_requirements(p, interface, builder);
        }

        let Some(self_param) = self.ast.decl(owner).as_nominal().and_then(|n| n.self_param) else {
            return;
        };
        let self_ty = self.generic_param_type(self_param);
        let pa = self.potential(self_param, self_ty);
        builder.add_param(pa);
        if let Err(err) = builder.add_conformance(&self.types, self_ty, owner) {
            debug!(protocol = %self.name(owner), %err, "Self conformance rejected");
        }

        let assoc: Vec<DeclId> = self
            .ast
            .decl(owner)
            .members()
            .iter()
            .copied()
            .filter(|&m| matches!(self.ast.decl(m).kind, DeclKind::AssociatedType(_)))
            .collect();
        for a in assoc {
            let interface = self.declared_type_of(a);
            let pa = self.potential(a, interface);
            builder.add_param(pa);
            self.resolve_inheritance(a);
            self.add_inherited_requirements(a, interface, builder);
        }
    }

    /// Requirements implied by the inheritance clause of a parameter.
    fn add_inherited_requirements(
        &mut self,
        param: DeclId,
        interface: TypeId,
        builder: &mut dyn ArchetypeBuilder,
    ) {
        let Some(data) = self.ast.decl(param).as_type_param() else {
            return;
        };
        let protocols: Vec<DeclId> = data.protocols.iter().copied().collect();
        let superclass = data.superclass;
        for p in protocols {
            if let Err(err) = builder.add_conformance(&self.types, interface, p) {
                debug!(param = %self.name(param), %err, "inherited conformance rejected");
            }
        }
        if let Some(sup) = superclass
            && let Err(err) = builder.add_superclass(&self.types, interface, sup)
        {
            debug!(param = %self.name(param), %err, "inherited superclass rejected");
        }
    }

    fn add_requirements(&mut self, owner: DeclId, builder: &mut dyn ArchetypeBuilder) {
        let dc = self.ast.context_of(owner).unwrap_or(self.ast.decl(owner).parent);
        let Some(mut requirements) = self
            .ast
            .decl(owner)
            .generic_params()
            .map(|list| list.requirements.clone())
        else {
            return;
        };

        for req in &mut requirements {
            let result = match &mut req.kind {
                RequirementKind::Conformance {
                    subject,
                    constraint,
                } => self.add_conformance_requirement(dc, subject, constraint, req.range, builder),
                RequirementKind::SameType { first, second } => {
                    let a = self.resolve_type_loc(first, dc, ResolveMode::Interface);
                    let b = self.resolve_type_loc(second, dc, ResolveMode::Interface);
                    if self.types.is_error(a) || self.types.is_error(b) {
                        Err(None)
                    } else {
                        builder.add_same_type(&self.types, a, b).map_err(Some)
                    }
                }
            };
            match result {
                Ok(()) => {}
                Err(None) => req.invalid = true,
                Err(Some(err)) => {
                    req.invalid = true;
                    let span = self.span_in(dc, req.range);
                    let message = self.archetype_error_message(err);
                    self.report(DiagnosticKind::InvalidRequirement, span)
                        .message(message)
                        .emit();
                }
            }
        }

        if let Some(list) = self.ast.decl_mut(owner).generic_params_mut() {
            list.requirements = requirements;
        }
    }

    fn add_conformance_requirement(
        &mut self,
        dc: DeclContext,
        subject: &mut TypeLoc,
        constraint: &mut TypeLoc,
        range: rowan::TextRange,
        builder: &mut dyn ArchetypeBuilder,
    ) -> Result<(), Option<ArchetypeError>> {
        let subject_ty = self.resolve_type_loc(subject, dc, ResolveMode::Interface);
        let constraint_ty = self.resolve_type_loc(constraint, dc, ResolveMode::Interface);
        if self.types.is_error(subject_ty) || self.types.is_error(constraint_ty) {
            return Err(None);
        }

        if self.types.is_existential(constraint_ty) {
            for p in self.types.existential_protocols(constraint_ty) {
                builder.add_conformance(&self.types, subject_ty, p)?;
            }
            return Ok(());
        }
        if self.types.is_class(constraint_ty) {
            builder.add_superclass(&self.types, subject_ty, constraint_ty)?;
            return Ok(());
        }

        let span = self.span_in(dc, range);
        let message = format!(
            "type '{}' constrained to non-protocol, non-class type '{}'",
            self.display(subject_ty),
            self.display(constraint_ty)
        );
        self.report(DiagnosticKind::RequiresConformanceNonProtocol, span)
            .message(message)
            .emit();
        Err(None)
    }

    fn archetype_error_message(&self, err: ArchetypeError) -> String {
        match err {
            ArchetypeError::NotAParameter(ty) => format!(
                "requirement subject '{}' is not a generic parameter or associated type",
                self.display(ty)
            ),
            ArchetypeError::ConcreteSameType(ty) => format!(
                "same-type requirement makes generic parameter '{}' non-generic",
                self.display(ty)
            ),
        }
    }

    fn finalize_signature(&mut self, owner: DeclId, builder: &mut dyn ArchetypeBuilder) {
        let assignments = builder.finalize(&mut self.types);
        let mut archetypes = Vec::new();
        for assignment in &assignments {
            self.contextual
                .entry(assignment.interface)
                .or_insert(assignment.archetype);
            if !archetypes.contains(&assignment.archetype) {
                archetypes.push(assignment.archetype);
            }

            let own_interface = match self.ast.decl(assignment.decl).kind {
                DeclKind::GenericParam(_) => Some(self.generic_param_type(assignment.decl)),
                DeclKind::AssociatedType(_) => Some(self.declared_type_of(assignment.decl)),
                _ => None,
            };
            if own_interface == Some(assignment.interface)
                && let Some(data) = self.ast.decl_mut(assignment.decl).as_type_param_mut()
            {
                data.archetype = Some(assignment.archetype);
            }
        }
        debug!(
            owner = %self.name(owner),
            archetypes = archetypes.len(),
            "generic signature finalized"
        );

        let dc = self.ast.context_of(owner).unwrap_or(self.ast.decl(owner).parent);
        let Some(mut requirements) = self
            .ast
            .decl(owner)
            .generic_params()
            .map(|list| list.requirements.clone())
        else {
            return;
        };
        for req in requirements.iter_mut().filter(|r| !r.invalid) {
            let (a, b) = match &mut req.kind {
                RequirementKind::Conformance {
                    subject,
                    constraint,
                } => (subject, constraint),
                RequirementKind::SameType { first, second } => (first, second),
            };
            for loc in [a, b] {
                loc.revert();
                self.resolve_type_loc(loc, dc, ResolveMode::Contextual);
            }
        }
        if let Some(list) = self.ast.decl_mut(owner).generic_params_mut() {
            list.requirements = requirements;
            list.archetypes = archetypes;
        }
    }
}
