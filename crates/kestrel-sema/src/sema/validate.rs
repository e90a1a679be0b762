//! Signature validation: the type of every declaration.

use tracing::trace;

use super::{Elaborator, ResolveMode};
use crate::Error;
use crate::ast::{AttrKind, DeclContext, DeclId, DeclKind, Failability};
use crate::diagnostics::DiagnosticKind;
use crate::state::Entry;
use crate::types::{TYPE_ERROR, TYPE_UNIT, TupleElement, TypeId, TypeShape};

impl Elaborator {
    /// Give `d` its type and signature.
    ///
    /// Re-entering a declaration that is still being validated returns
    /// immediately; variables and type aliases report the cycle.
    pub(super) fn validate_decl(&mut self, d: DeclId) {
        if self.is_aborted() {
            return;
        }
        match self.ast.decl_mut(d).state.validation.enter() {
            Entry::Done => return,
            Entry::Reentrant => {
                self.validation_cycle(d);
                return;
            }
            Entry::Fresh => {}
        }

        self.depth += 1;
        if self.depth > self.config.max_validation_depth {
            let limit = self.config.max_validation_depth;
            tracing::debug!(limit, decl = %self.name(d), "validation depth exceeded");
            self.fatal.get_or_insert(Error::ValidationDepthExceeded(limit));
        } else {
            trace!(decl = %self.name(d), kind = self.ast.decl(d).descriptive_kind(), "validate");
            self.validate_kind(d);
        }
        self.depth -= 1;
        self.ast.decl_mut(d).state.validation.finish();
    }

    fn validate_kind(&mut self, d: DeclId) {
        match self.ast.decl(d).kind {
            DeclKind::TypeAlias(_) => self.validate_type_alias(d),
            DeclKind::Enum(_) | DeclKind::Struct(_) | DeclKind::Class(_) | DeclKind::Protocol(_) => {
                self.validate_nominal(d)
            }
            DeclKind::AssociatedType(_) => self.validate_associated_type(d),
            DeclKind::GenericParam(_) => self.validate_generic_param(d),
            DeclKind::Var(_) => self.validate_var(d),
            DeclKind::Param(_) => self.validate_param(d),
            DeclKind::PatternBinding(_) => self.validate_binding(d),
            DeclKind::Subscript(_) => self.validate_subscript(d),
            DeclKind::Func(_) | DeclKind::Constructor(_) | DeclKind::Destructor(_) => {
                self.validate_function(d)
            }
            DeclKind::EnumElement(_) => self.validate_element(d),
            DeclKind::Extension(_) => self.validate_extension(d),
            DeclKind::Import(_) | DeclKind::Operator(_) => {}
        }
    }

    fn validation_cycle(&mut self, d: DeclId) {
        let message = match self.ast.decl(d).kind {
            DeclKind::TypeAlias(_) => format!("type alias '{}' references itself", self.name(d)),
            DeclKind::Var(_) if self.ast.decl(d).ty.is_none() => {
                "variable used within its own initial value".to_string()
            }
            _ => return,
        };
        let span = self.span(d);
        self.report(DiagnosticKind::CircularReference, span)
            .message(message)
            .emit();
        self.mark_invalid(d);
    }

    /// Validate the nominal or extension that contains `d`, if any.
    pub(super) fn validate_container(&mut self, d: DeclId) {
        let parent = self.ast.decl(d).parent;
        if parent.is_type_context()
            && let Some(container) = parent.as_decl()
        {
            self.validate_decl(container);
        }
    }

    /// Record `interface` and its contextual form as the type of `d`.
    fn assign_type(&mut self, d: DeclId, interface: TypeId) {
        if self.types.contains_error(interface) {
            self.mark_invalid(d);
            return;
        }
        let contextual = self.map_to_archetypes(interface);
        let decl = self.ast.decl_mut(d);
        decl.interface_ty = Some(interface);
        decl.ty = Some(contextual);
    }

    fn validate_nominal(&mut self, d: DeclId) {
        self.validate_container(d);
        let declared = self.declared_type_of(d);
        self.check_generic_signature(d);
        self.resolve_inheritance(d);
        self.check_circularity(d);

        if let Some(self_param) = self.ast.decl(d).as_nominal().and_then(|n| n.self_param) {
            self.validate_decl(self_param);
        }
        if !self.is_invalid(d) {
            let meta = self.types.metatype(declared);
            self.assign_type(d, meta);
        }
        self.validate_attributes(d);
        self.accessibility_of(d);
    }

    fn validate_type_alias(&mut self, d: DeclId) {
        self.validate_container(d);
        let dc = self.ast.decl(d).parent;
        let mut loc = match &self.ast.decl(d).kind {
            DeclKind::TypeAlias(alias) => alias.underlying.clone(),
            _ => return,
        };
        let underlying = self.resolve_type_loc(&mut loc, dc, ResolveMode::Interface);
        if let DeclKind::TypeAlias(alias) = &mut self.ast.decl_mut(d).kind {
            alias.underlying = loc;
        }
        if self.types.is_error(underlying) || self.is_invalid(d) {
            self.mark_invalid(d);
        } else {
            let alias = self.declared_type_of(d);
            let meta = self.types.metatype(alias);
            self.assign_type(d, meta);
        }
        self.validate_attributes(d);
        self.accessibility_of(d);
    }

    fn validate_associated_type(&mut self, d: DeclId) {
        if let DeclContext::Nominal(protocol) = self.ast.decl(d).parent {
            self.check_generic_signature(protocol);
        }
        self.resolve_inheritance(d);

        let default = self
            .ast
            .decl(d)
            .as_type_param()
            .and_then(|p| p.default.clone());
        if let Some(mut loc) = default {
            let dc = self.ast.decl(d).parent;
            self.resolve_type_loc(&mut loc, dc, ResolveMode::Interface);
            if let Some(p) = self.ast.decl_mut(d).as_type_param_mut() {
                p.default = Some(loc);
            }
        }

        let interface = self.declared_type_of(d);
        let meta = self.types.metatype(interface);
        self.assign_type(d, meta);
        self.accessibility_of(d);
    }

    fn validate_generic_param(&mut self, d: DeclId) {
        if let Some(owner) = self.ast.decl(d).parent.as_decl() {
            self.check_generic_signature(owner);
        }
        self.resolve_inheritance(d);
        let interface = self.generic_param_type(d);
        let meta = self.types.metatype(interface);
        self.assign_type(d, meta);
    }

    fn validate_var(&mut self, d: DeclId) {
        self.validate_container(d);
        if let Some(binding) = self.ast.decl(d).as_var().and_then(|v| v.binding) {
            self.validate_decl(binding);
            // The binding is still inferring the type this variable needs.
            if self.ast.decl(binding).state.validation.is_checking()
                && self.ast.decl(d).ty.is_none()
            {
                self.validation_cycle(d);
            }
        }
        self.finish_var(d);
    }

    /// Variable work that follows type assignment.
    pub(super) fn finish_var(&mut self, d: DeclId) {
        if let Some(ownership) = self.ast.decl(d).attrs.ownership()
            && let (Some(interface), Some(ty)) =
                (self.ast.decl(d).interface_ty, self.ast.decl(d).ty)
            && !self.types.is_error(ty)
            && !self.types.is_reference_storage(ty)
        {
            let wrap = |types: &mut crate::types::TypeContext, referent| {
                types.intern(TypeShape::ReferenceStorage {
                    ownership,
                    referent,
                })
            };
            let interface = wrap(&mut self.types, interface);
            let ty = wrap(&mut self.types, ty);
            let decl = self.ast.decl_mut(d);
            decl.interface_ty = Some(interface);
            decl.ty = Some(ty);
        }
        self.validate_attributes(d);
        self.accessibility_of(d);
    }

    fn validate_param(&mut self, d: DeclId) {
        let dc = self.ast.decl(d).parent;
        let Some(param) = self.ast.decl(d).as_param() else {
            return;
        };
        let mut loc = param.annotation.clone();
        if loc.repr.is_none() && loc.ty.is_none() {
            // Written accessor parameters get their type from the storage.
            if self.ast.decl(d).interface_ty.is_none() {
                self.mark_invalid(d);
            }
            return;
        }
        let ty = self.resolve_type_loc(&mut loc, dc, ResolveMode::Interface);
        if let DeclKind::Param(param) = &mut self.ast.decl_mut(d).kind {
            param.inout = matches!(self.types.get(ty), TypeShape::InOut(_));
            param.annotation = loc;
        }
        self.assign_type(d, ty);
    }

    /// Parameter tuple of a function-like declaration.
    fn input_type(&mut self, params: &[DeclId]) -> TypeId {
        let mut elements = Vec::with_capacity(params.len());
        for &p in params {
            let ty = self.interface_type_of(p);
            let param = self.ast.decl(p).as_param();
            elements.push(TupleElement {
                label: param.and_then(|p| p.api_label),
                ty,
                variadic: param.is_some_and(|p| p.variadic),
            });
        }
        self.types.tuple(elements)
    }

    /// Type of `self` as seen by a member, curried in front of its signature.
    pub(super) fn self_type_for(&mut self, d: DeclId) -> Option<TypeId> {
        let dc = self.ast.decl(d).parent;
        let nominal = self.ast.nominal_of(dc)?;
        let base = match self.ast.decl(nominal).as_nominal().and_then(|n| n.self_param) {
            Some(self_param) => self.generic_param_type(self_param),
            None => self.declared_type_of(nominal),
        };
        let in_class = self.ast.is_class_context(dc);
        Some(match &self.ast.decl(d).kind {
            DeclKind::Constructor(_) => self.types.metatype(base),
            DeclKind::Destructor(_) => base,
            DeclKind::Func(f) if f.is_static => self.types.metatype(base),
            DeclKind::Func(f) if f.is_mutating && !in_class => self.types.inout(base),
            _ => base,
        })
    }

    /// Declared type of the nominal a member belongs to (`Self`).
    pub(super) fn container_type(&mut self, dc: DeclContext) -> Option<TypeId> {
        let nominal = self.ast.nominal_of(dc)?;
        Some(
            match self.ast.decl(nominal).as_nominal().and_then(|n| n.self_param) {
                Some(self_param) => self.generic_param_type(self_param),
                None => self.declared_type_of(nominal),
            },
        )
    }

    fn validate_function(&mut self, d: DeclId) {
        self.validate_container(d);
        if self.ast.decl(d).is_accessor() {
            self.accessor_prototype(d);
        }
        self.check_generic_signature(d);

        let mut params = self.ast.decl(d).params().to_vec();
        if let Some(info) = self.ast.decl(d).accessor()
            && let DeclKind::Subscript(s) = &self.ast.decl(info.storage).kind
        {
            params.extend(s.indices.iter().copied());
        }
        for &p in &params {
            self.validate_decl(p);
        }
        let input = self.input_type(&params);

        let result = match &self.ast.decl(d).kind {
            DeclKind::Func(f) => {
                let mut loc = f.result.clone();
                if loc.repr.is_none() && loc.ty.is_none() {
                    TYPE_UNIT
                } else {
                    let ty = self.resolve_type_loc(&mut loc, DeclContext::Function(d), ResolveMode::Interface);
                    if let Some(f) = self.ast.decl_mut(d).as_func_mut() {
                        f.result = loc;
                    }
                    ty
                }
            }
            DeclKind::Constructor(c) => {
                let failability = c.failability;
                let dc = self.ast.decl(d).parent;
                let base = self.container_type(dc).unwrap_or(TYPE_ERROR);
                match failability {
                    Failability::None => base,
                    Failability::Optional => self.types.optional(base),
                    Failability::ImplicitlyUnwrapped => self
                        .types
                        .intern(TypeShape::ImplicitlyUnwrappedOptional(base)),
                }
            }
            _ => TYPE_UNIT,
        };

        let no_return = self.ast.decl(d).attrs.has(&AttrKind::NoReturn);
        let mut ty = self.types.intern(TypeShape::Function {
            input,
            result,
            no_return,
        });
        if let Some(self_ty) = self.self_type_for(d) {
            ty = self.types.function(self_ty, ty);
        }
        self.assign_type(d, ty);
        self.validate_attributes(d);
        self.accessibility_of(d);
    }

    fn validate_subscript(&mut self, d: DeclId) {
        self.validate_container(d);
        let dc = self.ast.decl(d).parent;
        let indices = self.ast.decl(d).params().to_vec();
        for &p in &indices {
            self.validate_decl(p);
        }
        let input = self.input_type(&indices);
        let mut loc = match &self.ast.decl(d).kind {
            DeclKind::Subscript(s) => s.element.clone(),
            _ => return,
        };
        let element = self.resolve_type_loc(&mut loc, dc, ResolveMode::Interface);
        if let DeclKind::Subscript(s) = &mut self.ast.decl_mut(d).kind {
            s.element = loc;
        }
        let ty = self.types.function(input, element);
        self.assign_type(d, ty);
        self.validate_attributes(d);
        self.accessibility_of(d);
    }

    fn validate_element(&mut self, d: DeclId) {
        let DeclContext::Nominal(owner) = self.ast.decl(d).parent else {
            return;
        };
        self.validate_decl(owner);
        let enum_ty = self.declared_type_of(owner);
        let meta = self.types.metatype(enum_ty);

        let argument = self.ast.decl(d).as_element().and_then(|e| e.argument.clone());
        let ty = match argument {
            Some(mut loc) => {
                let arg = self.resolve_type_loc(&mut loc, DeclContext::Nominal(owner), ResolveMode::Interface);
                if let Some(e) = self.ast.decl_mut(d).as_element_mut() {
                    e.argument = Some(loc);
                }
                if !self.types.is_error(arg) && !self.types.is_materializable(arg) {
                    let span = self.span(d);
                    self.report(DiagnosticKind::EnumElementNotMaterializable, span)
                        .emit();
                    self.mark_invalid(d);
                    return;
                }
                let payload = self.types.function(arg, enum_ty);
                self.types.function(meta, payload)
            }
            None => self.types.function(meta, enum_ty),
        };
        self.assign_type(d, ty);
        self.validate_attributes(d);
        self.accessibility_of(d);
    }

    fn validate_extension(&mut self, d: DeclId) {
        if let Some(nominal) = self.ast.decl(d).as_extension().and_then(|e| e.nominal) {
            self.validate_decl(nominal);
        }
        self.resolve_inheritance(d);
        self.validate_attributes(d);
        self.accessibility_of(d);
    }
}
