//! Type annotation resolution.

use kestrel_core::DeclName;
use rowan::TextRange;

use super::Elaborator;
use crate::ast::{DeclContext, DeclId, DeclKind, IdentComponent, Span, TypeLoc, TypeRepr, TypeReprKind};
use crate::collab::LookupOptions;
use crate::diagnostics::DiagnosticKind;
use crate::types::{TYPE_ERROR, TupleElement, TypeId, TypeShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolveMode {
    /// Generic parameters stay in interface form.
    Interface,
    /// Generic parameters are replaced by their archetypes.
    Contextual,
}

impl Elaborator {
    /// Resolve `loc` in `dc`, recording the result in the annotation.
    /// Resolved annotations are returned as they are.
    pub(super) fn resolve_type_loc(
        &mut self,
        loc: &mut TypeLoc,
        dc: DeclContext,
        mode: ResolveMode,
    ) -> TypeId {
        if let Some(ty) = loc.ty {
            return ty;
        }
        let Some(mut repr) = loc.repr.take() else {
            loc.invalid = true;
            loc.ty = Some(TYPE_ERROR);
            return TYPE_ERROR;
        };
        let mut ty = self.resolve_repr(&mut repr, dc);
        if mode == ResolveMode::Contextual {
            ty = self.map_to_archetypes(ty);
        }
        loc.repr = Some(repr);
        loc.invalid = self.types.is_error(ty);
        loc.ty = Some(ty);
        ty
    }

    /// Span of `range` in the file of `dc`.
    pub(super) fn span_in(&self, dc: DeclContext, range: TextRange) -> Span {
        let file = self.ast.file_of_context(dc).unwrap_or_default();
        Span::new(file, range)
    }

    fn resolve_repr(&mut self, repr: &mut TypeRepr, dc: DeclContext) -> TypeId {
        let shape = match &mut repr.kind {
            TypeReprKind::Ident(components) => return self.resolve_ident(components, dc),
            TypeReprKind::Tuple(elements) => {
                let mut out = Vec::with_capacity(elements.len());
                for e in elements.iter_mut() {
                    let ty = self.resolve_repr(&mut e.ty, dc);
                    out.push(TupleElement {
                        label: e.label,
                        ty,
                        variadic: e.variadic,
                    });
                }
                if out.iter().any(|e| self.types.is_error(e.ty)) {
                    return TYPE_ERROR;
                }
                TypeShape::Tuple(out)
            }
            TypeReprKind::Function { input, result } => {
                let input = self.resolve_repr(input, dc);
                let result = self.resolve_repr(result, dc);
                if self.types.is_error(input) || self.types.is_error(result) {
                    return TYPE_ERROR;
                }
                TypeShape::Function {
                    input,
                    result,
                    no_return: false,
                }
            }
            TypeReprKind::Optional(inner) => return self.wrap(inner, dc, TypeShape::Optional),
            TypeReprKind::ImplicitlyUnwrappedOptional(inner) => {
                return self.wrap(inner, dc, TypeShape::ImplicitlyUnwrappedOptional);
            }
            TypeReprKind::Metatype(inner) => return self.wrap(inner, dc, TypeShape::Metatype),
            TypeReprKind::InOut(inner) => return self.wrap(inner, dc, TypeShape::InOut),
            TypeReprKind::Ownership {
                ownership,
                referent,
            } => {
                let ownership = *ownership;
                return self.wrap(referent, dc, |referent| TypeShape::ReferenceStorage {
                    ownership,
                    referent,
                });
            }
            TypeReprKind::Composition(members) => {
                let mut out = Vec::with_capacity(members.len());
                for m in members.iter_mut() {
                    let ty = self.resolve_repr(m, dc);
                    if self.types.is_error(ty) {
                        return TYPE_ERROR;
                    }
                    if !self.types.is_existential(ty) {
                        let span = self.span_in(dc, m.range);
                        let shown = self.display(ty);
                        self.report(DiagnosticKind::InheritanceFromNonProtocol, span)
                            .message(format!(
                                "non-protocol type '{shown}' cannot be used within 'protocol<...>'"
                            ))
                            .emit();
                        return TYPE_ERROR;
                    }
                    out.push(ty);
                }
                TypeShape::Composition(out)
            }
        };
        self.types.intern(shape)
    }

    fn wrap(
        &mut self,
        inner: &mut TypeRepr,
        dc: DeclContext,
        make: impl FnOnce(TypeId) -> TypeShape,
    ) -> TypeId {
        let ty = self.resolve_repr(inner, dc);
        if self.types.is_error(ty) {
            return TYPE_ERROR;
        }
        self.types.intern(make(ty))
    }

    fn resolve_ident(&mut self, components: &mut [IdentComponent], dc: DeclContext) -> TypeId {
        let Some((first, rest)) = components.split_first_mut() else {
            return TYPE_ERROR;
        };
        let found = self.lookup.lookup_unqualified(&self.ast, dc, first.name);
        let decl = found
            .iter()
            .copied()
            .find(|&d| self.ast.decl(d).is_type_decl());
        let Some(decl) = decl else {
            let name = self.ast.resolve(first.name).to_string();
            let span = self.span_in(dc, first.range);
            let kind = if found.is_empty() {
                DiagnosticKind::UndeclaredType
            } else {
                DiagnosticKind::NotAType
            };
            self.report(kind, span).message(name).emit();
            return TYPE_ERROR;
        };
        first.bound = Some(decl);
        let mut ty = self.type_for_decl(decl, &mut first.args, first.range, dc);

        for component in rest {
            if self.types.is_error(ty) {
                break;
            }
            ty = self.resolve_member_type(ty, component, dc);
        }
        ty
    }

    /// Type named by a reference to type declaration `decl` with `args`.
    fn type_for_decl(
        &mut self,
        decl: DeclId,
        args: &mut [TypeRepr],
        range: TextRange,
        dc: DeclContext,
    ) -> TypeId {
        match &self.ast.decl(decl).kind {
            DeclKind::Enum(_) | DeclKind::Struct(_) | DeclKind::Class(_) | DeclKind::Protocol(_) => {
                self.nominal_reference(decl, args, range, dc)
            }
            DeclKind::TypeAlias(_) => {
                self.validate_decl(decl);
                if self.is_invalid(decl) {
                    return TYPE_ERROR;
                }
                self.declared_type_of(decl)
            }
            DeclKind::GenericParam(_) | DeclKind::AssociatedType(_) => self.declared_type_of(decl),
            _ => TYPE_ERROR,
        }
    }

    fn nominal_reference(
        &mut self,
        decl: DeclId,
        args: &mut [TypeRepr],
        range: TextRange,
        dc: DeclContext,
    ) -> TypeId {
        let expected = self
            .ast
            .decl(decl)
            .generic_params()
            .map(|list| list.params.len());
        let name = self.name(decl);

        if args.is_empty() {
            return match expected {
                Some(_) if !self.is_within(dc, decl) => {
                    let data = self.ast.decl(decl);
                    let (Some(kind), name) = (data.nominal_kind(), data.name.base()) else {
                        return TYPE_ERROR;
                    };
                    self.types
                        .intern(TypeShape::UnboundGeneric { kind, decl, name })
                }
                _ => self.declared_type_of(decl),
            };
        }

        let span = self.span_in(dc, range);
        let Some(expected) = expected else {
            self.report(DiagnosticKind::GenericArgumentCount, span)
                .message(format!("cannot specialize non-generic type '{name}'"))
                .emit();
            return TYPE_ERROR;
        };
        if args.len() != expected {
            let amount = if args.len() > expected { "many" } else { "few" };
            self.report(DiagnosticKind::GenericArgumentCount, span)
                .message(format!(
                    "generic type '{name}' specialized with too {amount} type parameters (got {}, but expected {expected})",
                    args.len()
                ))
                .emit();
            return TYPE_ERROR;
        }

        let mut resolved = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            let ty = self.resolve_repr(arg, dc);
            if self.types.is_error(ty) {
                return TYPE_ERROR;
            }
            resolved.push(ty);
        }
        let data = self.ast.decl(decl);
        let Some(kind) = data.nominal_kind() else {
            return TYPE_ERROR;
        };
        let name = data.name.base();
        self.types.intern(TypeShape::Nominal {
            kind,
            decl,
            name,
            args: resolved,
        })
    }

    /// `Base.Name`: a nested type or an associated type of a generic parameter.
    fn resolve_member_type(
        &mut self,
        base: TypeId,
        component: &mut IdentComponent,
        dc: DeclContext,
    ) -> TypeId {
        let base = self.types.desugar(base);
        let member = match *self.types.get(base) {
            TypeShape::Nominal { decl, .. } | TypeShape::UnboundGeneric { decl, .. } => {
                let name = DeclName::simple(component.name);
                self.lookup
                    .lookup_member(
                        &self.ast,
                        &self.types,
                        decl,
                        &name,
                        LookupOptions::default(),
                    )
                    .into_iter()
                    .find(|&m| self.ast.decl(m).is_type_decl())
            }
            TypeShape::GenericParam { decl, .. }
            | TypeShape::Archetype { decl, .. }
            | TypeShape::DependentMember { assoc: decl, .. } => {
                self.associated_type_named(decl, component.name)
            }
            _ => None,
        };

        let Some(member) = member else {
            let span = self.span_in(dc, component.range);
            let shown = format!(
                "{}.{}",
                self.display(base),
                self.ast.resolve(component.name)
            );
            self.report(DiagnosticKind::UndeclaredType, span)
                .message(shown)
                .emit();
            return TYPE_ERROR;
        };
        component.bound = Some(member);

        if matches!(self.ast.decl(member).kind, DeclKind::AssociatedType(_))
            && !matches!(
                self.types.get(base),
                TypeShape::Nominal { .. } | TypeShape::UnboundGeneric { .. }
            )
        {
            let name = component.name;
            return self.types.intern(TypeShape::DependentMember {
                base,
                assoc: member,
                name,
            });
        }
        self.type_for_decl(member, &mut component.args, component.range, dc)
    }

    /// Associated type `name` reachable through the protocols of a generic
    /// parameter or associated type.
    fn associated_type_named(
        &mut self,
        param: DeclId,
        name: kestrel_core::Symbol,
    ) -> Option<DeclId> {
        self.resolve_inheritance(param);
        let mut protocols: Vec<DeclId> = self
            .ast
            .decl(param)
            .protocols()
            .into_iter()
            .flatten()
            .copied()
            .collect();
        // `Self` of a protocol sees the protocol's own associated types.
        if let DeclContext::Nominal(owner) = self.ast.decl(param).parent
            && self.ast.decl(owner).as_nominal().and_then(|n| n.self_param) == Some(param)
        {
            protocols.push(owner);
        }
        let closure = self.protocol_closure(protocols);
        closure.into_iter().find_map(|p| {
            self.ast
                .decl(p)
                .members()
                .iter()
                .copied()
                .find(|&m| {
                    matches!(self.ast.decl(m).kind, DeclKind::AssociatedType(_))
                        && self.ast.decl(m).name.base() == name
                })
        })
    }

    /// Declared (interface) type of a type declaration.
    pub(super) fn declared_type_of(&mut self, d: DeclId) -> TypeId {
        let decl = self.ast.decl(d);
        let name = decl.name.base();
        match &decl.kind {
            DeclKind::Enum(n) | DeclKind::Struct(n) | DeclKind::Class(n) | DeclKind::Protocol(n) => {
                if let Some(ty) = n.declared_type {
                    return ty;
                }
                let Some(kind) = decl.nominal_kind() else {
                    return TYPE_ERROR;
                };
                let params: Vec<DeclId> = n
                    .generic_params
                    .as_ref()
                    .map(|list| list.params.clone())
                    .unwrap_or_default();
                let args = params
                    .into_iter()
                    .map(|p| self.generic_param_type(p))
                    .collect();
                let ty = self.types.intern(TypeShape::Nominal {
                    kind,
                    decl: d,
                    name,
                    args,
                });
                if let Some(n) = self.ast.decl_mut(d).as_nominal_mut() {
                    n.declared_type = Some(ty);
                }
                ty
            }
            DeclKind::TypeAlias(alias) => {
                let underlying = alias.underlying.ty.unwrap_or(TYPE_ERROR);
                if self.types.is_error(underlying) {
                    return TYPE_ERROR;
                }
                self.types.intern(TypeShape::Alias {
                    decl: d,
                    name,
                    underlying,
                })
            }
            DeclKind::GenericParam(_) => self.generic_param_type(d),
            DeclKind::AssociatedType(_) => {
                let DeclContext::Nominal(protocol) = decl.parent else {
                    return TYPE_ERROR;
                };
                let Some(self_param) = self.ast.decl(protocol).as_nominal().and_then(|n| n.self_param)
                else {
                    return TYPE_ERROR;
                };
                let base = self.generic_param_type(self_param);
                self.types.intern(TypeShape::DependentMember {
                    base,
                    assoc: d,
                    name,
                })
            }
            _ => TYPE_ERROR,
        }
    }

    /// Interface type of a generic parameter, assigning its depth and index.
    pub(super) fn generic_param_type(&mut self, param: DeclId) -> TypeId {
        let decl = self.ast.decl(param);
        let name = decl.name.base();
        let owner = decl.parent.as_decl();
        let (depth, index) = match owner {
            Some(owner) => {
                let index = self
                    .ast
                    .decl(owner)
                    .generic_params()
                    .and_then(|list| list.params.iter().position(|&p| p == param))
                    .unwrap_or(0) as u32;
                (self.generic_depth(owner), index)
            }
            None => (0, 0),
        };
        if let Some(data) = self.ast.decl_mut(param).as_type_param_mut() {
            data.depth = depth;
            data.index = index;
        }
        self.types.intern(TypeShape::GenericParam {
            decl: param,
            name,
            depth,
            index,
        })
    }

    /// Number of generic contexts enclosing `owner`.
    fn generic_depth(&self, owner: DeclId) -> u32 {
        let mut depth = 0;
        let mut current = Some(self.ast.decl(owner).parent);
        while let Some(dc) = current {
            let generic = match dc {
                DeclContext::Nominal(_) | DeclContext::Extension(_) => {
                    self.ast.nominal_of(dc).is_some_and(|n| {
                        let n = self.ast.decl(n);
                        n.is_protocol() || n.generic_params().is_some()
                    })
                }
                DeclContext::Function(f) => self.ast.decl(f).generic_params().is_some(),
                _ => false,
            };
            if generic {
                depth += 1;
            }
            current = self.ast.parent_context(dc);
        }
        depth
    }

    /// Whether `dc` lies inside the body of nominal `decl` or one of its extensions.
    fn is_within(&self, dc: DeclContext, decl: DeclId) -> bool {
        let mut current = Some(dc);
        while let Some(dc) = current {
            if dc.is_type_context() && self.ast.nominal_of(dc) == Some(decl) {
                return true;
            }
            current = self.ast.parent_context(dc);
        }
        false
    }

    /// Replace generic parameters and associated types by their archetypes.
    pub(super) fn map_to_archetypes(&mut self, ty: TypeId) -> TypeId {
        if self.contextual.is_empty() {
            return ty;
        }
        let map = &self.contextual;
        self.types.transform(ty, &mut |_, t| map.get(&t).copied())
    }
}
