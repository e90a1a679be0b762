//! Structural type rewriting.

use std::collections::HashMap;

use super::{TupleElement, TypeContext, TypeId, TypeShape};
use crate::ast::DeclId;

impl TypeContext {
    /// Rebuild `id` bottom-up. `f` is asked first for every node; returning
    /// `Some` replaces the node without descending into it.
    pub fn transform(
        &mut self,
        id: TypeId,
        f: &mut dyn FnMut(&mut TypeContext, TypeId) -> Option<TypeId>,
    ) -> TypeId {
        if let Some(replacement) = f(self, id) {
            return replacement;
        }

        let shape = match self.get(id).clone() {
            TypeShape::Tuple(elements) => TypeShape::Tuple(
                elements
                    .into_iter()
                    .map(|e| TupleElement {
                        ty: self.transform(e.ty, f),
                        ..e
                    })
                    .collect(),
            ),
            TypeShape::Function {
                input,
                result,
                no_return,
            } => TypeShape::Function {
                input: self.transform(input, f),
                result: self.transform(result, f),
                no_return,
            },
            TypeShape::Metatype(t) => TypeShape::Metatype(self.transform(t, f)),
            TypeShape::Optional(t) => TypeShape::Optional(self.transform(t, f)),
            TypeShape::ImplicitlyUnwrappedOptional(t) => {
                TypeShape::ImplicitlyUnwrappedOptional(self.transform(t, f))
            }
            TypeShape::InOut(t) => TypeShape::InOut(self.transform(t, f)),
            TypeShape::ReferenceStorage {
                ownership,
                referent,
            } => TypeShape::ReferenceStorage {
                ownership,
                referent: self.transform(referent, f),
            },
            TypeShape::Nominal {
                kind,
                decl,
                name,
                args,
            } if !args.is_empty() => TypeShape::Nominal {
                kind,
                decl,
                name,
                args: args.into_iter().map(|a| self.transform(a, f)).collect(),
            },
            TypeShape::DependentMember { base, assoc, name } => TypeShape::DependentMember {
                base: self.transform(base, f),
                assoc,
                name,
            },
            TypeShape::Composition(members) => TypeShape::Composition(
                members.into_iter().map(|m| self.transform(m, f)).collect(),
            ),
            TypeShape::Alias {
                decl,
                name,
                underlying,
            } => TypeShape::Alias {
                decl,
                name,
                underlying: self.transform(underlying, f),
            },
            _ => return id,
        };
        self.intern(shape)
    }

    /// Replace generic parameters and archetypes whose declaration is a key
    /// of `map`.
    pub fn substitute(&mut self, id: TypeId, map: &HashMap<DeclId, TypeId>) -> TypeId {
        if map.is_empty() {
            return id;
        }
        self.transform(id, &mut |ctx, t| match *ctx.get(t) {
            TypeShape::GenericParam { decl, .. } | TypeShape::Archetype { decl, .. } => {
                map.get(&decl).copied()
            }
            _ => None,
        })
    }

    /// Replace `Base.Assoc` members by the associated type witnesses in
    /// `witnesses`, keyed by associated type declaration.
    pub fn substitute_members(
        &mut self,
        id: TypeId,
        witnesses: &HashMap<DeclId, TypeId>,
    ) -> TypeId {
        if witnesses.is_empty() {
            return id;
        }
        self.transform(id, &mut |ctx, t| match *ctx.get(t) {
            TypeShape::DependentMember { assoc, .. } => witnesses.get(&assoc).copied(),
            _ => None,
        })
    }
}
