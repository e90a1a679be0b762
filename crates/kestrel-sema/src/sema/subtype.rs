//! Subtyping used by override matching.

use std::collections::HashMap;

use super::Elaborator;
use crate::types::{TypeId, TypeShape};

impl Elaborator {
    /// Whether a value of type `sub` can be used where `sup` is expected:
    /// identity, class upcasts, optional injection, existential erasure,
    /// and functions with contravariant input and covariant result.
    pub(super) fn is_subtype_of(&mut self, sub: TypeId, sup: TypeId) -> bool {
        if self.types.same_type(sub, sup) {
            return true;
        }
        let sub = self.types.canonical(sub);
        let sup = self.types.canonical(sup);

        match (self.types.get(sub).clone(), self.types.get(sup).clone()) {
            (TypeShape::Optional(a), TypeShape::Optional(b))
            | (TypeShape::ImplicitlyUnwrappedOptional(a), TypeShape::ImplicitlyUnwrappedOptional(b))
            | (TypeShape::ImplicitlyUnwrappedOptional(a), TypeShape::Optional(b))
            | (TypeShape::Optional(a), TypeShape::ImplicitlyUnwrappedOptional(b)) => {
                self.is_subtype_of(a, b)
            }
            (_, TypeShape::Optional(b)) | (_, TypeShape::ImplicitlyUnwrappedOptional(b)) => {
                self.is_subtype_of(sub, b)
            }
            (TypeShape::Metatype(a), TypeShape::Metatype(b)) => self.is_subtype_of(a, b),
            (
                TypeShape::Function {
                    input: in_a,
                    result: res_a,
                    no_return: nr_a,
                },
                TypeShape::Function {
                    input: in_b,
                    result: res_b,
                    no_return: nr_b,
                },
            ) => (nr_a || !nr_b) && self.is_subtype_of(in_b, in_a) && self.is_subtype_of(res_a, res_b),
            (TypeShape::Tuple(a), TypeShape::Tuple(b)) => {
                a.len() == b.len()
                    && a.iter().zip(&b).all(|(x, y)| x.label == y.label && x.variadic == y.variadic)
                    && a.iter().zip(&b).all(|(x, y)| self.is_subtype_of(x.ty, y.ty))
            }
            _ if self.types.is_existential(sup) => {
                let required = self.types.existential_protocols(sup);
                required.into_iter().all(|p| self.type_conforms_to(sub, p))
            }
            _ if self.types.is_class(sub) && self.types.is_class(sup) => {
                self.superclass_chain(sub).into_iter().any(|t| t == sup)
            }
            _ => false,
        }
    }

    /// `ty` followed by its superclasses, canonical and with generic
    /// arguments substituted.
    pub(super) fn superclass_chain(&mut self, ty: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = Some(self.types.canonical(ty));
        while let Some(t) = current {
            if chain.contains(&t) {
                break;
            }
            chain.push(t);
            current = self.superclass_of_type(t);
        }
        chain
    }

    /// Superclass of class type `ty` with the arguments of `ty` applied.
    fn superclass_of_type(&mut self, ty: TypeId) -> Option<TypeId> {
        let class = self.types.class_decl(ty)?;
        self.resolve_inheritance(class);
        let superclass = self.ast.decl(class).as_nominal()?.superclass?;

        let args = match self.types.get(self.types.desugar(ty)) {
            TypeShape::Nominal { args, .. } => args.clone(),
            _ => Vec::new(),
        };
        let params: Vec<_> = self
            .ast
            .decl(class)
            .generic_params()
            .map(|list| list.params.clone())
            .unwrap_or_default();
        let map: HashMap<_, _> = params.into_iter().zip(args).collect();
        let substituted = if map.is_empty() {
            superclass
        } else {
            self.types.substitute(superclass, &map)
        };
        Some(self.types.canonical(substituted))
    }
}
