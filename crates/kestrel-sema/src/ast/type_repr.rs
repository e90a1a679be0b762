//! Written type annotations and their resolution slots.

use kestrel_core::Symbol;
use rowan::TextRange;

use super::{Ownership, decl::DeclId};
use crate::types::TypeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRepr {
    pub kind: TypeReprKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeReprKind {
    /// `A`, `A.B`, `A<Int>.C`.
    Ident(Vec<IdentComponent>),
    Tuple(Vec<TupleReprElement>),
    Function {
        input: Box<TypeRepr>,
        result: Box<TypeRepr>,
    },
    Optional(Box<TypeRepr>),
    ImplicitlyUnwrappedOptional(Box<TypeRepr>),
    Metatype(Box<TypeRepr>),
    InOut(Box<TypeRepr>),
    /// `protocol<A, B>`.
    Composition(Vec<TypeRepr>),
    Ownership {
        ownership: Ownership,
        referent: Box<TypeRepr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentComponent {
    pub name: Symbol,
    pub args: Vec<TypeRepr>,
    pub range: TextRange,
    /// Declaration this component resolved to, recorded by type resolution.
    pub bound: Option<DeclId>,
}

impl IdentComponent {
    pub fn new(name: Symbol, range: TextRange) -> Self {
        Self {
            name,
            args: Vec::new(),
            range,
            bound: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleReprElement {
    pub label: Option<Symbol>,
    pub ty: TypeRepr,
    pub variadic: bool,
}

impl TypeRepr {
    pub fn ident(name: Symbol, range: TextRange) -> Self {
        Self {
            kind: TypeReprKind::Ident(vec![IdentComponent::new(name, range)]),
            range,
        }
    }

    pub fn optional(inner: TypeRepr, range: TextRange) -> Self {
        Self {
            kind: TypeReprKind::Optional(Box::new(inner)),
            range,
        }
    }

    /// Visit the repr and all nested reprs, outermost first.
    pub fn walk(&self, f: &mut impl FnMut(&TypeRepr)) {
        f(self);
        match &self.kind {
            TypeReprKind::Ident(components) => {
                for c in components {
                    for arg in &c.args {
                        arg.walk(f);
                    }
                }
            }
            TypeReprKind::Tuple(elements) => {
                for e in elements {
                    e.ty.walk(f);
                }
            }
            TypeReprKind::Function { input, result } => {
                input.walk(f);
                result.walk(f);
            }
            TypeReprKind::Optional(inner)
            | TypeReprKind::ImplicitlyUnwrappedOptional(inner)
            | TypeReprKind::Metatype(inner)
            | TypeReprKind::InOut(inner)
            | TypeReprKind::Ownership {
                referent: inner, ..
            } => inner.walk(f),
            TypeReprKind::Composition(members) => {
                for m in members {
                    m.walk(f);
                }
            }
        }
    }

    /// Clear resolution results so the repr can be resolved again.
    pub fn revert(&mut self) {
        match &mut self.kind {
            TypeReprKind::Ident(components) => {
                for c in components {
                    c.bound = None;
                    for arg in &mut c.args {
                        arg.revert();
                    }
                }
            }
            TypeReprKind::Tuple(elements) => {
                for e in elements {
                    e.ty.revert();
                }
            }
            TypeReprKind::Function { input, result } => {
                input.revert();
                result.revert();
            }
            TypeReprKind::Optional(inner)
            | TypeReprKind::ImplicitlyUnwrappedOptional(inner)
            | TypeReprKind::Metatype(inner)
            | TypeReprKind::InOut(inner)
            | TypeReprKind::Ownership {
                referent: inner, ..
            } => inner.revert(),
            TypeReprKind::Composition(members) => {
                for m in members {
                    m.revert();
                }
            }
        }
    }
}

/// A type annotation: the written form (absent for synthesized
/// declarations) plus the resolved type once validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeLoc {
    pub repr: Option<TypeRepr>,
    pub ty: Option<TypeId>,
    pub invalid: bool,
}

impl TypeLoc {
    pub fn new(repr: TypeRepr) -> Self {
        Self {
            repr: Some(repr),
            ty: None,
            invalid: false,
        }
    }

    /// A resolved annotation with no source form.
    pub fn without_loc(ty: TypeId) -> Self {
        Self {
            repr: None,
            ty: Some(ty),
            invalid: false,
        }
    }

    pub fn range(&self) -> Option<TextRange> {
        self.repr.as_ref().map(|r| r.range)
    }

    pub fn is_resolved(&self) -> bool {
        self.ty.is_some()
    }

    pub fn revert(&mut self) {
        if let Some(repr) = &mut self.repr {
            repr.revert();
            self.ty = None;
        }
    }
}
