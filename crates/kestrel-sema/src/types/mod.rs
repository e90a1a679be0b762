//! Interned semantic types.
//!
//! Types are hash-consed: structurally equal shapes share one [`TypeId`].
//! Type aliases are kept as sugar ([`TypeShape::Alias`]) so diagnostics can
//! print what the user wrote; identity comparisons go through
//! [`TypeContext::canonical`].

mod display;
mod transform;


use std::collections::HashMap;

use kestrel_core::Symbol;
use serde::Serialize;

use crate::ast::{DeclId, NominalKind, Ownership};

pub use display::TypeDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

pub const TYPE_ERROR: TypeId = TypeId(0);
pub const TYPE_UNIT: TypeId = TypeId(1);
pub const TYPE_RAW_POINTER: TypeId = TypeId(2);
pub const TYPE_INT1: TypeId = TypeId(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    RawPointer,
    Int1,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleElement {
    pub label: Option<Symbol>,
    pub ty: TypeId,
    pub variadic: bool,
}

impl TupleElement {
    pub fn new(label: Option<Symbol>, ty: TypeId) -> Self {
        Self {
            label,
            ty,
            variadic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
    Error,
    Builtin(BuiltinType),
    Tuple(Vec<TupleElement>),
    Function {
        input: TypeId,
        result: TypeId,
        no_return: bool,
    },
    Metatype(TypeId),
    Optional(TypeId),
    ImplicitlyUnwrappedOptional(TypeId),
    InOut(TypeId),
    ReferenceStorage {
        ownership: Ownership,
        referent: TypeId,
    },
    /// Nominal type, bound to `args` when generic.
    Nominal {
        kind: NominalKind,
        decl: DeclId,
        name: Symbol,
        args: Vec<TypeId>,
    },
    /// Generic nominal named without arguments.
    UnboundGeneric {
        kind: NominalKind,
        decl: DeclId,
        name: Symbol,
    },
    /// Generic parameter in interface position.
    GenericParam {
        decl: DeclId,
        name: Symbol,
        depth: u32,
        index: u32,
    },
    /// Generic parameter or associated type inside its generic context.
    Archetype { decl: DeclId, name: Symbol },
    /// `Base.Name` where `Name` is an associated type.
    DependentMember {
        base: TypeId,
        assoc: DeclId,
        name: Symbol,
    },
    Composition(Vec<TypeId>),
    Alias {
        decl: DeclId,
        name: Symbol,
        underlying: TypeId,
    },
}

/// Interning table for types.
#[derive(Debug, Clone)]
pub struct TypeContext {
    types: Vec<TypeShape>,
    type_map: HashMap<TypeShape, TypeId>,
    canonical: HashMap<TypeId, TypeId>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            types: Vec::new(),
            type_map: HashMap::new(),
            canonical: HashMap::new(),
        };

        let error = ctx.intern(TypeShape::Error);
        debug_assert_eq!(error, TYPE_ERROR);
        let unit = ctx.intern(TypeShape::Tuple(Vec::new()));
        debug_assert_eq!(unit, TYPE_UNIT);
        let raw_pointer = ctx.intern(TypeShape::Builtin(BuiltinType::RawPointer));
        debug_assert_eq!(raw_pointer, TYPE_RAW_POINTER);
        let int1 = ctx.intern(TypeShape::Builtin(BuiltinType::Int1));
        debug_assert_eq!(int1, TYPE_INT1);

        ctx
    }

    pub fn intern(&mut self, shape: TypeShape) -> TypeId {
        if let Some(&id) = self.type_map.get(&shape) {
            return id;
        }

        let id = TypeId(self.types.len() as u32);
        self.types.push(shape.clone());
        self.type_map.insert(shape, id);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeShape {
        &self.types[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn tuple(&mut self, elements: Vec<TupleElement>) -> TypeId {
        self.intern(TypeShape::Tuple(elements))
    }

    pub fn function(&mut self, input: TypeId, result: TypeId) -> TypeId {
        self.intern(TypeShape::Function {
            input,
            result,
            no_return: false,
        })
    }

    pub fn metatype(&mut self, instance: TypeId) -> TypeId {
        self.intern(TypeShape::Metatype(instance))
    }

    pub fn optional(&mut self, object: TypeId) -> TypeId {
        self.intern(TypeShape::Optional(object))
    }

    pub fn inout(&mut self, object: TypeId) -> TypeId {
        self.intern(TypeShape::InOut(object))
    }

    /// Canonical form: aliases expanded everywhere.
    pub fn canonical(&mut self, id: TypeId) -> TypeId {
        if let Some(&c) = self.canonical.get(&id) {
            return c;
        }
        let result = self.transform(id, &mut |ctx, t| match *ctx.get(t) {
            TypeShape::Alias { underlying, .. } => Some(ctx.canonical(underlying)),
            _ => None,
        });
        self.canonical.insert(id, result);
        result
    }

    pub fn same_type(&mut self, a: TypeId, b: TypeId) -> bool {
        a == b || self.canonical(a) == self.canonical(b)
    }

    /// Strip top-level alias sugar.
    pub fn desugar(&self, mut id: TypeId) -> TypeId {
        while let TypeShape::Alias { underlying, .. } = *self.get(id) {
            id = underlying;
        }
        id
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        matches!(self.get(self.desugar(id)), TypeShape::Error)
    }

    pub fn contains_error(&self, id: TypeId) -> bool {
        let mut found = false;
        self.walk(id, &mut |shape| found |= matches!(shape, TypeShape::Error));
        found
    }

    /// Visit `id` and every component type, aliases included.
    pub fn walk(&self, id: TypeId, f: &mut impl FnMut(&TypeShape)) {
        let shape = self.get(id);
        f(shape);
        match shape {
            TypeShape::Tuple(elements) => {
                for e in elements {
                    self.walk(e.ty, f);
                }
            }
            TypeShape::Function { input, result, .. } => {
                self.walk(*input, f);
                self.walk(*result, f);
            }
            TypeShape::Metatype(t)
            | TypeShape::Optional(t)
            | TypeShape::ImplicitlyUnwrappedOptional(t)
            | TypeShape::InOut(t)
            | TypeShape::ReferenceStorage { referent: t, .. }
            | TypeShape::DependentMember { base: t, .. }
            | TypeShape::Alias { underlying: t, .. } => self.walk(*t, f),
            TypeShape::Nominal { args, .. } => {
                for a in args {
                    self.walk(*a, f);
                }
            }
            TypeShape::Composition(members) => {
                for m in members {
                    self.walk(*m, f);
                }
            }
            _ => {}
        }
    }

    /// Types that can be stored in a variable (no `inout` inside).
    pub fn is_materializable(&self, id: TypeId) -> bool {
        match self.get(self.desugar(id)) {
            TypeShape::InOut(_) => false,
            TypeShape::Tuple(elements) => elements.iter().all(|e| self.is_materializable(e.ty)),
            _ => true,
        }
    }

    /// Payload of `T?` or `T!`.
    pub fn optional_object(&self, id: TypeId) -> Option<TypeId> {
        match *self.get(self.desugar(id)) {
            TypeShape::Optional(t) | TypeShape::ImplicitlyUnwrappedOptional(t) => Some(t),
            _ => None,
        }
    }

    /// Referent of `weak`/`unowned` storage, or the type itself.
    pub fn reference_storage_referent(&self, id: TypeId) -> TypeId {
        match *self.get(self.desugar(id)) {
            TypeShape::ReferenceStorage { referent, .. } => referent,
            _ => id,
        }
    }

    pub fn is_reference_storage(&self, id: TypeId) -> bool {
        matches!(self.get(self.desugar(id)), TypeShape::ReferenceStorage { .. })
    }

    pub fn nominal_decl(&self, id: TypeId) -> Option<DeclId> {
        match *self.get(self.desugar(id)) {
            TypeShape::Nominal { decl, .. } | TypeShape::UnboundGeneric { decl, .. } => Some(decl),
            _ => None,
        }
    }

    pub fn nominal_kind(&self, id: TypeId) -> Option<NominalKind> {
        match *self.get(self.desugar(id)) {
            TypeShape::Nominal { kind, .. } | TypeShape::UnboundGeneric { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn class_decl(&self, id: TypeId) -> Option<DeclId> {
        self.nominal_decl(id)
            .filter(|_| self.nominal_kind(id) == Some(NominalKind::Class))
    }

    pub fn is_class(&self, id: TypeId) -> bool {
        self.class_decl(id).is_some()
    }

    /// Protocols and protocol compositions.
    pub fn is_existential(&self, id: TypeId) -> bool {
        match self.get(self.desugar(id)) {
            TypeShape::Composition(_) => true,
            _ => self.nominal_kind(id) == Some(NominalKind::Protocol),
        }
    }

    /// Protocols named by an existential type, flattened.
    pub fn existential_protocols(&self, id: TypeId) -> Vec<DeclId> {
        let id = self.desugar(id);
        match self.get(id) {
            TypeShape::Composition(members) => members
                .iter()
                .flat_map(|&m| self.existential_protocols(m))
                .collect(),
            _ if self.nominal_kind(id) == Some(NominalKind::Protocol) => {
                self.nominal_decl(id).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn tuple_elements(&self, id: TypeId) -> Option<&[TupleElement]> {
        match self.get(self.desugar(id)) {
            TypeShape::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    /// `(input, result, no_return)` of a function type.
    pub fn function_parts(&self, id: TypeId) -> Option<(TypeId, TypeId, bool)> {
        match *self.get(self.desugar(id)) {
            TypeShape::Function {
                input,
                result,
                no_return,
            } => Some((input, result, no_return)),
            _ => None,
        }
    }

    pub fn function_result(&self, id: TypeId) -> Option<TypeId> {
        self.function_parts(id).map(|(_, result, _)| result)
    }

    pub fn metatype_instance(&self, id: TypeId) -> Option<TypeId> {
        match *self.get(self.desugar(id)) {
            TypeShape::Metatype(t) => Some(t),
            _ => None,
        }
    }
}
