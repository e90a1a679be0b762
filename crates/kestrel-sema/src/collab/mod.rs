//! Collaborators the declaration checker consumes but does not own.
//!
//! Name lookup, expression type checking and archetype construction are
//! traits so a full compiler can plug in its own implementations. The
//! defaults here are small and arena-backed.

mod archetypes;
mod literal;
mod lookup;


use kestrel_core::{DeclName, Symbol};

use crate::ast::{Ast, DeclContext, DeclId, Expr, Fixity};
use crate::prelude::KnownDecls;
use crate::types::{TypeContext, TypeId};

pub use archetypes::{ArchetypeBuilderImpl, DefaultArchetypes};
pub use literal::LiteralChecker;
pub use lookup::ArenaLookup;
pub(crate) use literal::nominal_conforms;
pub(crate) use lookup::extensions_of;

/// What a member lookup may look through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    /// Include members declared in extensions of the nominal.
    pub extensions: bool,
    /// Continue into the superclass chain.
    pub superclasses: bool,
    /// Compare base names only, ignoring argument labels.
    pub base_name_only: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            extensions: true,
            superclasses: true,
            base_name_only: false,
        }
    }
}

impl LookupOptions {
    pub fn direct() -> Self {
        Self {
            extensions: true,
            superclasses: false,
            base_name_only: false,
        }
    }

    pub fn by_base_name(mut self) -> Self {
        self.base_name_only = true;
        self
    }
}

pub trait NameLookup {
    /// Declarations visible as `name` from `dc`, innermost scope first.
    /// Stops at the first scope that declares the name.
    fn lookup_unqualified(&self, ast: &Ast, dc: DeclContext, name: Symbol) -> Vec<DeclId>;

    /// Members of `nominal` matching `name`.
    fn lookup_member(
        &self,
        ast: &Ast,
        types: &TypeContext,
        nominal: DeclId,
        name: &DeclName,
        options: LookupOptions,
    ) -> Vec<DeclId>;

    /// Initializers declared on `nominal` or its extensions.
    fn lookup_constructors(&self, ast: &Ast, nominal: DeclId) -> Vec<DeclId>;

    fn lookup_operator(&self, ast: &Ast, name: Symbol, fixity: Fixity) -> Option<DeclId>;
}

/// Read access to the module handed to an [`ExprChecker`].
pub struct ExprContext<'a> {
    pub ast: &'a Ast,
    pub types: &'a mut TypeContext,
    pub known: &'a KnownDecls,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("cannot convert value of type '{found}' to specified type '{expected}'")]
    Mismatch { found: String, expected: String },

    #[error("'nil' requires a contextual type")]
    NilWithoutContext,

    #[error("type of expression is ambiguous without more context")]
    Ambiguous,
}

/// Expression type checker oracle.
pub trait ExprChecker {
    /// Type-check `expr` in `dc`, converting it to `contextual` when given.
    /// Assigns `expr.ty` (and subexpression types) on success.
    fn type_check(
        &mut self,
        cx: &mut ExprContext<'_>,
        expr: &mut Expr,
        dc: DeclContext,
        contextual: Option<TypeId>,
    ) -> Result<TypeId, ExprError>;
}

/// A generic parameter or associated type registered with a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotentialArchetype {
    /// Declaration of the parameter or associated type.
    pub decl: DeclId,
    pub name: Symbol,
    /// Interface type naming it (`GenericParam` or `DependentMember`).
    pub interface: TypeId,
}

/// Result of finalizing a builder, per potential archetype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeAssignment {
    pub decl: DeclId,
    pub interface: TypeId,
    pub archetype: TypeId,
    pub protocols: Vec<DeclId>,
    pub superclass: Option<TypeId>,
}

/// Requirement rejected by an [`ArchetypeBuilder`]; carries the offending type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ArchetypeError {
    #[error("type does not name a generic parameter or associated type")]
    NotAParameter(TypeId),

    #[error("same-type requirement makes a generic parameter non-generic")]
    ConcreteSameType(TypeId),
}

/// Collects generic parameters and requirements of one signature and
/// assigns archetypes.
pub trait ArchetypeBuilder {
    fn add_param(&mut self, param: PotentialArchetype);

    fn add_conformance(
        &mut self,
        types: &TypeContext,
        subject: TypeId,
        protocol: DeclId,
    ) -> Result<(), ArchetypeError>;

    fn add_superclass(
        &mut self,
        types: &TypeContext,
        subject: TypeId,
        superclass: TypeId,
    ) -> Result<(), ArchetypeError>;

    fn add_same_type(
        &mut self,
        types: &TypeContext,
        first: TypeId,
        second: TypeId,
    ) -> Result<(), ArchetypeError>;

    /// Assign archetypes. Equivalent parameters share the archetype of the
    /// first one added.
    fn finalize(&mut self, types: &mut TypeContext) -> Vec<ArchetypeAssignment>;
}

pub trait ArchetypeBuilderFactory {
    fn create(&self) -> Box<dyn ArchetypeBuilder>;
}
