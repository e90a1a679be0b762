//! Union-find archetype builder.
//!
//! Every generic parameter and associated type is a node. Same-type
//! requirements merge classes; the first node added to a class is its
//! representative and names the shared archetype.

use std::collections::HashMap;

use indexmap::IndexSet;

use super::{
    ArchetypeAssignment, ArchetypeBuilder, ArchetypeBuilderFactory, ArchetypeError,
    PotentialArchetype,
};
use crate::ast::DeclId;
use crate::types::{TypeContext, TypeId, TypeShape};

#[derive(Debug, Clone)]
struct Node {
    param: PotentialArchetype,
    parent: usize,
    protocols: IndexSet<DeclId>,
    superclass: Option<TypeId>,
}

#[derive(Debug, Clone, Default)]
pub struct ArchetypeBuilderImpl {
    nodes: Vec<Node>,
    by_type: HashMap<TypeId, usize>,
}

impl ArchetypeBuilderImpl {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.nodes[i].parent != i {
            let grandparent = self.nodes[self.nodes[i].parent].parent;
            self.nodes[i].parent = grandparent;
            i = grandparent;
        }
        i
    }

    /// Node for `ty`, creating nodes for members of known parameters on demand.
    fn node_of(&mut self, types: &TypeContext, ty: TypeId) -> Option<usize> {
        let ty = types.desugar(ty);
        if let Some(&i) = self.by_type.get(&ty) {
            return Some(i);
        }
        match *types.get(ty) {
            TypeShape::DependentMember { base, assoc, name } => {
                self.node_of(types, base)?;
                self.add_param(PotentialArchetype {
                    decl: assoc,
                    name,
                    interface: ty,
                });
                self.by_type.get(&ty).copied()
            }
            _ => None,
        }
    }

    fn is_parameter_like(types: &TypeContext, ty: TypeId) -> bool {
        matches!(
            types.get(types.desugar(ty)),
            TypeShape::GenericParam { .. }
                | TypeShape::DependentMember { .. }
                | TypeShape::Archetype { .. }
        )
    }
}

impl ArchetypeBuilder for ArchetypeBuilderImpl {
    fn add_param(&mut self, param: PotentialArchetype) {
        if self.by_type.contains_key(&param.interface) {
            return;
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            param,
            parent: index,
            protocols: IndexSet::new(),
            superclass: None,
        });
        self.by_type.insert(param.interface, index);
    }

    fn add_conformance(
        &mut self,
        types: &TypeContext,
        subject: TypeId,
        protocol: DeclId,
    ) -> Result<(), ArchetypeError> {
        let node = self
            .node_of(types, subject)
            .ok_or(ArchetypeError::NotAParameter(subject))?;
        let rep = self.find(node);
        self.nodes[rep].protocols.insert(protocol);
        Ok(())
    }

    fn add_superclass(
        &mut self,
        types: &TypeContext,
        subject: TypeId,
        superclass: TypeId,
    ) -> Result<(), ArchetypeError> {
        let node = self
            .node_of(types, subject)
            .ok_or(ArchetypeError::NotAParameter(subject))?;
        let rep = self.find(node);
        self.nodes[rep].superclass.get_or_insert(superclass);
        Ok(())
    }

    fn add_same_type(
        &mut self,
        types: &TypeContext,
        first: TypeId,
        second: TypeId,
    ) -> Result<(), ArchetypeError> {
        let a = self.node_of(types, first);
        let b = self.node_of(types, second);
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) => (a, b),
            (Some(_), None) if !Self::is_parameter_like(types, second) => {
                return Err(ArchetypeError::ConcreteSameType(first));
            }
            (None, Some(_)) if !Self::is_parameter_like(types, first) => {
                return Err(ArchetypeError::ConcreteSameType(second));
            }
            (None, _) => return Err(ArchetypeError::NotAParameter(first)),
            (_, None) => return Err(ArchetypeError::NotAParameter(second)),
        };

        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return Ok(());
        }
        let (rep, other) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.nodes[other].parent = rep;
        let protocols = std::mem::take(&mut self.nodes[other].protocols);
        self.nodes[rep].protocols.extend(protocols);
        if self.nodes[rep].superclass.is_none() {
            self.nodes[rep].superclass = self.nodes[other].superclass;
        }
        Ok(())
    }

    fn finalize(&mut self, types: &mut TypeContext) -> Vec<ArchetypeAssignment> {
        (0..self.nodes.len())
            .map(|i| {
                let rep = self.find(i);
                let representative = &self.nodes[rep];
                let archetype = types.intern(TypeShape::Archetype {
                    decl: representative.param.decl,
                    name: representative.param.name,
                });
                ArchetypeAssignment {
                    decl: self.nodes[i].param.decl,
                    interface: self.nodes[i].param.interface,
                    archetype,
                    protocols: representative.protocols.iter().copied().collect(),
                    superclass: representative.superclass,
                }
            })
            .collect()
    }
}

/// Factory producing [`ArchetypeBuilderImpl`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultArchetypes;

impl ArchetypeBuilderFactory for DefaultArchetypes {
    fn create(&self) -> Box<dyn ArchetypeBuilder> {
        Box::new(ArchetypeBuilderImpl::new())
    }
}
