//! Variable-introducing patterns of pattern bindings.

use rowan::TextRange;

use super::{TypeLoc, decl::DeclId};
use crate::types::TypeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub range: TextRange,
    pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternKind {
    /// Binds one variable.
    Named(DeclId),
    /// `_`
    Any,
    Tuple(Vec<Pattern>),
    /// `pattern: Type`
    Typed { sub: Box<Pattern>, annotation: TypeLoc },
    Paren(Box<Pattern>),
    /// `var pattern` / `let pattern`
    Var(Box<Pattern>),
}

impl Pattern {
    pub fn new(kind: PatternKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            ty: None,
        }
    }

    pub fn named(var: DeclId, range: TextRange) -> Self {
        Self::new(PatternKind::Named(var), range)
    }

    pub fn typed(sub: Pattern, annotation: TypeLoc) -> Self {
        let range = match annotation.range() {
            Some(r) => sub.range.cover(r),
            None => sub.range,
        };
        Self::new(
            PatternKind::Typed {
                sub: Box::new(sub),
                annotation,
            },
            range,
        )
    }

    /// Variables bound by this pattern, in source order.
    pub fn bound_vars(&self) -> Vec<DeclId> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<DeclId>) {
        match &self.kind {
            PatternKind::Named(var) => out.push(*var),
            PatternKind::Any => {}
            PatternKind::Tuple(elements) => {
                for e in elements {
                    e.collect_vars(out);
                }
            }
            PatternKind::Typed { sub, .. } | PatternKind::Paren(sub) | PatternKind::Var(sub) => {
                sub.collect_vars(out)
            }
        }
    }

    /// The outermost type annotation, looking through parens and `var`.
    pub fn annotation(&self) -> Option<&TypeLoc> {
        match &self.kind {
            PatternKind::Typed { annotation, .. } => Some(annotation),
            PatternKind::Paren(sub) | PatternKind::Var(sub) => sub.annotation(),
            _ => None,
        }
    }

    /// Pattern with parens and `var` stripped.
    pub fn semantics_providing(&self) -> &Pattern {
        match &self.kind {
            PatternKind::Paren(sub) | PatternKind::Var(sub) => sub.semantics_providing(),
            _ => self,
        }
    }
}
