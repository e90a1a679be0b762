//! Cycle detection over inheritance relations.
//!
//! Classes inherit a class, protocols inherit protocols and enums inherit a
//! raw type. A depth-first walk shares [`Elaborator::circularity_path`]
//! between nested checks; reaching a declaration that is still on the path
//! closes a cycle, which is reported once and broken at that declaration.

use tracing::debug;

use super::Elaborator;
use crate::ast::{DeclId, DeclKind};
use crate::diagnostics::DiagnosticKind;
use crate::state::{CheckState, Entry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Class,
    Protocol,
    RawType,
}

impl Relation {
    fn of(kind: &DeclKind) -> Option<Self> {
        match kind {
            DeclKind::Class(_) => Some(Relation::Class),
            DeclKind::Protocol(_) => Some(Relation::Protocol),
            DeclKind::Enum(_) => Some(Relation::RawType),
            _ => None,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Relation::Class => "class inheritance",
            Relation::Protocol => "protocol inheritance",
            Relation::RawType => "enum raw types",
        }
    }
}

impl Elaborator {
    /// Check the inheritance relation of `d` for cycles, once.
    pub(super) fn check_circularity(&mut self, d: DeclId) {
        if Relation::of(&self.ast.decl(d).kind).is_none()
            || self.ast.decl(d).state.circularity != CheckState::Unchecked
        {
            return;
        }
        self.visit_circularity(d);
    }

    fn visit_circularity(&mut self, d: DeclId) {
        match self.ast.decl_mut(d).state.circularity.enter() {
            Entry::Done => return,
            Entry::Reentrant => {
                self.break_cycle(d);
                return;
            }
            Entry::Fresh => {}
        }

        self.circularity_path.push(d);
        for next in self.inherited_decls(d) {
            self.visit_circularity(next);
        }
        self.circularity_path.pop();
        self.ast.decl_mut(d).state.circularity.finish();
    }

    /// Declarations `d` inherits from under its relation.
    fn inherited_decls(&mut self, d: DeclId) -> Vec<DeclId> {
        self.resolve_inheritance(d);
        let decl = self.ast.decl(d);
        match &decl.kind {
            DeclKind::Class(n) => n
                .superclass
                .and_then(|s| self.types.class_decl(s))
                .into_iter()
                .collect(),
            DeclKind::Protocol(n) => n.protocols.iter().copied().collect(),
            DeclKind::Enum(n) => n
                .raw_type
                .and_then(|raw| self.types.nominal_decl(raw))
                .filter(|&r| matches!(self.ast.decl(r).kind, DeclKind::Enum(_)))
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    fn break_cycle(&mut self, d: DeclId) {
        let Some(relation) = Relation::of(&self.ast.decl(d).kind) else {
            return;
        };
        let start = self
            .circularity_path
            .iter()
            .position(|&p| p == d)
            .unwrap_or(self.circularity_path.len());
        let cycle: Vec<DeclId> = self.circularity_path[start..].to_vec();

        let message = if cycle.len() <= 1 {
            format!("circular {} '{}'", relation.description(), self.name(d))
        } else {
            let path = cycle
                .iter()
                .chain(std::iter::once(&d))
                .map(|&p| format!("'{}'", self.name(p)))
                .collect::<Vec<_>>()
                .join(" -> ");
            format!("circular {} {path}", relation.description())
        };
        debug!(decl = %self.name(d), length = cycle.len(), "breaking inheritance cycle");

        let notes: Vec<_> = cycle
            .iter()
            .skip(1)
            .map(|&p| self.span(p))
            .collect();
        let span = self.span(d);
        let mut diag = self
            .report(DiagnosticKind::CircularInheritance, span)
            .message(message);
        for note in notes {
            diag = diag.related_to("declared here", note);
        }
        diag.emit();

        self.mark_invalid(d);
        match &mut self.ast.decl_mut(d).kind {
            DeclKind::Class(n) => n.superclass = None,
            DeclKind::Protocol(n) => {
                n.protocols.clear();
                n.conformances.clear();
            }
            DeclKind::Enum(n) => n.raw_type = None,
            _ => {}
        }
    }
}
