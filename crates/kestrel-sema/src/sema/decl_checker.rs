//! The declaration visitor: two sweeps over every file of the module.
//!
//! The first sweep validates signatures and synthesizes implicit members.
//! The second checks properties that relate declarations to each other:
//! overrides, conformances, accessibility and enum raw values. Each sweep
//! visits a declaration at most once; members synthesized while a context
//! is being visited are picked up by the same loop.

use tracing::{debug, instrument, trace};

use super::Elaborator;
use crate::ast::{DeclId, DeclKind, FileId, FileKind};

/// Which sweep a visit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Sweep {
    Signatures,
    Bodies,
}

impl Elaborator {
    /// Check every module file; prelude files only when configured to.
    #[instrument(level = "debug", skip(self))]
    pub(super) fn check_files(&mut self) {
        let files: Vec<FileId> = self
            .ast
            .files()
            .filter(|(_, f)| f.kind != FileKind::Prelude || self.config.synthesize_library_members)
            .map(|(id, _)| id)
            .collect();
        for file in files {
            self.check_file(file);
            if self.is_aborted() {
                return;
            }
        }
    }

    #[instrument(level = "debug", skip(self), fields(file = %self.ast.file(file).name))]
    fn check_file(&mut self, file: FileId) {
        for sweep in [Sweep::Signatures, Sweep::Bodies] {
            let mut i = 0;
            while let Some(&d) = self.ast.file(file).decls().get(i) {
                self.visit(d, sweep);
                if self.is_aborted() {
                    return;
                }
                i += 1;
            }
            debug!(?sweep, decls = i, "sweep finished");
        }
    }

    /// Visit `d` in `sweep` unless it already was.
    pub(super) fn visit(&mut self, d: DeclId, sweep: Sweep) {
        let state = &mut self.ast.decl_mut(d).state;
        let seen = match sweep {
            Sweep::Signatures => std::mem::replace(&mut state.first_pass, true),
            Sweep::Bodies => std::mem::replace(&mut state.second_pass, true),
        };
        if seen {
            return;
        }
        trace!(decl = %self.name(d), ?sweep, "visit");
        match sweep {
            Sweep::Signatures => self.visit_signature(d),
            Sweep::Bodies => self.visit_body(d),
        }
    }

    fn visit_members(&mut self, d: DeclId, sweep: Sweep) {
        let mut i = 0;
        while let Some(&m) = self.ast.decl(d).members().get(i) {
            self.visit(m, sweep);
            if self.is_aborted() {
                return;
            }
            i += 1;
        }
    }

    fn visit_signature(&mut self, d: DeclId) {
        match self.ast.decl(d).kind {
            DeclKind::Import(_) | DeclKind::Operator(_) | DeclKind::Param(_) => {}
            DeclKind::PatternBinding(_) => self.visit_binding(d),
            DeclKind::Extension(_) => {
                self.validate_decl(d);
                self.visit_members(d, Sweep::Signatures);
            }
            DeclKind::Protocol(_) => {
                self.validate_decl(d);
                self.check_redeclaration(d);
                self.visit_members(d, Sweep::Signatures);
            }
            DeclKind::Enum(_) => {
                self.validate_decl(d);
                self.check_redeclaration(d);
                self.check_duplicate_elements(d);
                self.visit_members(d, Sweep::Signatures);
            }
            DeclKind::Struct(_) => {
                self.validate_decl(d);
                self.check_redeclaration(d);
                self.add_implicit_constructors(d);
                self.visit_members(d, Sweep::Signatures);
            }
            DeclKind::Class(_) => {
                self.validate_decl(d);
                self.check_redeclaration(d);
                self.add_implicit_constructors(d);
                self.visit_members(d, Sweep::Signatures);
                self.add_implicit_destructor(d);
            }
            DeclKind::Var(_) | DeclKind::Subscript(_) => {
                self.validate_decl(d);
                self.check_redeclaration(d);
                self.check_storage(d);
            }
            DeclKind::Constructor(_) => {
                self.validate_decl(d);
                self.check_initializer_kind(d);
                self.check_redeclaration(d);
            }
            DeclKind::TypeAlias(_)
            | DeclKind::AssociatedType(_)
            | DeclKind::GenericParam(_)
            | DeclKind::Func(_)
            | DeclKind::Destructor(_)
            | DeclKind::EnumElement(_) => {
                self.validate_decl(d);
                self.check_redeclaration(d);
            }
        }
    }

    fn visit_body(&mut self, d: DeclId) {
        match self.ast.decl(d).kind {
            DeclKind::Import(_) | DeclKind::Operator(_) | DeclKind::Param(_) => {}
            DeclKind::GenericParam(_) | DeclKind::Destructor(_) => {}
            DeclKind::PatternBinding(_) => self.check_binding_body(d),
            DeclKind::Extension(_) => {
                self.check_conformances(d);
                self.visit_members(d, Sweep::Bodies);
            }
            DeclKind::Protocol(_) => {
                self.check_access(d);
                self.visit_members(d, Sweep::Bodies);
            }
            DeclKind::Enum(_) => {
                self.check_access(d);
                self.check_raw_values(d);
                self.check_conformances(d);
                self.visit_members(d, Sweep::Bodies);
            }
            DeclKind::Struct(_) => {
                self.check_access(d);
                self.check_conformances(d);
                self.visit_members(d, Sweep::Bodies);
            }
            DeclKind::Class(_) => {
                self.check_access(d);
                self.check_conformances(d);
                self.visit_members(d, Sweep::Bodies);
                self.check_class_initializers(d);
            }
            DeclKind::Var(_) => self.check_overrides(d),
            DeclKind::Subscript(_) | DeclKind::Func(_) | DeclKind::Constructor(_) => {
                self.check_overrides(d);
                self.check_access(d);
            }
            DeclKind::TypeAlias(_) | DeclKind::AssociatedType(_) | DeclKind::EnumElement(_) => {
                self.check_access(d)
            }
        }
    }
}
