//! Accessibility computation.

use tracing::trace;

use super::Elaborator;
use crate::ast::{Accessibility, AccessorKind, DeclContext, DeclId, DeclKind};
use crate::state::Entry;

impl Elaborator {
    /// Accessibility of `d`, computed once and recorded in `access`.
    ///
    /// Storage also records its setter level.
    pub(super) fn accessibility_of(&mut self, d: DeclId) -> Accessibility {
        if let Some(level) = self.ast.decl(d).access {
            return level;
        }
        match self.ast.decl_mut(d).state.accessibility.enter() {
            Entry::Fresh => {}
            // Only a malformed context chain can loop; settle on the default.
            Entry::Reentrant | Entry::Done => return Accessibility::Internal,
        }

        let level = self.compute_accessibility(d);
        trace!(decl = %self.name(d), %level, "accessibility");
        self.ast.decl_mut(d).access = Some(level);

        if self.ast.decl(d).is_storage() {
            let setter = self
                .ast
                .decl(d)
                .attrs
                .setter_accessibility()
                .unwrap_or(level);
            if let Some(storage) = self.ast.decl_mut(d).storage_mut() {
                storage.setter_access = Some(setter);
            }
        }
        self.ast.decl_mut(d).state.accessibility.finish();
        level
    }

    /// Setter accessibility of storage `d`.
    pub(super) fn setter_accessibility_of(&mut self, d: DeclId) -> Accessibility {
        let level = self.accessibility_of(d);
        self.ast
            .decl(d)
            .storage()
            .and_then(|s| s.setter_access)
            .unwrap_or(level)
    }

    fn compute_accessibility(&mut self, d: DeclId) -> Accessibility {
        let decl = self.ast.decl(d);
        if let Some(info) = decl.accessor() {
            return match info.kind {
                AccessorKind::Setter
                | AccessorKind::MaterializeForSet
                | AccessorKind::MutableAddressor => self.setter_accessibility_of(info.storage),
                _ => self.accessibility_of(info.storage),
            };
        }
        if let Some(level) = decl.attrs.accessibility() {
            return level;
        }
        if let DeclKind::Extension(_) = decl.kind {
            return self.extension_default_access(d);
        }

        let is_element_or_dtor = matches!(
            decl.kind,
            DeclKind::EnumElement(_) | DeclKind::Destructor(_)
        );
        let is_assoc = matches!(decl.kind, DeclKind::AssociatedType(_));
        match decl.parent {
            DeclContext::Module | DeclContext::File(_) => Accessibility::Internal,
            DeclContext::Function(_)
            | DeclContext::Closure(_)
            | DeclContext::TopLevelCode(_)
            | DeclContext::Initializer(_) => Accessibility::Private,
            DeclContext::Extension(ext) => self.extension_default_access(ext),
            DeclContext::Nominal(nominal) => {
                let container = self.accessibility_of(nominal);
                if is_assoc || is_element_or_dtor || self.ast.decl(nominal).is_protocol() {
                    container
                } else {
                    container.min(Accessibility::Internal)
                }
            }
        }
    }

    /// Default level of members of extension `ext`.
    pub(super) fn extension_default_access(&mut self, ext: DeclId) -> Accessibility {
        if let Some(level) = self.ast.decl(ext).as_extension().and_then(|e| e.default_access) {
            return level;
        }
        let explicit = self.ast.decl(ext).attrs.accessibility();
        let nominal = self.ast.decl(ext).as_extension().and_then(|e| e.nominal);
        let level = match (explicit, nominal) {
            (Some(level), _) => level.min(Accessibility::Internal),
            (None, Some(n)) => self.accessibility_of(n).min(Accessibility::Internal),
            (None, None) => Accessibility::Internal,
        };
        if let Some(data) = self.ast.decl_mut(ext).as_extension_mut() {
            data.default_access = Some(level);
        }
        level
    }

    /// Whether the setter of storage `d` can be used from `dc`.
    pub(super) fn is_setter_accessible_from(&mut self, d: DeclId, dc: DeclContext) -> bool {
        match self.setter_accessibility_of(d) {
            Accessibility::Public | Accessibility::Internal => true,
            Accessibility::Private => {
                let file = self.ast.decl(d).file;
                self.ast.file_of_context(dc) == Some(file)
            }
        }
    }
}
