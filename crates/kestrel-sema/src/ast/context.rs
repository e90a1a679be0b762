//! Declaration contexts and the queries passes ask of them.

use super::{Ast, ClosureId, DeclId, DeclKind, FileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclContext {
    Module,
    File(FileId),
    Nominal(DeclId),
    Extension(DeclId),
    /// Function, initializer, deinitializer or accessor.
    Function(DeclId),
    Closure(ClosureId),
    TopLevelCode(FileId),
    /// Initializer expression of a pattern binding.
    Initializer(DeclId),
}

impl DeclContext {
    pub fn is_type_context(self) -> bool {
        matches!(self, DeclContext::Nominal(_) | DeclContext::Extension(_))
    }

    pub fn is_extension_context(self) -> bool {
        matches!(self, DeclContext::Extension(_))
    }

    pub fn is_module_scope(self) -> bool {
        matches!(self, DeclContext::Module | DeclContext::File(_))
    }

    /// The declaration this context belongs to, if any.
    pub fn as_decl(self) -> Option<DeclId> {
        match self {
            DeclContext::Nominal(d)
            | DeclContext::Extension(d)
            | DeclContext::Function(d)
            | DeclContext::Initializer(d) => Some(d),
            _ => None,
        }
    }
}

impl Ast {
    pub fn parent_context(&self, dc: DeclContext) -> Option<DeclContext> {
        match dc {
            DeclContext::Module => None,
            DeclContext::File(_) => Some(DeclContext::Module),
            DeclContext::TopLevelCode(file) => Some(DeclContext::File(file)),
            DeclContext::Closure(c) => Some(self.closure(c).parent),
            DeclContext::Nominal(d)
            | DeclContext::Extension(d)
            | DeclContext::Function(d)
            | DeclContext::Initializer(d) => Some(self.decl(d).parent),
        }
    }

    /// Context introduced by a declaration, for declarations that are contexts.
    pub fn context_of(&self, d: DeclId) -> Option<DeclContext> {
        match self.decl(d).kind {
            DeclKind::Enum(_) | DeclKind::Struct(_) | DeclKind::Class(_) | DeclKind::Protocol(_) => {
                Some(DeclContext::Nominal(d))
            }
            DeclKind::Extension(_) => Some(DeclContext::Extension(d)),
            DeclKind::Func(_) | DeclKind::Constructor(_) | DeclKind::Destructor(_) => {
                Some(DeclContext::Function(d))
            }
            _ => None,
        }
    }

    pub fn is_local_context(&self, dc: DeclContext) -> bool {
        let mut current = Some(dc);
        while let Some(dc) = current {
            if matches!(
                dc,
                DeclContext::Function(_)
                    | DeclContext::Closure(_)
                    | DeclContext::TopLevelCode(_)
                    | DeclContext::Initializer(_)
            ) {
                return true;
            }
            current = self.parent_context(dc);
        }
        false
    }

    /// Whether `dc` or any enclosing context has generic parameters.
    /// Protocols are generic over their implicit `Self`.
    pub fn is_generic_context(&self, dc: DeclContext) -> bool {
        let mut current = Some(dc);
        while let Some(dc) = current {
            let generic = match dc {
                DeclContext::Nominal(d) | DeclContext::Function(d) => {
                    let decl = self.decl(d);
                    decl.is_protocol() || decl.generic_params().is_some()
                }
                DeclContext::Extension(_) => self.nominal_of(dc).is_some_and(|n| {
                    let decl = self.decl(n);
                    decl.is_protocol() || decl.generic_params().is_some()
                }),
                _ => false,
            };
            if generic {
                return true;
            }
            current = self.parent_context(dc);
        }
        false
    }

    /// Nominal type a type context belongs to.
    pub fn nominal_of(&self, dc: DeclContext) -> Option<DeclId> {
        match dc {
            DeclContext::Nominal(d) => Some(d),
            DeclContext::Extension(e) => self.decl(e).as_extension()?.nominal,
            _ => None,
        }
    }

    /// Innermost enclosing type context, looking through functions and closures.
    pub fn enclosing_type_context(&self, dc: DeclContext) -> Option<DeclContext> {
        let mut current = Some(dc);
        while let Some(dc) = current {
            if dc.is_type_context() {
                return Some(dc);
            }
            current = self.parent_context(dc);
        }
        None
    }

    pub fn is_class_context(&self, dc: DeclContext) -> bool {
        self.nominal_of(dc)
            .is_some_and(|n| self.decl(n).is_class())
    }

    pub fn is_protocol_context(&self, dc: DeclContext) -> bool {
        self.nominal_of(dc)
            .is_some_and(|n| self.decl(n).is_protocol())
    }

    pub fn is_value_type_context(&self, dc: DeclContext) -> bool {
        self.nominal_of(dc).is_some_and(|n| {
            matches!(
                self.decl(n).kind,
                DeclKind::Struct(_) | DeclKind::Enum(_)
            )
        })
    }

    pub fn file_of_context(&self, dc: DeclContext) -> Option<FileId> {
        let mut current = Some(dc);
        while let Some(dc) = current {
            match dc {
                DeclContext::File(f) | DeclContext::TopLevelCode(f) => return Some(f),
                DeclContext::Closure(c) => return Some(self.closure(c).file),
                DeclContext::Module => return None,
                _ => {}
            }
            if let Some(d) = dc.as_decl() {
                return Some(self.decl(d).file);
            }
            current = self.parent_context(dc);
        }
        None
    }

    /// Ordered members of a context. Functions and closures own no members.
    pub fn members(&self, dc: DeclContext) -> &[DeclId] {
        match dc {
            DeclContext::File(f) => self.file(f).decls(),
            DeclContext::Nominal(d) | DeclContext::Extension(d) => self.decl(d).members(),
            _ => &[],
        }
    }
}
