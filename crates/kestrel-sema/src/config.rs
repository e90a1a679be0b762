//! Checker configuration and the module-level entry point.

use crate::ast::{Ast, DeclId, FileId};
use crate::collab::{
    ArchetypeBuilderFactory, ArenaLookup, DefaultArchetypes, ExprChecker, LiteralChecker,
    NameLookup,
};
use crate::diagnostics::Diagnostics;
use crate::prelude::{self, KnownDecls};
use crate::sema::Elaborator;
use crate::summary::SemanticSummary;
use crate::types::{TypeContext, TypeId};
use crate::{Error, Result};

/// Knobs of one checking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemaConfig {
    /// Module name, used in the class names reported by initializer stubs.
    pub module_name: String,
    /// Bound on re-entrant declaration validation.
    pub max_validation_depth: u32,
    /// Only link setter overrides when the base setter is accessible.
    pub enable_access_control: bool,
    /// Sweep prelude files like module files, synthesizing their implicit members.
    pub synthesize_library_members: bool,
}

impl Default for SemaConfig {
    fn default() -> Self {
        Self {
            module_name: "main".to_string(),
            max_validation_depth: 512,
            enable_access_control: true,
            synthesize_library_members: false,
        }
    }
}

/// Builder for a checking run over one module.
pub struct SemaBuilder {
    ast: Ast,
    config: SemaConfig,
    lookup: Box<dyn NameLookup>,
    exprs: Box<dyn ExprChecker>,
    archetypes: Box<dyn ArchetypeBuilderFactory>,
}

impl SemaBuilder {
    pub fn new(ast: Ast) -> Self {
        Self {
            ast,
            config: SemaConfig::default(),
            lookup: Box::new(ArenaLookup::new()),
            exprs: Box::new(LiteralChecker::new()),
            archetypes: Box::new(DefaultArchetypes),
        }
    }

    pub fn with_config(mut self, config: SemaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.config.module_name = name.into();
        self
    }

    pub fn with_max_validation_depth(mut self, limit: u32) -> Self {
        self.config.max_validation_depth = limit;
        self
    }

    pub fn with_access_control(mut self, enabled: bool) -> Self {
        self.config.enable_access_control = enabled;
        self
    }

    pub fn with_library_members(mut self, enabled: bool) -> Self {
        self.config.synthesize_library_members = enabled;
        self
    }

    pub fn with_lookup(mut self, lookup: impl NameLookup + 'static) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    pub fn with_expr_checker(mut self, checker: impl ExprChecker + 'static) -> Self {
        self.exprs = Box::new(checker);
        self
    }

    pub fn with_archetypes(mut self, factory: impl ArchetypeBuilderFactory + 'static) -> Self {
        self.archetypes = Box::new(factory);
        self
    }

    /// Elaborate every declaration of the module.
    ///
    /// Semantic errors are reported through [`CheckedModule::diagnostics`];
    /// only fatal conditions return `Err`.
    pub fn check(mut self) -> Result<CheckedModule> {
        if !prelude::has_prelude(&self.ast) {
            prelude::install(&mut self.ast);
        }
        let known = KnownDecls::resolve(&self.ast);
        let elaborator = Elaborator::new(
            self.ast,
            self.config,
            known.clone(),
            self.lookup,
            self.exprs,
            self.archetypes,
        );
        let ((ast, types), diagnostics) = elaborator.run()?;
        Ok(CheckedModule {
            ast,
            types,
            diagnostics,
            known,
        })
    }
}

/// A fully elaborated module.
#[derive(Debug, Clone)]
pub struct CheckedModule {
    ast: Ast,
    types: TypeContext,
    diagnostics: Diagnostics,
    known: KnownDecls,
}

impl CheckedModule {
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn types(&self) -> &TypeContext {
        &self.types
    }

    pub fn known(&self) -> &KnownDecls {
        &self.known
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// No errors were reported. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Turn reported errors into [`Error::SemaFailed`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::SemaFailed(self.diagnostics))
        }
    }

    pub fn summary(&self) -> SemanticSummary {
        SemanticSummary::build(&self.ast, &self.types)
    }

    pub fn display_type(&self, ty: TypeId) -> String {
        self.types.display(ty, &self.ast.interner).to_string()
    }

    /// Display the type of `decl`, or `<none>` when unassigned.
    pub fn type_of(&self, decl: DeclId) -> String {
        match self.ast.decl(decl).ty {
            Some(ty) => self.display_type(ty),
            None => "<none>".to_string(),
        }
    }

    /// Render the diagnostics located in `file` against its source text.
    pub fn render(&self, file: FileId) -> Result<String> {
        let source = self.ast.try_file(file).ok_or(Error::UnknownFile(file))?;
        let diagnostics = self.diagnostics.in_file(file);
        Ok(diagnostics
            .printer()
            .source(file, Some(&source.name), &source.text)
            .render())
    }
}
