//! Kestrel: declaration checking for the Kestrel language front-end.
//!
//! Takes a parsed declaration arena and elaborates it: resolves inheritance
//! clauses and generic signatures, computes accessibility, synthesizes
//! accessors and implicit initializers, matches overrides and protocol
//! witnesses, and checks enum raw values.
//!
//! # Example
//!
//! ```
//! use kestrel_sema::SemaBuilder;
//! use kestrel_sema::ast::{Ast, FileKind};
//!
//! let mut ast = Ast::new();
//! ast.add_file("main.ks", "", FileKind::Main);
//!
//! let module = SemaBuilder::new(ast).check().expect("validation depth exceeded");
//! assert!(module.is_valid());
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod ast;
pub mod collab;
pub mod config;
pub mod diagnostics;
pub mod prelude;
pub mod sema;
pub mod state;
pub mod summary;
pub mod types;

#[cfg(test)]
mod state_tests;
#[cfg(test)]
mod test_utils;

/// Result type for passes that produce both output and diagnostics.
///
/// Fatal errors (like exceeding the validation depth) use the outer `Result`.
pub type PassResult<T> = std::result::Result<(T, Diagnostics), Error>;

pub use config::{CheckedModule, SemaBuilder, SemaConfig};
pub use diagnostics::{DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity};
pub use summary::SemanticSummary;

/// Errors that abort declaration checking.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Re-entrant validation nested deeper than the configured limit.
    #[error("validation nested deeper than {0} declarations")]
    ValidationDepthExceeded(u32),

    #[error("file {} is not part of the module", .0.as_u32())]
    UnknownFile(ast::FileId),

    #[error("declaration checking failed with {} errors", .0.error_count())]
    SemaFailed(Diagnostics),
}

/// Result type for checking operations.
pub type Result<T> = std::result::Result<T, Error>;
