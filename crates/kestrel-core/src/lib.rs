#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared by the Kestrel front-end.
//!
//! - [`Interner`] / [`Symbol`]: deduplicated identifiers
//! - [`DeclName`]: simple and compound declaration names (`foo`, `foo(x:_:)`)

mod interner;
mod name;

#[cfg(test)]
mod name_tests;

pub use interner::{Interner, Symbol};
pub use name::{DeclName, DeclNameDisplay};
