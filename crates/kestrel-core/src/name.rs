//! Declaration names.
//!
//! A simple name is just an identifier (`count`). A compound name also
//! records the argument labels of a function-like declaration
//! (`init(x:y:)`, `move(to:_:)`); unlabeled arguments are `None`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Interner, Symbol};

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DeclName {
    base: Symbol,
    labels: Option<Vec<Option<Symbol>>>,
}

impl DeclName {
    pub fn simple(base: Symbol) -> Self {
        Self { base, labels: None }
    }

    pub fn compound(base: Symbol, labels: Vec<Option<Symbol>>) -> Self {
        Self {
            base,
            labels: Some(labels),
        }
    }

    pub fn base(&self) -> Symbol {
        self.base
    }

    pub fn is_simple(&self) -> bool {
        self.labels.is_none()
    }

    pub fn is_compound(&self) -> bool {
        self.labels.is_some()
    }

    /// Argument labels; empty for simple names.
    pub fn labels(&self) -> &[Option<Symbol>] {
        self.labels.as_deref().unwrap_or(&[])
    }

    /// Number of argument labels, `None` for simple names.
    pub fn arity(&self) -> Option<usize> {
        self.labels.as_ref().map(Vec::len)
    }

    /// The same name without argument labels.
    pub fn base_name(&self) -> DeclName {
        DeclName::simple(self.base)
    }

    /// Whether `self` is a valid reference to `other`: a simple name matches
    /// any name with the same base, compound names must match exactly.
    pub fn matches(&self, other: &DeclName) -> bool {
        if self.base != other.base {
            return false;
        }
        match (&self.labels, &other.labels) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => a == b,
        }
    }

    pub fn display<'a>(&'a self, interner: &'a Interner) -> DeclNameDisplay<'a> {
        DeclNameDisplay {
            name: self,
            interner,
        }
    }
}

pub struct DeclNameDisplay<'a> {
    name: &'a DeclName,
    interner: &'a Interner,
}

impl fmt::Display for DeclNameDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.interner.resolve(self.name.base))?;
        let Some(labels) = &self.name.labels else {
            return Ok(());
        };
        f.write_str("(")?;
        for label in labels {
            match label {
                Some(sym) => write!(f, "{}:", self.interner.resolve(*sym))?,
                None => f.write_str("_:")?,
            }
        }
        f.write_str(")")
    }
}
