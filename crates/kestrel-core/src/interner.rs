//! Identifier interning.
//!
//! Every name that flows through declaration checking is a `Symbol`:
//! comparing two names is an integer comparison, and declarations can be
//! keyed by name without owning strings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Handle to an interned identifier.
///
/// Symbols are ordered by insertion order, not lexicographically.
/// Use [`Interner::resolve`] when spelling order matters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Rebuild a symbol from a raw index obtained from [`Symbol::as_u32`].
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// Identifier table owned by an AST.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    map: HashMap<String, Symbol>,
    strings: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern an identifier, returning the existing symbol on a hit.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        self.push(s.to_owned())
    }

    /// Intern an owned identifier (synthesized names such as `x.storage`).
    pub fn intern_owned(&mut self, s: String) -> Symbol {
        if let Some(&sym) = self.map.get(&s) {
            return sym;
        }
        self.push(s)
    }

    fn push(&mut self, s: String) -> Symbol {
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.clone());
        self.map.insert(s, sym);
        sym
    }

    /// Look up an identifier without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }

    /// Resolve a symbol back to its spelling.
    ///
    /// Symbols from a different interner resolve to `"<unknown>"`.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.try_resolve(sym).unwrap_or("<unknown>")
    }

    #[inline]
    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        self.strings.get(sym.0 as usize).map(|s| s.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (Symbol(i as u32), s.as_str()))
    }
}
