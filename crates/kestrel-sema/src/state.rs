//! Per-declaration check states.
//!
//! Every elaboration step that may recurse into other declarations is
//! guarded by a three-valued state. Observing `Checking` on entry means the
//! caller re-entered a declaration that is still being elaborated: a cycle.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CheckState {
    #[default]
    Unchecked,
    Checking,
    Checked,
}

/// Outcome of entering a guarded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// First entry; the caller must call [`CheckState::finish`].
    Fresh,
    /// The step is already running further up the stack.
    Reentrant,
    /// The step already completed.
    Done,
}

impl CheckState {
    pub fn enter(&mut self) -> Entry {
        match *self {
            CheckState::Unchecked => {
                *self = CheckState::Checking;
                Entry::Fresh
            }
            CheckState::Checking => Entry::Reentrant,
            CheckState::Checked => Entry::Done,
        }
    }

    pub fn finish(&mut self) {
        debug_assert_ne!(*self, CheckState::Unchecked, "finishing a step never entered");
        *self = CheckState::Checked;
    }

    pub fn is_checked(self) -> bool {
        self == CheckState::Checked
    }

    pub fn is_checking(self) -> bool {
        self == CheckState::Checking
    }
}

/// Check states of one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeclState {
    /// Signature validation (type, generic signature, attributes).
    pub validation: CheckState,
    /// Inheritance clause resolution.
    pub inheritance: CheckState,
    /// Cycle detection over the inheritance relation.
    pub circularity: CheckState,
    pub generics: CheckState,
    pub overrides: CheckState,
    /// Accessor synthesis for storage.
    pub accessors: CheckState,
    pub accessibility: CheckState,
    pub attributes: CheckState,
    pub conformances: CheckState,
    pub redeclaration: bool,
    pub first_pass: bool,
    pub second_pass: bool,
}
