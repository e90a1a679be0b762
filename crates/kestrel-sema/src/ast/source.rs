//! Source files and spans.

use rowan::TextRange;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct FileId(pub(crate) u32);

impl FileId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// How a file participates in the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    /// Ordinary library source: globals need initializers.
    Library,
    /// Main file: top-level code is allowed.
    Main,
    /// Standard library and other prelude files, checked lazily.
    Prelude,
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
    pub kind: FileKind,
    pub(crate) decls: Vec<super::DeclId>,
}

impl SourceFile {
    pub fn decls(&self) -> &[super::DeclId] {
        &self.decls
    }
}

/// A range inside a specific file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: FileId,
    pub range: TextRange,
}

impl Span {
    pub fn new(file: FileId, range: TextRange) -> Self {
        Self { file, range }
    }

    /// Empty span at the start of `self`, used for insertions.
    pub fn start(self) -> Span {
        Span::new(self.file, TextRange::empty(self.range.start()))
    }

    /// Empty span at the end of `self`.
    pub fn end(self) -> Span {
        Span::new(self.file, TextRange::empty(self.range.end()))
    }

    pub fn cover(self, other: Span) -> Span {
        debug_assert_eq!(self.file, other.file);
        Span::new(self.file, self.range.cover(other.range))
    }
}
