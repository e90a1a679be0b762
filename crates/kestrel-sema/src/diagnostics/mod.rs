mod message;
mod printer;

#[cfg(test)]
mod tests;

use crate::ast::{FileId, Span};

pub use message::{DiagnosticKind, DiagnosticMessage, Fix, RelatedInfo, Severity};
pub use printer::DiagnosticsPrinter;

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Create a diagnostic with the given kind and span.
    ///
    /// Uses the kind's default message. Call `.message()` on the builder to override.
    pub fn report(&mut self, kind: DiagnosticKind, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::with_default_message(kind, span),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.messages.iter().any(|d| d.is_warning())
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_warning()).count()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.messages.iter().filter(|d| d.kind == kind).count()
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.count_of(kind) > 0
    }

    /// Returns diagnostics with duplicates and cascades removed.
    ///
    /// Suppression rules:
    /// 1. Exact duplicates (kind, span and message) are reported once
    /// 2. On the same primary span, a higher-priority kind suppresses a lower-priority one
    pub fn filtered(&self) -> Diagnostics {
        let mut suppressed = vec![false; self.messages.len()];

        for (i, a) in self.messages.iter().enumerate() {
            if suppressed[i] {
                continue;
            }
            for (j, b) in self.messages.iter().enumerate().skip(i + 1) {
                if suppressed[j] || a.span != b.span {
                    continue;
                }
                if a == b || a.kind.suppresses(&b.kind) {
                    suppressed[j] = true;
                } else if b.kind.suppresses(&a.kind) {
                    suppressed[i] = true;
                    break;
                }
            }
        }

        let messages = self
            .messages
            .iter()
            .zip(suppressed)
            .filter(|(_, s)| !s)
            .map(|(m, _)| m.clone())
            .collect();
        Diagnostics { messages }
    }

    /// Diagnostics whose primary span lies in `file`.
    pub fn in_file(&self, file: FileId) -> Diagnostics {
        let messages = self
            .messages
            .iter()
            .filter(|m| m.span.file == file)
            .cloned()
            .collect();
        Diagnostics { messages }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticMessage;
    type IntoIter = std::slice::Iter<'a, DiagnosticMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl<'a> DiagnosticBuilder<'a> {
    /// Provide custom detail for this diagnostic, rendered using the kind's template.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        let detail = msg.into();
        self.message.message = self.message.kind.message(Some(&detail));
        self
    }

    pub fn related_to(mut self, msg: impl Into<String>, span: Span) -> Self {
        self.message.related.push(RelatedInfo::new(span, msg));
        self
    }

    /// Mark an additional range without a label.
    pub fn highlight(mut self, span: Span) -> Self {
        self.message.highlights.push(span);
        self
    }

    pub fn fix(
        mut self,
        description: impl Into<String>,
        span: Span,
        replacement: impl Into<String>,
    ) -> Self {
        self.message
            .fixes
            .push(Fix::new(span, replacement, description));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
