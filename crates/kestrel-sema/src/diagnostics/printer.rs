//! Builder-pattern printer for rendering diagnostics.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Patch, Renderer, Snippet};
use rowan::TextRange;

use super::Diagnostics;
use super::message::Severity;
use crate::ast::{FileId, Span};

struct SourceEntry<'s> {
    file: FileId,
    path: Option<&'s str>,
    text: &'s str,
}

/// Builder for rendering diagnostics with various options.
pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d Diagnostics,
    sources: Vec<SourceEntry<'s>>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            sources: Vec::new(),
            colored: false,
        }
    }

    /// Register the text of `file`. Diagnostics in files without a source render in plain form.
    pub fn source(mut self, file: FileId, path: Option<&'s str>, text: &'s str) -> Self {
        self.sources.push(SourceEntry { file, path, text });
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.format(&mut out);
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }

            let Some(entry) = self.lookup(diag.span) else {
                write!(w, "{}", diag)?;
                continue;
            };
            let text = entry.text;
            let range = adjust_range(diag.span.range, text.len());

            let mut snippet = Snippet::source(text)
                .line_start(1)
                .annotation(AnnotationKind::Primary.span(range).label(&diag.message));

            if let Some(p) = entry.path {
                snippet = snippet.path(p);
            }

            for highlight in &diag.highlights {
                if highlight.file != diag.span.file {
                    continue;
                }
                snippet = snippet.annotation(
                    AnnotationKind::Context.span(adjust_range(highlight.range, text.len())),
                );
            }

            for related in &diag.related {
                if related.span.file != diag.span.file {
                    continue;
                }
                snippet = snippet.annotation(
                    AnnotationKind::Context
                        .span(adjust_range(related.span.range, text.len()))
                        .label(&related.message),
                );
            }

            let level = severity_to_level(diag.severity());
            let title_group = level.primary_title(&diag.message).element(snippet);

            let mut report: Vec<Group> = vec![title_group];

            for fix in &diag.fixes {
                let Some(fix_entry) = self.lookup(fix.span) else {
                    continue;
                };
                report.push(
                    Level::HELP.secondary_title(&fix.description).element(
                        Snippet::source(fix_entry.text).line_start(1).patch(Patch::new(
                            patch_range(fix.span.range),
                            &fix.replacement,
                        )),
                    ),
                );
            }

            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }

    fn lookup(&self, span: Span) -> Option<&SourceEntry<'s>> {
        self.sources.iter().find(|s| s.file == span.file)
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

fn adjust_range(range: TextRange, limit: usize) -> std::ops::Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();

    if start == end {
        return start..(start + 1).min(limit);
    }

    start..end
}

fn patch_range(range: TextRange) -> std::ops::Range<usize> {
    range.start().into()..range.end().into()
}

impl Diagnostics {
    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}
