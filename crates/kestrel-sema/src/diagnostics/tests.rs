use rowan::TextRange;

use super::*;
use crate::ast::FileId;

fn span(start: u32, end: u32) -> Span {
    Span::new(FileId(0), TextRange::new(start.into(), end.into()))
}

#[test]
fn severity_display() {
    insta::assert_snapshot!(format!("{}", Severity::Error), @"error");
    insta::assert_snapshot!(format!("{}", Severity::Warning), @"warning");
}

#[test]
fn report_with_default_message() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::ClassStoredProperty, span(0, 5))
        .emit();

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.has_errors());
    insta::assert_snapshot!(
        diagnostics.printer().render(),
        @"error at 0..5: class stored properties not yet supported in classes"
    );
}

#[test]
fn report_with_template_message() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::UndeclaredType, span(0, 5))
        .message("Widget")
        .emit();
    diagnostics
        .report(DiagnosticKind::LazyRequiresInitializer, span(6, 7))
        .message("'cache'")
        .emit();

    insta::assert_snapshot!(diagnostics.printer().render(), @r"
    error at 0..5: use of undeclared type 'Widget'
    error at 6..7: lazy properties must have an initializer: 'cache'
    ");
}

#[test]
fn warnings_are_not_errors() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::OverrideUnavailable, span(0, 1))
        .emit();

    assert!(!diagnostics.has_errors());
    assert!(diagnostics.has_warnings());
    assert_eq!(diagnostics.warning_count(), 1);
    assert_eq!(diagnostics.error_count(), 0);
}

#[test]
fn builder_with_related() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::LazyOnLet, span(0, 5))
        .message("primary")
        .related_to("related info", span(6, 10))
        .emit();

    assert_eq!(diagnostics.len(), 1);
    let result = diagnostics
        .printer()
        .source(FileId(0), None, "hello world!")
        .render();
    insta::assert_snapshot!(result, @r"
    error: 'lazy' cannot be used on a let: primary
      |
    1 | hello world!
      | ^^^^^ ---- related info
      | |
      | 'lazy' cannot be used on a let: primary
    ");
}

#[test]
fn builder_with_fix() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::LazyOnComputed, span(0, 5))
        .message("fixable")
        .fix("apply this fix", span(0, 5), "fixed")
        .emit();

    let result = diagnostics
        .printer()
        .source(FileId(0), None, "hello world")
        .render();
    insta::assert_snapshot!(result, @r"
    error: 'lazy' may not be used on a computed property: fixable
      |
    1 | hello world
      | ^^^^^ 'lazy' may not be used on a computed property: fixable
      |
    help: apply this fix
      |
    1 - hello world
    1 + fixed world
      |
    ");
}

#[test]
fn plain_display_lists_fixes_and_related() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::MissingOverride, span(10, 14))
        .related_to("overridden declaration is here", span(0, 4))
        .fix("insert 'override '", span(10, 10), "override ")
        .emit();

    insta::assert_snapshot!(
        diagnostics.printer().render(),
        @"error at 10..14: overriding declaration requires an 'override' keyword (fix: insert 'override ') (related: overridden declaration is here at 0..4)"
    );
}

#[test]
fn files_without_source_render_plain() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(
            DiagnosticKind::ExtensionStoredProperty,
            Span::new(FileId(1), TextRange::new(2.into(), 3.into())),
        )
        .emit();

    let result = diagnostics
        .printer()
        .source(FileId(0), None, "unrelated")
        .render();
    insta::assert_snapshot!(result, @"error at 2..3: extensions may not contain stored properties");
}

#[test]
fn filtered_drops_exact_duplicates() {
    let mut diagnostics = Diagnostics::new();
    for _ in 0..2 {
        diagnostics
            .report(DiagnosticKind::DuplicateInheritance, span(4, 5))
            .message("P")
            .emit();
    }
    diagnostics
        .report(DiagnosticKind::DuplicateInheritance, span(4, 5))
        .message("Q")
        .emit();

    let filtered = diagnostics.filtered();
    assert_eq!(diagnostics.len(), 3);
    insta::assert_snapshot!(filtered.printer().render(), @r"
    error at 4..5: duplicate inheritance from 'P'
    error at 4..5: duplicate inheritance from 'Q'
    ");
}

#[test]
fn filtered_prefers_higher_priority_on_same_span() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::ClassSuperAccess, span(0, 3))
        .message("class must be declared private because its superclass is private")
        .emit();
    diagnostics
        .report(DiagnosticKind::CircularInheritance, span(0, 3))
        .message("circular class inheritance 'A'")
        .emit();
    diagnostics
        .report(DiagnosticKind::ClassSuperAccess, span(5, 8))
        .message("unrelated")
        .emit();

    insta::assert_snapshot!(diagnostics.filtered().printer().render(), @r"
    error at 0..3: circular class inheritance 'A'
    error at 5..8: unrelated
    ");
}

#[test]
fn kind_priority_orders_root_causes_first() {
    assert!(DiagnosticKind::CircularInheritance.suppresses(&DiagnosticKind::MissingOverride));
    assert!(!DiagnosticKind::OverrideUnavailable.suppresses(&DiagnosticKind::UndeclaredType));
}
