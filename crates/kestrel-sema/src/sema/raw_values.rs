//! Enum case checks: duplicate case names and raw values.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::Elaborator;
use crate::ast::{DeclContext, DeclId, DeclKind, Expr, ExprKind, Span};
use crate::diagnostics::DiagnosticKind;
use crate::types::TypeId;

/// Identity of a raw value literal. Numerically equal integer and float
/// literals share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RawValueKey {
    String(String),
    UnicodeScalar(u32),
    Int(i128),
    /// Bit pattern of a non-integral float.
    Float(u64),
}

impl RawValueKey {
    pub(crate) fn of(expr: &Expr) -> Option<Self> {
        match &expr.kind {
            ExprKind::IntegerLiteral { text, negative } => {
                let value = parse_integer(text)?;
                Some(Self::Int(if *negative { -value } else { value }))
            }
            ExprKind::FloatLiteral { text, negative } => {
                let value: f64 = text.replace('_', "").parse().ok()?;
                let value = if *negative { -value } else { value };
                if value.is_finite() && value.fract() == 0.0 && value.abs() < 2f64.powi(127) {
                    return Some(Self::Int(value as i128));
                }
                Some(Self::Float(value.to_bits()))
            }
            ExprKind::CharLiteral(c) => Some(Self::UnicodeScalar(u32::from(*c))),
            ExprKind::StringLiteral(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

/// Value of an integer literal: decimal, `0x`, `0o` or `0b`, with `_`
/// separators.
pub(crate) fn parse_integer(text: &str) -> Option<i128> {
    let digits = text.replace('_', "");
    let (radix, body) = match digits.get(..2) {
        Some("0x") => (16, &digits[2..]),
        Some("0o") => (8, &digits[2..]),
        Some("0b") => (2, &digits[2..]),
        _ => (10, digits.as_str()),
    };
    i128::from_str_radix(body, radix).ok()
}

/// Where a raw value came from, for duplicate notes.
#[derive(Debug, Clone, Copy)]
struct RawValueSource {
    element: DeclId,
    /// Last preceding case with a written raw value.
    last_explicit: Option<DeclId>,
}

impl Elaborator {
    fn enum_elements(&self, e: DeclId) -> Vec<DeclId> {
        self.ast
            .decl(e)
            .members()
            .iter()
            .copied()
            .filter(|&m| matches!(self.ast.decl(m).kind, DeclKind::EnumElement(_)))
            .collect()
    }

    /// Cases of enum `e` named like an earlier case are invalid.
    pub(super) fn check_duplicate_elements(&mut self, e: DeclId) {
        let mut seen: HashMap<kestrel_core::Symbol, DeclId> = HashMap::new();
        for element in self.enum_elements(e) {
            let name = self.ast.decl(element).name.base();
            let Some(&previous) = seen.get(&name) else {
                seen.insert(name, element);
                continue;
            };
            self.mark_invalid(element);
            if let Some(raw) = self
                .ast
                .decl_mut(element)
                .as_element_mut()
                .and_then(|d| d.raw_value.as_mut())
            {
                raw.ty = Some(crate::types::TYPE_ERROR);
            }
            let shown = self.name(element);
            let span = self.span(element);
            let previous_span = self.span(previous);
            self.report(DiagnosticKind::DuplicateEnumElement, span)
                .message(shown)
                .related_to("previous definition here", previous_span)
                .emit();
        }
    }

    /// Span of the first inheritance clause entry of `e`, where the raw
    /// type is written.
    fn raw_type_span(&self, e: DeclId) -> Span {
        let range = self
            .ast
            .decl(e)
            .inherited()
            .first()
            .and_then(|loc| loc.range());
        match range {
            Some(range) => self.span_of(e, range),
            None => self.span(e),
        }
    }

    /// Raw type and raw value checks of enum `e`.
    pub(super) fn check_raw_values(&mut self, e: DeclId) {
        let elements = self.enum_elements(e);
        let Some(raw_type) = self.ast.decl(e).as_nominal().and_then(|n| n.raw_type) else {
            for element in elements {
                let range = self
                    .ast
                    .decl(element)
                    .as_element()
                    .and_then(|d| d.raw_value.as_ref())
                    .map(|v| v.range);
                if let Some(range) = range {
                    let span = self.span_of(element, range);
                    self.report(DiagnosticKind::EnumRawValueWithoutRawType, span)
                        .emit();
                }
            }
            return;
        };
        if self.types.is_error(raw_type) {
            return;
        }
        let raw_ty = self.map_to_archetypes(raw_type);
        let raw_span = self.raw_type_span(e);
        let shown = self.display(raw_ty);

        let literal_protocols = self.known.raw_value_literal_protocols();
        if !literal_protocols.is_empty()
            && !literal_protocols
                .into_iter()
                .any(|p| self.type_conforms_to(raw_ty, p))
        {
            self.report(DiagnosticKind::RawTypeNotLiteralConvertible, raw_span)
                .message(format!("raw type '{shown}' is not convertible from any literal"))
                .emit();
            if let Some(loc) = self
                .ast
                .decl_mut(e)
                .as_nominal_mut()
                .and_then(|n| n.inherited.first_mut())
            {
                loc.invalid = true;
            }
        }
        if elements.is_empty() {
            self.report(DiagnosticKind::EmptyEnumRawType, raw_span).emit();
            return;
        }

        let mut previous: Option<Expr> = None;
        let mut last_explicit: Option<DeclId> = None;
        let mut unique: HashMap<RawValueKey, RawValueSource> = HashMap::new();
        for element in elements {
            if self.is_invalid(element) {
                continue;
            }
            let has_argument = self
                .ast
                .decl(element)
                .as_element()
                .is_some_and(|d| d.argument.is_some());
            if has_argument {
                let span = self.span(element);
                self.report(DiagnosticKind::EnumWithRawTypeCaseWithArgument, span)
                    .related_to(format!("declared raw type '{shown}' here"), raw_span)
                    .emit();
            }

            let written = self
                .ast
                .decl(element)
                .as_element()
                .and_then(|d| d.raw_value.clone());
            let mut value = match written {
                Some(value) => {
                    last_explicit = Some(element);
                    value
                }
                None => match self.auto_incremented(raw_ty, element, previous.as_ref()) {
                    Some(value) => value,
                    None => break,
                },
            };
            self.check_raw_value(e, element, &mut value, raw_ty);
            previous = Some(value.clone());
            if let Some(d) = self.ast.decl_mut(element).as_element_mut() {
                d.raw_value = Some(value.clone());
            }

            let Some(key) = RawValueKey::of(&value) else {
                continue;
            };
            trace!(case = %self.name(element), ?key, "raw value");
            match unique.get(&key).copied() {
                Some(found) => self.report_duplicate_raw_value(e, element, last_explicit, found),
                None => {
                    unique.insert(
                        key,
                        RawValueSource {
                            element,
                            last_explicit,
                        },
                    );
                }
            }
        }
    }

    /// Raw value following `previous`, or zero for the first case.
    fn auto_incremented(&mut self, raw_ty: TypeId, element: DeclId, previous: Option<&Expr>) -> Option<Expr> {
        let span = self.span(element);
        let Some(previous) = previous else {
            let integral = self
                .known
                .integer_literal
                .is_some_and(|p| self.type_conforms_to(raw_ty, p));
            if !integral {
                self.report(DiagnosticKind::EnumNonIntegerConvertibleRawType, span)
                    .emit();
                return None;
            }
            return Some(Expr::implicit(ExprKind::IntegerLiteral {
                text: "0".to_string(),
                negative: false,
            }));
        };

        let ExprKind::IntegerLiteral { text, negative } = &previous.kind else {
            self.report(DiagnosticKind::EnumNonIntegerRawValueAutoIncrement, span)
                .emit();
            return None;
        };
        let next = parse_integer(text)
            .map(|v| if *negative { -v } else { v })
            .and_then(|v| v.checked_add(1));
        let Some(next) = next else {
            self.report(DiagnosticKind::EnumRawValueIncrementOverflow, span)
                .message(text.as_str())
                .emit();
            return None;
        };
        Some(Expr::implicit(ExprKind::IntegerLiteral {
            text: next.unsigned_abs().to_string(),
            negative: next < 0,
        }))
    }

    fn check_raw_value(&mut self, e: DeclId, element: DeclId, value: &mut Expr, raw_ty: TypeId) {
        if let Err(err) = self.check_expr(value, DeclContext::Nominal(e), Some(raw_ty)) {
            let span = if value.implicit {
                self.span(element)
            } else {
                self.span_of(element, value.range)
            };
            self.report(DiagnosticKind::RawValueTypeMismatch, span)
                .message(err.to_string())
                .emit();
            value.ty = Some(crate::types::TYPE_ERROR);
        }
    }

    /// Location of the raw value of `element`: its literal, or its name
    /// when the value was auto-incremented.
    fn raw_value_span(&self, element: DeclId) -> Span {
        let value = self
            .ast
            .decl(element)
            .as_element()
            .and_then(|d| d.raw_value.as_ref())
            .filter(|v| !v.implicit);
        match value {
            Some(v) => self.span_of(element, v.range),
            None => self.span(element),
        }
    }

    fn report_duplicate_raw_value(
        &mut self,
        e: DeclId,
        element: DeclId,
        last_explicit: Option<DeclId>,
        found: RawValueSource,
    ) {
        let mut notes = Vec::new();
        if let Some(from) = last_explicit.filter(|&l| l != element) {
            notes.push(("raw value auto-incremented from here", self.raw_value_span(from)));
        }
        notes.push(("raw value previously used here", self.raw_value_span(found.element)));
        if found.last_explicit != Some(found.element) {
            match found.last_explicit {
                Some(from) => {
                    notes.push(("raw value auto-incremented from here", self.raw_value_span(from)))
                }
                None => {
                    let first = self.enum_elements(e).first().copied().unwrap_or(element);
                    notes.push(("raw value implicitly auto-incremented from zero", self.span(first)));
                }
            }
        }

        let span = self.raw_value_span(element);
        let mut diag = self
            .report(DiagnosticKind::EnumRawValueNotUnique, span)
            .message("raw value for enum case is not unique");
        for (note, note_span) in notes {
            diag = diag.related_to(note, note_span);
        }
        diag.emit();
        self.ast.decl_mut(element).invalid = true;
        debug!(case = %self.name(element), "duplicate raw value");
    }
}
