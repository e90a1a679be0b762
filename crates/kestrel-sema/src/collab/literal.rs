//! Expression checker that understands literals and already-typed references.
//!
//! Literals take the contextual type when that type conforms to the matching
//! literal protocol, and fall back to the prelude defaults otherwise.

use indexmap::IndexSet;

use super::lookup::extensions_of;
use super::{ExprChecker, ExprContext, ExprError};
use crate::ast::{Ast, DeclContext, DeclId, Expr, ExprKind};
use crate::types::{TYPE_RAW_POINTER, TYPE_UNIT, TupleElement, TypeContext, TypeId, TypeShape};

#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralChecker;

impl LiteralChecker {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literal {
    Integer,
    Float,
    Boolean,
    String,
    Character,
}

/// Every protocol `nominal` conforms to, through its extensions, its
/// superclass chain and inherited protocols.
pub(crate) fn all_protocols(ast: &Ast, types: &TypeContext, nominal: DeclId) -> IndexSet<DeclId> {
    let mut out = IndexSet::new();
    let mut seen = IndexSet::new();
    let mut current = Some(nominal);
    while let Some(n) = current {
        if !seen.insert(n) {
            break;
        }
        let mut work: Vec<DeclId> = ast.decl(n).protocols().into_iter().flatten().copied().collect();
        for ext in extensions_of(ast, n) {
            work.extend(ast.decl(ext).protocols().into_iter().flatten().copied());
        }
        if ast.decl(n).is_protocol() {
            work.push(n);
        }
        while let Some(p) = work.pop() {
            if out.insert(p) {
                work.extend(ast.decl(p).protocols().into_iter().flatten().copied());
            }
        }
        current = ast
            .decl(n)
            .as_nominal()
            .and_then(|data| data.superclass)
            .and_then(|sup| types.class_decl(sup));
    }
    out
}

pub(crate) fn nominal_conforms(
    ast: &Ast,
    types: &TypeContext,
    nominal: DeclId,
    protocol: DeclId,
) -> bool {
    all_protocols(ast, types, nominal).contains(&protocol)
}

/// Whether `sub` is `sup` or inherits from it.
pub(crate) fn is_subclass(ast: &Ast, types: &TypeContext, sub: DeclId, sup: DeclId) -> bool {
    let mut seen = IndexSet::new();
    let mut current = Some(sub);
    while let Some(c) = current {
        if c == sup {
            return true;
        }
        if !seen.insert(c) {
            return false;
        }
        current = ast
            .decl(c)
            .as_nominal()
            .and_then(|data| data.superclass)
            .and_then(|s| types.class_decl(s));
    }
    false
}

/// Non-generic nominal type of a prelude declaration.
pub(crate) fn nominal_type(ast: &Ast, types: &mut TypeContext, decl: DeclId) -> Option<TypeId> {
    let d = ast.decl(decl);
    Some(types.intern(TypeShape::Nominal {
        kind: d.nominal_kind()?,
        decl,
        name: d.name.base(),
        args: Vec::new(),
    }))
}

impl LiteralChecker {
    fn literal_type(
        cx: &mut ExprContext<'_>,
        literal: Literal,
        text_len: usize,
        contextual: Option<TypeId>,
    ) -> Result<TypeId, ExprError> {
        let known = cx.known;
        let protocols: Vec<Option<DeclId>> = match literal {
            Literal::Integer => vec![known.integer_literal],
            Literal::Float => vec![known.float_literal],
            Literal::Boolean => vec![known.boolean_literal],
            Literal::String if text_len == 1 => vec![
                known.string_literal,
                known.character_literal,
                known.unicode_scalar_literal,
            ],
            Literal::String => vec![known.string_literal],
            Literal::Character => vec![known.unicode_scalar_literal, known.character_literal],
        };

        if let Some(ctx) = contextual {
            let object = cx.types.optional_object(ctx).unwrap_or(ctx);
            if let Some(decl) = cx.types.nominal_decl(object) {
                let conforming = protocols
                    .iter()
                    .flatten()
                    .any(|&p| nominal_conforms(cx.ast, cx.types, decl, p));
                if conforming {
                    return Ok(object);
                }
            }
        }

        let default = match literal {
            Literal::Integer => known.int,
            Literal::Float => known.double,
            Literal::Boolean => known.bool,
            Literal::String => known.string,
            Literal::Character => known.character,
        };
        default
            .and_then(|d| nominal_type(cx.ast, cx.types, d))
            .ok_or(ExprError::Ambiguous)
    }

    fn check(
        &mut self,
        cx: &mut ExprContext<'_>,
        expr: &mut Expr,
        contextual: Option<TypeId>,
    ) -> Result<TypeId, ExprError> {
        let ty = match &mut expr.kind {
            ExprKind::IntegerLiteral { .. } => {
                Self::literal_type(cx, Literal::Integer, 0, contextual)?
            }
            ExprKind::FloatLiteral { .. } => Self::literal_type(cx, Literal::Float, 0, contextual)?,
            ExprKind::BooleanLiteral(_) => {
                Self::literal_type(cx, Literal::Boolean, 0, contextual)?
            }
            ExprKind::StringLiteral(text) => {
                let len = text.chars().count();
                Self::literal_type(cx, Literal::String, len, contextual)?
            }
            ExprKind::CharLiteral(_) => Self::literal_type(cx, Literal::Character, 1, contextual)?,
            ExprKind::NilLiteral => {
                let ctx = contextual.ok_or(ExprError::NilWithoutContext)?;
                let nil_convertible = cx
                    .types
                    .nominal_decl(ctx)
                    .zip(cx.known.nil_literal)
                    .is_some_and(|(d, p)| nominal_conforms(cx.ast, cx.types, d, p));
                if cx.types.optional_object(ctx).is_none() && !nil_convertible {
                    return Err(ExprError::NilWithoutContext);
                }
                ctx
            }
            ExprKind::DeclRef { decl, .. } => cx.ast.decl(*decl).ty.ok_or(ExprError::Ambiguous)?,
            ExprKind::TypeRef(t) => cx.types.metatype(*t),
            ExprKind::MemberRef { base, member, .. } => {
                // `self` and `super` bases carry no type of their own here.
                let _ = self.check(cx, base, None);
                let ty = cx.ast.decl(*member).ty.ok_or(ExprError::Ambiguous)?;
                if cx.ast.decl(*member).is_abstract_function() {
                    cx.types.function_result(ty).ok_or(ExprError::Ambiguous)?
                } else {
                    ty
                }
            }
            ExprKind::Call { callee, args } => {
                for arg in args.iter_mut() {
                    self.check(cx, &mut arg.value, None)?;
                }
                match callee.kind {
                    ExprKind::TypeRef(t) => {
                        callee.ty = Some(cx.types.metatype(t));
                        t
                    }
                    ExprKind::Closure(_) => {
                        let result = contextual.unwrap_or(TYPE_UNIT);
                        let fn_ty = cx.types.function(TYPE_UNIT, result);
                        self.check(cx, callee, Some(fn_ty))?;
                        result
                    }
                    _ => {
                        let callee_ty = self.check(cx, callee, None)?;
                        match cx.types.metatype_instance(callee_ty) {
                            Some(instance) => instance,
                            None => cx
                                .types
                                .function_result(callee_ty)
                                .ok_or(ExprError::Ambiguous)?,
                        }
                    }
                }
            }
            ExprKind::Tuple(args) => {
                let expected: Option<Vec<TypeId>> = contextual
                    .and_then(|c| cx.types.tuple_elements(c))
                    .filter(|elements| elements.len() == args.len())
                    .map(|elements| elements.iter().map(|e| e.ty).collect());
                let mut elements = Vec::with_capacity(args.len());
                for (i, arg) in args.iter_mut().enumerate() {
                    let ctx = expected.as_ref().map(|e| e[i]);
                    let ty = self.check(cx, &mut arg.value, ctx)?;
                    let ty = match ctx {
                        Some(ctx) => Self::coerce(cx, ty, ctx)?,
                        None => ty,
                    };
                    elements.push(TupleElement::new(arg.label, ty));
                }
                cx.types.tuple(elements)
            }
            ExprKind::Assign { dest, source } => {
                let dest_ty = self.check(cx, dest, None)?;
                let source_ty = self.check(cx, source, Some(dest_ty))?;
                Self::coerce(cx, source_ty, dest_ty)?;
                TYPE_UNIT
            }
            ExprKind::ForceUnwrap(sub) => {
                let ty = self.check(cx, sub, None)?;
                cx.types.optional_object(ty).ok_or(ExprError::Ambiguous)?
            }
            ExprKind::AddressOf(sub) => {
                self.check(cx, sub, None)?;
                TYPE_RAW_POINTER
            }
            ExprKind::ForcedCast { sub, to } => {
                let to = *to;
                self.check(cx, sub, None)?;
                to
            }
            ExprKind::ConditionalCast { sub, to } => {
                let to = *to;
                self.check(cx, sub, None)?;
                cx.types.optional(to)
            }
            ExprKind::Closure(_) => match contextual {
                Some(ctx) if cx.types.function_parts(ctx).is_some() => ctx,
                _ => cx.types.function(TYPE_UNIT, TYPE_UNIT),
            },
            ExprKind::Opaque => expr.ty.ok_or(ExprError::Ambiguous)?,
            ExprKind::SelfRef
            | ExprKind::SuperRef
            | ExprKind::SubscriptRef { .. }
            | ExprKind::UnresolvedMember { .. }
            | ExprKind::UnresolvedDeclRef(_)
            | ExprKind::Error => return Err(ExprError::Ambiguous),
        };
        expr.ty = Some(ty);
        Ok(ty)
    }

    /// Convert a value of type `found` to `expected`: identity, optional
    /// injection or class upcast.
    fn coerce(
        cx: &mut ExprContext<'_>,
        found: TypeId,
        expected: TypeId,
    ) -> Result<TypeId, ExprError> {
        if cx.types.is_error(found) || cx.types.is_error(expected) {
            return Ok(expected);
        }
        if cx.types.same_type(found, expected) {
            return Ok(expected);
        }
        if let Some(object) = cx.types.optional_object(expected)
            && Self::coerce(cx, found, object).is_ok()
        {
            return Ok(expected);
        }
        if let (Some(sub), Some(sup)) = (cx.types.class_decl(found), cx.types.class_decl(expected))
            && is_subclass(cx.ast, cx.types, sub, sup)
        {
            return Ok(expected);
        }
        Err(ExprError::Mismatch {
            found: cx.types.display(found, &cx.ast.interner).to_string(),
            expected: cx.types.display(expected, &cx.ast.interner).to_string(),
        })
    }
}

impl ExprChecker for LiteralChecker {
    fn type_check(
        &mut self,
        cx: &mut ExprContext<'_>,
        expr: &mut Expr,
        _dc: DeclContext,
        contextual: Option<TypeId>,
    ) -> Result<TypeId, ExprError> {
        let ty = self.check(cx, expr, contextual)?;
        match contextual {
            Some(ctx) => {
                let ty = Self::coerce(cx, ty, ctx)?;
                expr.ty = Some(ty);
                Ok(ty)
            }
            None => Ok(ty),
        }
    }
}

