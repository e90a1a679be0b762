//! Expressions and statements.
//!
//! Declaration checking never infers expressions; it hands initializers to
//! the expression oracle and builds bodies for synthesized declarations.

use kestrel_core::Symbol;
use rowan::TextRange;

use super::decl::DeclId;
use super::{DeclContext, FileId};
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClosureId(pub(crate) u32);

#[derive(Debug, Clone)]
pub struct Closure {
    pub parent: DeclContext,
    pub file: FileId,
    pub range: TextRange,
    pub body: Option<Body>,
}

/// How a storage reference is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessSemantics {
    #[default]
    Ordinary,
    /// Bypass accessors and touch the storage itself.
    DirectToStorage,
    /// Call the accessors of this declaration, not an override.
    DirectToAccessor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: TextRange,
    pub ty: Option<TypeId>,
    pub implicit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub label: Option<Symbol>,
    pub value: Expr,
}

impl Arg {
    pub fn new(label: Option<Symbol>, value: Expr) -> Self {
        Self { label, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntegerLiteral { text: String, negative: bool },
    FloatLiteral { text: String, negative: bool },
    StringLiteral(String),
    /// Single unicode scalar literal.
    CharLiteral(char),
    BooleanLiteral(bool),
    NilLiteral,
    DeclRef {
        decl: DeclId,
        semantics: AccessSemantics,
    },
    /// A type used as a value (`Int`, `Self`).
    TypeRef(TypeId),
    SelfRef,
    SuperRef,
    MemberRef {
        base: Box<Expr>,
        member: DeclId,
        semantics: AccessSemantics,
    },
    SubscriptRef {
        base: Box<Expr>,
        index: Box<Expr>,
        decl: DeclId,
        semantics: AccessSemantics,
    },
    /// `name` before lookup.
    UnresolvedDeclRef(Symbol),
    /// `base.name` before member resolution.
    UnresolvedMember { base: Box<Expr>, name: Symbol },
    Call { callee: Box<Expr>, args: Vec<Arg> },
    Tuple(Vec<Arg>),
    Assign { dest: Box<Expr>, source: Box<Expr> },
    ForceUnwrap(Box<Expr>),
    AddressOf(Box<Expr>),
    ForcedCast { sub: Box<Expr>, to: TypeId },
    ConditionalCast { sub: Box<Expr>, to: TypeId },
    Closure(ClosureId),
    /// Computation whose result type is already known.
    Opaque,
    Error,
}

impl Expr {
    pub fn new(kind: ExprKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            ty: None,
            implicit: false,
        }
    }

    pub fn implicit(kind: ExprKind) -> Self {
        Self {
            kind,
            range: TextRange::default(),
            ty: None,
            implicit: true,
        }
    }

    pub fn with_type(mut self, ty: TypeId) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn integer(text: impl Into<String>, range: TextRange) -> Self {
        Self::new(
            ExprKind::IntegerLiteral {
                text: text.into(),
                negative: false,
            },
            range,
        )
    }

    pub fn decl_ref(decl: DeclId, semantics: AccessSemantics) -> Self {
        Self::implicit(ExprKind::DeclRef { decl, semantics })
    }

    pub fn member(base: Expr, member: DeclId, semantics: AccessSemantics) -> Self {
        Self::implicit(ExprKind::MemberRef {
            base: Box::new(base),
            member,
            semantics,
        })
    }

    pub fn call(callee: Expr, args: Vec<Arg>) -> Self {
        Self::implicit(ExprKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    pub fn tuple(args: Vec<Arg>) -> Self {
        Self::implicit(ExprKind::Tuple(args))
    }

    pub fn assign(dest: Expr, source: Expr) -> Self {
        Self::implicit(ExprKind::Assign {
            dest: Box::new(dest),
            source: Box::new(source),
        })
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::IntegerLiteral { .. }
                | ExprKind::FloatLiteral { .. }
                | ExprKind::StringLiteral(_)
                | ExprKind::CharLiteral(_)
                | ExprKind::BooleanLiteral(_)
                | ExprKind::NilLiteral
        )
    }

    /// Closures directly inside this expression; closures nested in
    /// closure bodies are owned by their enclosing closure.
    pub fn direct_closures(&self) -> Vec<ClosureId> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let ExprKind::Closure(id) = e.kind {
                out.push(id);
            }
        });
        out
    }

    /// Pre-order walk over this expression and its subexpressions. Closure
    /// bodies are not entered.
    pub fn walk(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match &self.kind {
            ExprKind::MemberRef { base, .. } | ExprKind::UnresolvedMember { base, .. } => {
                base.walk(f)
            }
            ExprKind::SubscriptRef { base, index, .. } => {
                base.walk(f);
                index.walk(f);
            }
            ExprKind::Call { callee, args } => {
                callee.walk(f);
                for arg in args {
                    arg.value.walk(f);
                }
            }
            ExprKind::Tuple(args) => {
                for arg in args {
                    arg.value.walk(f);
                }
            }
            ExprKind::Assign { dest, source } => {
                dest.walk(f);
                source.walk(f);
            }
            ExprKind::ForceUnwrap(sub)
            | ExprKind::AddressOf(sub)
            | ExprKind::ForcedCast { sub, .. }
            | ExprKind::ConditionalCast { sub, .. } => sub.walk(f),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Return(Option<Expr>),
    /// `let <var> = <init>`
    Let { var: DeclId, init: Expr },
    If { cond: Expr, then: Vec<Stmt> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    pub stmts: Vec<Stmt>,
    pub implicit: bool,
}

impl Body {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            implicit: false,
        }
    }

    pub fn implicit(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            implicit: true,
        }
    }
}
