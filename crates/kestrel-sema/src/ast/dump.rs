//! Textual dump of declarations and synthesized bodies.
//!
//! One line per declaration, members indented below their container,
//! statements of bodies indented below their owner:
//!
//! ```text
//! class D
//!   init(x:) implicit chaining : (x: Int) -> D
//!     super.init(x: x)
//! ```

use std::fmt::Write as _;

use super::{
    AccessSemantics, Ast, Body, DeclId, DeclKind, Expr, ExprKind, ImplicitCtorKind, Stmt,
};
use crate::types::TypeContext;

const INDENT: &str = "  ";

/// Dump `d` and, recursively, its members and bodies.
pub fn dump_decl(ast: &Ast, types: &TypeContext, d: DeclId) -> String {
    let mut out = String::new();
    Dumper { ast, types }.decl(&mut out, d, 0);
    out
}

/// Dump the statements of `body`, one per line.
pub fn dump_body(ast: &Ast, types: &TypeContext, body: &Body) -> String {
    let mut out = String::new();
    Dumper { ast, types }.body(&mut out, body, 0);
    out
}

/// Dump a single expression.
pub fn dump_expr(ast: &Ast, types: &TypeContext, expr: &Expr) -> String {
    let mut out = String::new();
    Dumper { ast, types }.expr(&mut out, expr);
    out
}

struct Dumper<'a> {
    ast: &'a Ast,
    types: &'a TypeContext,
}

impl Dumper<'_> {
    fn indent(out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str(INDENT);
        }
    }

    fn decl(&self, out: &mut String, d: DeclId, depth: usize) {
        let decl = self.ast.decl(d);
        Self::indent(out, depth);
        let keyword = match &decl.kind {
            DeclKind::Var(v) if v.is_let => "let",
            DeclKind::Var(_) => "var",
            DeclKind::Func(_) => "func",
            DeclKind::Constructor(_) | DeclKind::Destructor(_) | DeclKind::Subscript(_) => "",
            DeclKind::EnumElement(_) => "case",
            DeclKind::PatternBinding(_) => "binding",
            _ => decl.descriptive_kind(),
        };
        if !keyword.is_empty() {
            out.push_str(keyword);
            out.push(' ');
        }
        out.push_str(&self.ast.name_of(d));

        if decl.implicit {
            out.push_str(" implicit");
        }
        if let DeclKind::Constructor(c) = &decl.kind {
            match c.synthesized {
                Some(ImplicitCtorKind::Default) => out.push_str(" default"),
                Some(ImplicitCtorKind::Memberwise) => out.push_str(" memberwise"),
                Some(ImplicitCtorKind::Chaining) => out.push_str(" chaining"),
                Some(ImplicitCtorKind::Stub) => out.push_str(" stub"),
                None => {}
            }
        }
        if decl.invalid {
            out.push_str(" invalid");
        }
        if let Some(ty) = decl.interface_ty {
            let _ = write!(out, " : {}", self.types.display(ty, &self.ast.interner));
        }
        if let Some(raw) = decl.as_element().and_then(|e| e.raw_value.as_ref()) {
            out.push_str(" = ");
            self.expr(out, raw);
        }
        out.push('\n');

        if let Some(body) = decl.body() {
            self.body(out, body, depth + 1);
        }
        for &m in decl.members() {
            self.decl(out, m, depth + 1);
        }
    }

    fn body(&self, out: &mut String, body: &Body, depth: usize) {
        for stmt in &body.stmts {
            self.stmt(out, stmt, depth);
        }
    }

    fn stmt(&self, out: &mut String, stmt: &Stmt, depth: usize) {
        Self::indent(out, depth);
        match stmt {
            Stmt::Expr(e) => self.expr(out, e),
            Stmt::Return(None) => out.push_str("return"),
            Stmt::Return(Some(e)) => {
                out.push_str("return ");
                self.expr(out, e);
            }
            Stmt::Let { var, init } => {
                let _ = write!(out, "let {} = ", self.ast.base_name_of(*var));
                self.expr(out, init);
            }
            Stmt::If { cond, then } => {
                out.push_str("if ");
                self.expr(out, cond);
                out.push('\n');
                for s in then {
                    self.stmt(out, s, depth + 1);
                }
                return;
            }
        }
        out.push('\n');
    }

    fn semantics(out: &mut String, semantics: AccessSemantics) {
        match semantics {
            AccessSemantics::Ordinary => {}
            AccessSemantics::DirectToStorage => out.push_str("[storage]"),
            AccessSemantics::DirectToAccessor => out.push_str("[accessor]"),
        }
    }

    fn args(&self, out: &mut String, args: &[super::Arg]) {
        out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if let Some(label) = arg.label {
                let _ = write!(out, "{}: ", self.ast.resolve(label));
            }
            self.expr(out, &arg.value);
        }
        out.push(')');
    }

    fn expr(&self, out: &mut String, expr: &Expr) {
        match &expr.kind {
            ExprKind::IntegerLiteral { text, negative } | ExprKind::FloatLiteral { text, negative } => {
                if *negative {
                    out.push('-');
                }
                out.push_str(text);
            }
            ExprKind::StringLiteral(s) => {
                let _ = write!(out, "{s:?}");
            }
            ExprKind::CharLiteral(c) => {
                let _ = write!(out, "{c:?}");
            }
            ExprKind::BooleanLiteral(b) => {
                let _ = write!(out, "{b}");
            }
            ExprKind::NilLiteral => out.push_str("nil"),
            ExprKind::DeclRef { decl, semantics } => {
                out.push_str(self.ast.base_name_of(*decl));
                Self::semantics(out, *semantics);
            }
            ExprKind::TypeRef(ty) => {
                let _ = write!(out, "{}", self.types.display(*ty, &self.ast.interner));
            }
            ExprKind::SelfRef => out.push_str("self"),
            ExprKind::SuperRef => out.push_str("super"),
            ExprKind::MemberRef {
                base,
                member,
                semantics,
            } => {
                self.expr(out, base);
                out.push('.');
                out.push_str(self.ast.base_name_of(*member));
                Self::semantics(out, *semantics);
            }
            ExprKind::SubscriptRef {
                base,
                index,
                semantics,
                ..
            } => {
                self.expr(out, base);
                out.push('[');
                self.expr(out, index);
                out.push(']');
                Self::semantics(out, *semantics);
            }
            ExprKind::UnresolvedDeclRef(name) => out.push_str(self.ast.resolve(*name)),
            ExprKind::UnresolvedMember { base, name } => {
                self.expr(out, base);
                out.push('.');
                out.push_str(self.ast.resolve(*name));
            }
            ExprKind::Call { callee, args } => {
                self.expr(out, callee);
                self.args(out, args);
            }
            ExprKind::Tuple(args) => self.args(out, args),
            ExprKind::Assign { dest, source } => {
                self.expr(out, dest);
                out.push_str(" = ");
                self.expr(out, source);
            }
            ExprKind::ForceUnwrap(sub) => {
                self.expr(out, sub);
                out.push('!');
            }
            ExprKind::AddressOf(sub) => {
                out.push('&');
                self.expr(out, sub);
            }
            ExprKind::ForcedCast { sub, to } => {
                self.expr(out, sub);
                let _ = write!(out, " as! {}", self.types.display(*to, &self.ast.interner));
            }
            ExprKind::ConditionalCast { sub, to } => {
                self.expr(out, sub);
                let _ = write!(out, " as? {}", self.types.display(*to, &self.ast.interner));
            }
            ExprKind::Closure(id) => {
                let _ = write!(out, "{{ closure #{} }}", id.0);
            }
            ExprKind::Opaque => out.push_str("<opaque>"),
            ExprKind::Error => out.push_str("<error>"),
        }
    }
}
