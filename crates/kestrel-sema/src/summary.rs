//! Serializable digest of a checked module.
//!
//! Names and types are rendered to strings so the summary stands alone:
//! consumers need neither the arena nor the type context to read it.

use std::fmt;

use serde::Serialize;

use crate::ast::{
    Accessibility, Ast, DeclId, DeclKind, FileKind, ImplicitCtorKind, StorageKind, Witness,
};
use crate::types::{TypeContext, TypeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticSummary {
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub decls: Vec<DeclSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclSummary {
    pub kind: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<Accessibility>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub implicit: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub invalid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesized: Option<ImplicitCtorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conformances: Vec<ConformanceSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<DeclSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConformanceSummary {
    pub protocol: String,
    pub invalid: bool,
    /// `requirement -> witness`, with `<derived>` for compiler-provided ones.
    pub witnesses: Vec<(String, String)>,
    pub type_witnesses: Vec<(String, String)>,
}

impl SemanticSummary {
    /// Summarize every non-prelude file of `ast`.
    pub fn build(ast: &Ast, types: &TypeContext) -> Self {
        let builder = SummaryBuilder { ast, types };
        let files = ast
            .files()
            .filter(|(_, f)| f.kind != FileKind::Prelude)
            .map(|(_, f)| FileSummary {
                name: f.name.clone(),
                decls: f.decls().iter().map(|&d| builder.decl(d)).collect(),
            })
            .collect();
        Self { files }
    }

    /// Find a top-level or nested declaration by its path of display
    /// names, like `["D", "init(x:)"]`.
    pub fn find(&self, path: &[&str]) -> Option<&DeclSummary> {
        let (first, rest) = path.split_first()?;
        let mut current = self
            .files
            .iter()
            .flat_map(|f| f.decls.iter())
            .find(|d| d.name == *first)?;
        for name in rest {
            current = current.members.iter().find(|d| d.name == *name)?;
        }
        Some(current)
    }
}

struct SummaryBuilder<'a> {
    ast: &'a Ast,
    types: &'a TypeContext,
}

impl SummaryBuilder<'_> {
    fn ty(&self, ty: TypeId) -> String {
        self.types.display(ty, &self.ast.interner).to_string()
    }

    fn decl(&self, d: DeclId) -> DeclSummary {
        let decl = self.ast.decl(d);
        let nominal = decl.as_nominal();
        let conformances = match &decl.kind {
            DeclKind::Extension(e) => e.conformances.as_slice(),
            _ => nominal.map_or(&[][..], |n| n.conformances.as_slice()),
        };
        let protocols = decl
            .protocols()
            .into_iter()
            .flatten()
            .map(|&p| self.ast.name_of(p))
            .collect();
        DeclSummary {
            kind: decl.descriptive_kind(),
            name: self.ast.name_of(d),
            ty: decl.interface_ty.map(|t| self.ty(t)),
            access: decl.access,
            implicit: decl.implicit,
            invalid: decl.invalid,
            overrides: decl.overridden.map(|b| self.qualified_name(b)),
            storage: decl.storage().map(|s| s.kind).filter(|&k| k != StorageKind::Stored),
            synthesized: decl.as_ctor().and_then(|c| c.synthesized),
            superclass: nominal.and_then(|n| n.superclass).map(|t| self.ty(t)),
            raw_type: nominal.and_then(|n| n.raw_type).map(|t| self.ty(t)),
            raw_value: decl
                .as_element()
                .and_then(|e| e.raw_value.as_ref())
                .map(|v| crate::ast::dump::dump_expr(self.ast, self.types, v)),
            protocols,
            conformances: conformances
                .iter()
                .flatten()
                .map(|c| ConformanceSummary {
                    protocol: self.ast.name_of(c.protocol),
                    invalid: c.invalid,
                    witnesses: c
                        .witnesses
                        .iter()
                        .map(|(&req, w)| {
                            let witness = match w {
                                Witness::Decl(w) => self.qualified_name(*w),
                                Witness::Derived => "<derived>".to_string(),
                            };
                            (self.ast.name_of(req), witness)
                        })
                        .collect(),
                    type_witnesses: c
                        .type_witnesses
                        .iter()
                        .map(|(&req, &ty)| (self.ast.name_of(req), self.ty(ty)))
                        .collect(),
                })
                .collect(),
            members: decl
                .members()
                .iter()
                .filter(|&&m| !self.ast.decl(m).is_accessor())
                .map(|&m| self.decl(m))
                .collect(),
        }
    }

    /// `Owner.member` for members of types, the plain name otherwise.
    fn qualified_name(&self, d: DeclId) -> String {
        match self.ast.nominal_of(self.ast.decl(d).parent) {
            Some(owner) => format!("{}.{}", self.ast.name_of(owner), self.ast.name_of(d)),
            None => self.ast.name_of(d),
        }
    }
}

impl fmt::Display for SemanticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            writeln!(f, "{}", file.name)?;
            for d in &file.decls {
                d.write(f, 1)?;
            }
        }
        Ok(())
    }
}

impl DeclSummary {
    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:width$}{} {}", "", self.kind, self.name, width = depth * 2)?;
        if let Some(ty) = &self.ty {
            write!(f, " : {ty}")?;
        }
        if let Some(access) = self.access {
            write!(f, " [{access}]")?;
        }
        if self.implicit {
            f.write_str(" implicit")?;
        }
        if self.invalid {
            f.write_str(" invalid")?;
        }
        if let Some(base) = &self.overrides {
            write!(f, " overrides {base}")?;
        }
        if let Some(raw) = &self.raw_value {
            write!(f, " = {raw}")?;
        }
        writeln!(f)?;
        for c in &self.conformances {
            let state = if c.invalid { " (invalid)" } else { "" };
            writeln!(f, "{:width$}conforms to {}{state}", "", c.protocol, width = (depth + 1) * 2)?;
        }
        for m in &self.members {
            m.write(f, depth + 1)?;
        }
        Ok(())
    }
}
