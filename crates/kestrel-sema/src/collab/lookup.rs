//! Name lookup over the declaration arena.

use indexmap::IndexSet;
use kestrel_core::{DeclName, Symbol};

use super::{LookupOptions, NameLookup};
use crate::ast::{Ast, DeclContext, DeclId, DeclKind, FileId, Fixity};
use crate::types::TypeContext;

/// Scope-walking lookup that reads member lists directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArenaLookup;

impl ArenaLookup {
    pub fn new() -> Self {
        Self
    }
}

/// Extensions bound to `nominal`, in arena order.
pub fn extensions_of(ast: &Ast, nominal: DeclId) -> Vec<DeclId> {
    ast.decls()
        .filter(|(_, d)| d.as_extension().is_some_and(|e| e.nominal == Some(nominal)))
        .map(|(id, _)| id)
        .collect()
}

fn visible(ast: &Ast, id: DeclId) -> bool {
    !ast.decl(id).is_accessor()
}

fn named_in(ast: &Ast, members: &[DeclId], name: Symbol) -> impl Iterator<Item = DeclId> {
    members
        .iter()
        .copied()
        .filter(move |&m| ast.decl(m).name.base() == name && visible(ast, m))
}

fn generic_params_named(ast: &Ast, owner: DeclId, name: Symbol) -> Vec<DeclId> {
    let decl = ast.decl(owner);
    let mut out: Vec<DeclId> = decl
        .generic_params()
        .map(|list| {
            list.params
                .iter()
                .copied()
                .filter(|&p| ast.decl(p).name.base() == name)
                .collect()
        })
        .unwrap_or_default();
    if let Some(self_param) = decl.as_nominal().and_then(|n| n.self_param)
        && ast.decl(self_param).name.base() == name
    {
        out.push(self_param);
    }
    out
}

impl ArenaLookup {
    fn lookup_in_type(&self, ast: &Ast, nominal: DeclId, name: Symbol) -> Vec<DeclId> {
        let mut out = generic_params_named(ast, nominal, name);
        out.extend(named_in(ast, ast.decl(nominal).members(), name));
        for ext in extensions_of(ast, nominal) {
            out.extend(named_in(ast, ast.decl(ext).members(), name));
        }
        out
    }

    fn lookup_module(&self, ast: &Ast, current: Option<FileId>, name: Symbol) -> Vec<DeclId> {
        let mut out = Vec::new();
        if let Some(file) = current {
            out.extend(named_in(ast, ast.file(file).decls(), name));
        }
        for (id, file) in ast.files() {
            if Some(id) != current {
                out.extend(named_in(ast, file.decls(), name));
            }
        }
        out.retain(|&d| !matches!(ast.decl(d).kind, DeclKind::Extension(_)));
        out
    }
}

impl NameLookup for ArenaLookup {
    fn lookup_unqualified(&self, ast: &Ast, dc: DeclContext, name: Symbol) -> Vec<DeclId> {
        let mut current = Some(dc);
        while let Some(dc) = current {
            let found = match dc {
                DeclContext::Nominal(d) => self.lookup_in_type(ast, d, name),
                DeclContext::Extension(e) => match ast.nominal_of(dc) {
                    Some(n) => self.lookup_in_type(ast, n, name),
                    None => named_in(ast, ast.decl(e).members(), name).collect(),
                },
                DeclContext::Function(f) => {
                    let mut out = generic_params_named(ast, f, name);
                    out.extend(
                        ast.decl(f)
                            .params()
                            .iter()
                            .copied()
                            .filter(|&p| ast.decl(p).name.base() == name),
                    );
                    out
                }
                DeclContext::File(file) => return self.lookup_module(ast, Some(file), name),
                DeclContext::Module => return self.lookup_module(ast, None, name),
                DeclContext::Closure(_)
                | DeclContext::TopLevelCode(_)
                | DeclContext::Initializer(_) => Vec::new(),
            };
            if !found.is_empty() {
                return found;
            }
            current = ast.parent_context(dc);
        }
        Vec::new()
    }

    fn lookup_member(
        &self,
        ast: &Ast,
        types: &TypeContext,
        nominal: DeclId,
        name: &DeclName,
        options: LookupOptions,
    ) -> Vec<DeclId> {
        let matches = |m: DeclId| {
            let candidate = &ast.decl(m).name;
            if options.base_name_only {
                candidate.base() == name.base()
            } else {
                candidate.matches(name)
            }
        };

        let mut out = Vec::new();
        let mut seen = IndexSet::new();
        let mut current = Some(nominal);
        while let Some(n) = current {
            if !seen.insert(n) {
                break;
            }
            let mut containers = vec![n];
            if options.extensions {
                containers.extend(extensions_of(ast, n));
            }
            for container in containers {
                out.extend(
                    ast.decl(container)
                        .members()
                        .iter()
                        .copied()
                        .filter(|&m| visible(ast, m) && matches(m)),
                );
            }
            if !options.superclasses {
                break;
            }
            current = ast
                .decl(n)
                .as_nominal()
                .and_then(|data| data.superclass)
                .and_then(|sup| types.class_decl(sup));
        }
        out
    }

    fn lookup_constructors(&self, ast: &Ast, nominal: DeclId) -> Vec<DeclId> {
        let mut containers = vec![nominal];
        containers.extend(extensions_of(ast, nominal));
        containers
            .into_iter()
            .flat_map(|c| ast.decl(c).members().to_vec())
            .filter(|&m| matches!(ast.decl(m).kind, DeclKind::Constructor(_)))
            .collect()
    }

    fn lookup_operator(&self, ast: &Ast, name: Symbol, fixity: Fixity) -> Option<DeclId> {
        ast.files().find_map(|(_, file)| {
            file.decls().iter().copied().find(|&d| {
                let decl = ast.decl(d);
                decl.name.base() == name
                    && matches!(&decl.kind, DeclKind::Operator(op) if op.fixity == fixity)
            })
        })
    }
}
