//! Declaration arena.
//!
//! Declarations reference each other by [`DeclId`]. Only member lists own
//! declarations; parents, override links and accessor pointers are indices,
//! so the cyclic declaration graph needs no shared ownership.

mod attrs;
mod builder;
mod context;
mod decl;
pub mod dump;
mod expr;
mod pattern;
mod source;
mod type_repr;


use kestrel_core::{Interner, Symbol};
use rowan::TextRange;

pub use attrs::{AttrKind, Attribute, Attributes, Accessibility, Fixity, ObjCName, Ownership};
pub use builder::{AstBuilder, ParamSpec};
pub(crate) use builder::accessor_name;
pub use context::DeclContext;
pub use decl::{
    AbstractTypeParamData, AccessorInfo, AccessorKind, Accessors, Conformance,
    ConstructorData, CtorKind, Decl, DeclId, DeclKind, DefaultArgKind, DestructorData,
    EnumElementData, ExtensionData, Failability, FuncData, GenericParamList, ImplicitCtorKind,
    ImportData, NominalData, NominalKind, OperatorData, ParamData, PatternBindingData,
    Requirement, RequirementKind, StaticSpelling, StorageData, StorageKind, SubscriptData,
    TypeAliasData, VarData, Witness,
};
pub use expr::{AccessSemantics, Arg, Body, Closure, ClosureId, Expr, ExprKind, Stmt};
pub use pattern::{Pattern, PatternKind};
pub use source::{FileId, FileKind, SourceFile, Span};
pub use type_repr::{IdentComponent, TupleReprElement, TypeLoc, TypeRepr, TypeReprKind};

#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub interner: Interner,
    files: Vec<SourceFile>,
    decls: Vec<Decl>,
    closures: Vec<Closure>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub fn add_file(
        &mut self,
        name: impl Into<String>,
        text: impl Into<String>,
        kind: FileKind,
    ) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            name: name.into(),
            text: text.into(),
            kind,
            decls: Vec::new(),
        });
        id
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn try_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId(i as u32), f))
    }

    pub fn text(&self, span: Span) -> &str {
        let text = &self.file(span.file).text;
        text.get(usize::from(span.range.start())..usize::from(span.range.end()))
            .unwrap_or("")
    }

    /// Push a declaration without attaching it to any member list
    /// (parameters, generic parameters, locals, accessors of protocols).
    pub fn alloc(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    /// Push a declaration and append it to its parent's member list.
    pub fn add_member(&mut self, decl: Decl) -> DeclId {
        let parent = decl.parent;
        let id = self.alloc(decl);
        if let Some(list) = self.member_list_mut(parent) {
            list.push(id);
        }
        id
    }

    /// Insert an existing declaration into its parent's member list right
    /// after `hint`, or at the end when `hint` is absent or not a member.
    pub fn insert_member_after(&mut self, hint: Option<DeclId>, id: DeclId) {
        let parent = self.decl(id).parent;
        let Some(list) = self.member_list_mut(parent) else {
            return;
        };
        if list.contains(&id) {
            return;
        }
        match hint.and_then(|h| list.iter().position(|&m| m == h)) {
            Some(pos) => list.insert(pos + 1, id),
            None => list.push(id),
        }
    }

    fn member_list_mut(&mut self, dc: DeclContext) -> Option<&mut Vec<DeclId>> {
        match dc {
            DeclContext::File(f) => Some(&mut self.files[f.0 as usize].decls),
            DeclContext::Nominal(d) => self.decls[d.0 as usize]
                .as_nominal_mut()
                .map(|n| &mut n.members),
            DeclContext::Extension(d) => self.decls[d.0 as usize]
                .as_extension_mut()
                .map(|e| &mut e.members),
            _ => None,
        }
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0 as usize]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.0 as usize]
    }

    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId(i as u32), d))
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn add_closure(&mut self, closure: Closure) -> ClosureId {
        let id = ClosureId(self.closures.len() as u32);
        self.closures.push(closure);
        id
    }

    pub fn closure(&self, id: ClosureId) -> &Closure {
        &self.closures[id.0 as usize]
    }

    pub fn closure_mut(&mut self, id: ClosureId) -> &mut Closure {
        &mut self.closures[id.0 as usize]
    }

    /// Display name of a declaration (`init(x:)`, `count`).
    pub fn name_of(&self, id: DeclId) -> String {
        self.decl(id).name.display(&self.interner).to_string()
    }

    /// Base name only (`init`, `count`).
    pub fn base_name_of(&self, id: DeclId) -> &str {
        self.resolve(self.decl(id).name.base())
    }

    /// Find the members of `dc` named `name` (simple base-name match).
    pub fn members_named(&self, dc: DeclContext, name: Symbol) -> Vec<DeclId> {
        self.members(dc)
            .iter()
            .copied()
            .filter(|&m| self.decl(m).name.base() == name)
            .collect()
    }

    pub fn empty_span(&self, file: FileId) -> Span {
        Span::new(file, TextRange::default())
    }
}
