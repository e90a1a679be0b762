//! Construction API used by parsers, the prelude and tests.
//!
//! Every method takes explicit source ranges; the builder only wires
//! declarations into the arena and their parent member lists.

use kestrel_core::{DeclName, Symbol};
use rowan::TextRange;

use super::{
    AbstractTypeParamData, AccessorInfo, AccessorKind, Ast, AttrKind, Attribute, Body, Closure,
    ClosureId, ConstructorData, Decl, DeclContext, DeclId, DeclKind, DestructorData,
    EnumElementData, Expr, ExtensionData, FileId, Fixity, FuncData, GenericParamList,
    IdentComponent, ImportData, NominalData, NominalKind, OperatorData, ParamData, Pattern,
    PatternBindingData, Requirement, RequirementKind, StaticSpelling, StorageKind, SubscriptData,
    TupleReprElement, TypeAliasData, TypeLoc, TypeRepr, TypeReprKind, VarData,
};

/// A parameter as written: `label name: Type`.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub api_label: Option<String>,
    pub name: String,
    pub annotation: Option<TypeRepr>,
    pub range: TextRange,
    /// Label and name only; defaults to `range`.
    pub names_range: Option<TextRange>,
    pub variadic: bool,
}

impl ParamSpec {
    /// A parameter whose argument label equals its name.
    pub fn labeled(name: &str, annotation: TypeRepr, range: TextRange) -> Self {
        Self {
            api_label: Some(name.to_string()),
            name: name.to_string(),
            annotation: Some(annotation),
            range,
            names_range: None,
            variadic: false,
        }
    }

    /// `_ name: Type`
    pub fn unlabeled(name: &str, annotation: TypeRepr, range: TextRange) -> Self {
        Self {
            api_label: None,
            ..Self::labeled(name, annotation, range)
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

pub struct AstBuilder<'a> {
    ast: &'a mut Ast,
    file: FileId,
}

impl<'a> AstBuilder<'a> {
    pub fn new(ast: &'a mut Ast, file: FileId) -> Self {
        Self { ast, file }
    }

    pub fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    /// Top-level context of the file being built.
    pub fn root(&self) -> DeclContext {
        DeclContext::File(self.file)
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        self.ast.intern(s)
    }

    fn make(
        &mut self,
        kind: DeclKind,
        name: DeclName,
        parent: DeclContext,
        range: TextRange,
        name_range: TextRange,
    ) -> Decl {
        Decl::new(kind, name, parent, self.file, range, name_range)
    }

    fn simple(&mut self, name: &str) -> DeclName {
        DeclName::simple(self.ast.intern(name))
    }

    fn compound(&mut self, base: &str, params: &[ParamSpec]) -> DeclName {
        let base = self.ast.intern(base);
        let labels = params
            .iter()
            .map(|p| p.api_label.as_deref().map(|l| self.ast.intern(l)))
            .collect();
        DeclName::compound(base, labels)
    }

    pub fn ident(&mut self, name: &str, range: TextRange) -> TypeRepr {
        TypeRepr::ident(self.ast.intern(name), range)
    }

    pub fn generic_ident(&mut self, name: &str, args: Vec<TypeRepr>, range: TextRange) -> TypeRepr {
        let mut component = IdentComponent::new(self.ast.intern(name), range);
        component.args = args;
        TypeRepr {
            kind: TypeReprKind::Ident(vec![component]),
            range,
        }
    }

    /// `base.name`, extending an identifier type.
    pub fn member_ident(&mut self, base: TypeRepr, name: &str, range: TextRange) -> TypeRepr {
        let component = IdentComponent::new(self.ast.intern(name), range);
        let full = base.range.cover(range);
        let components = match base.kind {
            TypeReprKind::Ident(mut components) => {
                components.push(component);
                components
            }
            _ => vec![component],
        };
        TypeRepr {
            kind: TypeReprKind::Ident(components),
            range: full,
        }
    }

    pub fn tuple_repr(
        &mut self,
        elements: Vec<(Option<&str>, TypeRepr)>,
        range: TextRange,
    ) -> TypeRepr {
        let elements = elements
            .into_iter()
            .map(|(label, ty)| TupleReprElement {
                label: label.map(|l| self.ast.intern(l)),
                ty,
                variadic: false,
            })
            .collect();
        TypeRepr {
            kind: TypeReprKind::Tuple(elements),
            range,
        }
    }

    pub fn nominal(
        &mut self,
        kind: NominalKind,
        parent: DeclContext,
        name: &str,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let data = NominalData {
            brace_range: range,
            ..NominalData::default()
        };
        let decl_kind = match kind {
            NominalKind::Struct => DeclKind::Struct(data),
            NominalKind::Enum => DeclKind::Enum(data),
            NominalKind::Class => DeclKind::Class(data),
            NominalKind::Protocol => DeclKind::Protocol(data),
        };
        let name = self.simple(name);
        let decl = self.make(decl_kind, name, parent, range, name_range);
        let id = self.ast.add_member(decl);

        if kind == NominalKind::Protocol {
            let self_name = self.simple("Self");
            let mut self_param = self.make(
                DeclKind::GenericParam(AbstractTypeParamData::default()),
                self_name,
                DeclContext::Nominal(id),
                name_range,
                name_range,
            );
            self_param.implicit = true;
            let self_param = self.ast.alloc(self_param);
            if let Some(n) = self.ast.decl_mut(id).as_nominal_mut() {
                n.self_param = Some(self_param);
            }
        }
        id
    }

    /// Append an entry to the inheritance clause of `decl`.
    pub fn inherit(&mut self, decl: DeclId, repr: TypeRepr) {
        if let Some(clause) = self.ast.decl_mut(decl).inherited_mut() {
            clause.push(TypeLoc::new(repr));
        }
    }

    /// Attach `<A, B>` to `owner`, returning the parameter declarations.
    pub fn generic_params(
        &mut self,
        owner: DeclId,
        params: &[(&str, TextRange)],
        range: TextRange,
    ) -> Vec<DeclId> {
        let parent = match self.ast.decl(owner).kind {
            DeclKind::Func(_) | DeclKind::Constructor(_) => DeclContext::Function(owner),
            _ => DeclContext::Nominal(owner),
        };
        let ids: Vec<DeclId> = params
            .iter()
            .map(|&(name, r)| {
                let name = self.simple(name);
                let decl = self.make(
                    DeclKind::GenericParam(AbstractTypeParamData::default()),
                    name,
                    parent,
                    r,
                    r,
                );
                self.ast.alloc(decl)
            })
            .collect();
        let list = GenericParamList {
            params: ids.clone(),
            range,
            ..GenericParamList::default()
        };
        let slot = match &mut self.ast.decl_mut(owner).kind {
            DeclKind::Func(f) => Some(&mut f.generic_params),
            DeclKind::Constructor(c) => Some(&mut c.generic_params),
            DeclKind::Enum(n) | DeclKind::Struct(n) | DeclKind::Class(n) | DeclKind::Protocol(n) => {
                Some(&mut n.generic_params)
            }
            _ => None,
        };
        if let Some(slot) = slot {
            *slot = Some(list);
        }
        ids
    }

    pub fn conformance_requirement(
        &mut self,
        owner: DeclId,
        subject: TypeRepr,
        constraint: TypeRepr,
    ) {
        let range = subject.range.cover(constraint.range);
        self.push_requirement(
            owner,
            RequirementKind::Conformance {
                subject: TypeLoc::new(subject),
                constraint: TypeLoc::new(constraint),
            },
            range,
        );
    }

    pub fn same_type_requirement(&mut self, owner: DeclId, first: TypeRepr, second: TypeRepr) {
        let range = first.range.cover(second.range);
        self.push_requirement(
            owner,
            RequirementKind::SameType {
                first: TypeLoc::new(first),
                second: TypeLoc::new(second),
            },
            range,
        );
    }

    fn push_requirement(&mut self, owner: DeclId, kind: RequirementKind, range: TextRange) {
        if let Some(list) = self.ast.decl_mut(owner).generic_params_mut() {
            list.requirements.push(Requirement {
                kind,
                range,
                invalid: false,
            });
        }
    }

    pub fn type_alias(
        &mut self,
        parent: DeclContext,
        name: &str,
        underlying: TypeRepr,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let name = self.simple(name);
        let data = TypeAliasData {
            underlying: TypeLoc::new(underlying),
        };
        let decl = self.make(DeclKind::TypeAlias(data), name, parent, range, name_range);
        self.ast.add_member(decl)
    }

    pub fn associated_type(
        &mut self,
        protocol: DeclId,
        name: &str,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let name = self.simple(name);
        let decl = self.make(
            DeclKind::AssociatedType(AbstractTypeParamData::default()),
            name,
            DeclContext::Nominal(protocol),
            range,
            name_range,
        );
        self.ast.add_member(decl)
    }

    /// A variable declaration not yet attached to a pattern binding.
    pub fn pattern_var(
        &mut self,
        parent: DeclContext,
        name: &str,
        is_let: bool,
        name_range: TextRange,
    ) -> DeclId {
        let name = self.simple(name);
        let data = VarData {
            is_let,
            ..VarData::default()
        };
        let decl = self.make(DeclKind::Var(data), name, parent, name_range, name_range);
        self.ast.alloc(decl)
    }

    /// `var name: Type = init` as a binding plus its variable; returns the variable.
    #[allow(clippy::too_many_arguments)]
    pub fn var(
        &mut self,
        parent: DeclContext,
        name: &str,
        is_let: bool,
        annotation: Option<TypeRepr>,
        init: Option<Expr>,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let var = self.pattern_var(parent, name, is_let, name_range);
        let mut pattern = Pattern::named(var, name_range);
        if let Some(repr) = annotation {
            pattern = Pattern::typed(pattern, TypeLoc::new(repr));
        }
        self.binding(parent, pattern, init, range);
        var
    }

    /// A pattern binding; the variables of `pattern` are placed right after it.
    pub fn binding(
        &mut self,
        parent: DeclContext,
        pattern: Pattern,
        init: Option<Expr>,
        range: TextRange,
    ) -> DeclId {
        let vars = pattern.bound_vars();
        let closures = init.as_ref().map(Expr::direct_closures).unwrap_or_default();
        let data = PatternBindingData {
            pattern,
            init,
            init_checked: false,
            is_static: false,
            static_spelling: StaticSpelling::None,
            static_range: None,
        };
        let name = self.simple("_");
        let decl = self.make(DeclKind::PatternBinding(data), name, parent, range, range);
        let binding = self.ast.add_member(decl);
        for closure in closures {
            self.ast.closure_mut(closure).parent = DeclContext::Initializer(binding);
        }

        let mut hint = binding;
        for var in vars {
            let decl = self.ast.decl_mut(var);
            decl.range = range;
            if let Some(v) = decl.as_var_mut() {
                v.binding = Some(binding);
            }
            self.ast.insert_member_after(Some(hint), var);
            hint = var;
        }
        binding
    }

    /// Mark a binding and its variables `static` or `class`.
    pub fn set_static(&mut self, binding: DeclId, spelling: StaticSpelling, range: TextRange) {
        let vars = match self.ast.decl_mut(binding).as_binding_mut() {
            Some(b) => {
                b.is_static = true;
                b.static_spelling = spelling;
                b.static_range = Some(range);
                b.pattern.bound_vars()
            }
            None => return,
        };
        for var in vars {
            if let Some(v) = self.ast.decl_mut(var).as_var_mut() {
                v.is_static = true;
            }
        }
    }

    fn params(&mut self, parent: DeclContext, specs: &[ParamSpec]) -> Vec<DeclId> {
        specs
            .iter()
            .map(|spec| {
                let name = self.simple(&spec.name);
                let data = ParamData {
                    api_label: spec.api_label.as_deref().map(|l| self.ast.intern(l)),
                    annotation: spec.annotation.clone().map(TypeLoc::new).unwrap_or_default(),
                    variadic: spec.variadic,
                    names_range: Some(spec.names_range.unwrap_or(spec.range)),
                    ..ParamData::default()
                };
                let decl = self.make(DeclKind::Param(data), name, parent, spec.range, spec.range);
                self.ast.alloc(decl)
            })
            .collect()
    }

    pub fn func(
        &mut self,
        parent: DeclContext,
        name: &str,
        params: Vec<ParamSpec>,
        result: Option<TypeRepr>,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let decl_name = self.compound(name, &params);
        let data = FuncData {
            result: result.map(TypeLoc::new).unwrap_or_default(),
            ..FuncData::default()
        };
        let decl = self.make(DeclKind::Func(data), decl_name, parent, range, name_range);
        let id = self.ast.add_member(decl);
        let params = self.params(DeclContext::Function(id), &params);
        if let Some(f) = self.ast.decl_mut(id).as_func_mut() {
            f.params = params;
        }
        id
    }

    pub fn constructor(
        &mut self,
        parent: DeclContext,
        params: Vec<ParamSpec>,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let decl_name = self.compound("init", &params);
        let decl = self.make(
            DeclKind::Constructor(ConstructorData::default()),
            decl_name,
            parent,
            range,
            name_range,
        );
        let id = self.ast.add_member(decl);
        let params = self.params(DeclContext::Function(id), &params);
        if let Some(c) = self.ast.decl_mut(id).as_ctor_mut() {
            c.params = params;
        }
        id
    }

    pub fn destructor(
        &mut self,
        parent: DeclContext,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let name = self.simple("deinit");
        let decl = self.make(
            DeclKind::Destructor(DestructorData::default()),
            name,
            parent,
            range,
            name_range,
        );
        self.ast.add_member(decl)
    }

    pub fn subscript(
        &mut self,
        parent: DeclContext,
        params: Vec<ParamSpec>,
        element: TypeRepr,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let decl_name = self.compound("subscript", &params);
        let data = SubscriptData {
            element: TypeLoc::new(element),
            ..SubscriptData::default()
        };
        let decl = self.make(DeclKind::Subscript(data), decl_name, parent, range, name_range);
        let id = self.ast.add_member(decl);
        let indices = self.params(parent, &params);
        if let DeclKind::Subscript(s) = &mut self.ast.decl_mut(id).kind {
            s.indices = indices;
        }
        id
    }

    /// A written accessor (`get { ... }`, `willSet { ... }`). Adjusts the
    /// storage kind of `storage` to computed or observing.
    pub fn accessor(
        &mut self,
        storage: DeclId,
        kind: AccessorKind,
        body: Option<Body>,
        range: TextRange,
    ) -> DeclId {
        let parent = self.ast.decl(storage).parent;
        let name = self.simple(accessor_name(kind));
        let data = FuncData {
            accessor: Some(AccessorInfo { kind, storage }),
            is_static: self.ast.decl(storage).is_static(),
            body,
            ..FuncData::default()
        };
        let decl = self.make(DeclKind::Func(data), name, parent, range, range);
        let id = self.ast.alloc(decl);

        if matches!(kind, AccessorKind::Setter | AccessorKind::WillSet | AccessorKind::DidSet) {
            let param_name = match kind {
                AccessorKind::DidSet => "oldValue",
                _ => "newValue",
            };
            let param = ParamSpec {
                api_label: None,
                name: param_name.to_string(),
                annotation: None,
                range,
                names_range: None,
                variadic: false,
            };
            let params = self.params(DeclContext::Function(id), &[param]);
            if let Some(f) = self.ast.decl_mut(id).as_func_mut() {
                f.params = params;
            }
        }

        let Some(storage_data) = self.ast.decl_mut(storage).storage_mut() else {
            return id;
        };
        storage_data.accessors.set(kind, id);
        storage_data.kind = match kind {
            AccessorKind::WillSet | AccessorKind::DidSet => StorageKind::Observing,
            AccessorKind::Addressor | AccessorKind::MutableAddressor => StorageKind::Addressed,
            _ => StorageKind::Computed,
        };
        if !self.ast.is_protocol_context(parent) {
            let hint = self.ast.decl(storage).storage().and_then(|s| {
                s.accessors
                    .all()
                    .filter(|&a| a != id)
                    .last()
                    .or(Some(storage))
            });
            self.ast.insert_member_after(hint, id);
        }
        id
    }

    pub fn enum_element(
        &mut self,
        parent: DeclId,
        name: &str,
        argument: Option<TypeRepr>,
        raw_value: Option<Expr>,
        range: TextRange,
        name_range: TextRange,
    ) -> DeclId {
        let name = self.simple(name);
        let data = EnumElementData {
            argument: argument.map(TypeLoc::new),
            raw_value,
        };
        let decl = self.make(
            DeclKind::EnumElement(data),
            name,
            DeclContext::Nominal(parent),
            range,
            name_range,
        );
        self.ast.add_member(decl)
    }

    pub fn extension(&mut self, extended: TypeRepr, range: TextRange) -> DeclId {
        let name_range = extended.range;
        let name = self.simple("extension");
        let data = ExtensionData {
            extended: TypeLoc::new(extended),
            ..ExtensionData::default()
        };
        let root = self.root();
        let decl = self.make(DeclKind::Extension(data), name, root, range, name_range);
        self.ast.add_member(decl)
    }

    pub fn import(&mut self, path: &[&str], range: TextRange) -> DeclId {
        let path: Vec<Symbol> = path.iter().map(|p| self.ast.intern(p)).collect();
        let name = DeclName::simple(path.last().copied().unwrap_or_else(|| self.ast.intern("_")));
        let root = self.root();
        let decl = self.make(DeclKind::Import(ImportData { path }), name, root, range, range);
        self.ast.add_member(decl)
    }

    pub fn operator(&mut self, name: &str, fixity: Fixity, range: TextRange) -> DeclId {
        let name = self.simple(name);
        let root = self.root();
        let decl = self.make(DeclKind::Operator(OperatorData { fixity }), name, root, range, range);
        self.ast.add_member(decl)
    }

    pub fn attr(&mut self, decl: DeclId, kind: AttrKind, range: TextRange) {
        if let (AttrKind::Mutating, Some(f)) = (&kind, self.ast.decl_mut(decl).as_func_mut()) {
            f.is_mutating = true;
        }
        self.ast.decl_mut(decl).attrs.add(Attribute::new(kind, range));
    }

    pub fn set_static_func(&mut self, func: DeclId, spelling: StaticSpelling) {
        if let Some(f) = self.ast.decl_mut(func).as_func_mut() {
            f.is_static = true;
            f.static_spelling = spelling;
        }
    }

    pub fn closure(&mut self, parent: DeclContext, range: TextRange) -> ClosureId {
        let file = self.file;
        self.ast.add_closure(Closure {
            parent,
            file,
            range,
            body: None,
        })
    }

    pub fn set_body(&mut self, decl: DeclId, body: Body) {
        self.ast.decl_mut(decl).set_body(body);
    }
}

pub(crate) fn accessor_name(kind: AccessorKind) -> &'static str {
    match kind {
        AccessorKind::Getter => "get",
        AccessorKind::Setter => "set",
        AccessorKind::MaterializeForSet => "materializeForSet",
        AccessorKind::WillSet => "willSet",
        AccessorKind::DidSet => "didSet",
        AccessorKind::Addressor => "address",
        AccessorKind::MutableAddressor => "mutableAddress",
    }
}
