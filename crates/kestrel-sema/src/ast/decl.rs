//! Declarations and their semantic slots.

use indexmap::{IndexMap, IndexSet};
use kestrel_core::{DeclName, Symbol};
use rowan::TextRange;
use serde::Serialize;

use super::{
    Accessibility, Attributes, Body, DeclContext, Expr, FileId, Fixity, Pattern, Span, TypeLoc,
};
use crate::state::DeclState;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub(crate) u32);

impl DeclId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub name: DeclName,
    pub parent: DeclContext,
    pub file: FileId,
    /// Whole declaration, from the first attribute or keyword to the end.
    pub range: TextRange,
    /// The identifier (or keyword for `init`/`deinit`/`subscript`).
    pub name_range: TextRange,
    pub attrs: Attributes,
    pub invalid: bool,
    pub implicit: bool,
    pub access: Option<Accessibility>,
    /// Contextual type (archetypes inside generic contexts).
    pub ty: Option<TypeId>,
    /// Type as seen from outside the generic context.
    pub interface_ty: Option<TypeId>,
    pub overridden: Option<DeclId>,
    pub overriders: Vec<DeclId>,
    pub state: DeclState,
}

impl Decl {
    pub fn new(
        kind: DeclKind,
        name: DeclName,
        parent: DeclContext,
        file: FileId,
        range: TextRange,
        name_range: TextRange,
    ) -> Self {
        Self {
            kind,
            name,
            parent,
            file,
            range,
            name_range,
            attrs: Attributes::new(),
            invalid: false,
            implicit: false,
            access: None,
            ty: None,
            interface_ty: None,
            overridden: None,
            overriders: Vec::new(),
            state: DeclState::default(),
        }
    }

    /// Synthesized declaration located at `loc`.
    pub fn implicit(kind: DeclKind, name: DeclName, parent: DeclContext, loc: Span) -> Self {
        let mut decl = Self::new(kind, name, parent, loc.file, loc.range, loc.range);
        decl.implicit = true;
        decl
    }

    pub fn span(&self) -> Span {
        Span::new(self.file, self.name_range)
    }

    pub fn full_span(&self) -> Span {
        Span::new(self.file, self.range)
    }

    pub fn descriptive_kind(&self) -> &'static str {
        match &self.kind {
            DeclKind::TypeAlias(_) => "type alias",
            DeclKind::Enum(_) => "enum",
            DeclKind::Struct(_) => "struct",
            DeclKind::Class(_) => "class",
            DeclKind::Protocol(_) => "protocol",
            DeclKind::AssociatedType(_) => "associated type",
            DeclKind::GenericParam(_) => "generic parameter",
            DeclKind::Var(v) if v.is_let => "let",
            DeclKind::Var(_) => "var",
            DeclKind::Param(_) => "parameter",
            DeclKind::PatternBinding(_) => "pattern binding",
            DeclKind::Subscript(_) => "subscript",
            DeclKind::Func(f) => match f.accessor.map(|a| a.kind) {
                Some(AccessorKind::Getter) => "getter",
                Some(AccessorKind::Setter) => "setter",
                Some(AccessorKind::MaterializeForSet) => "materializeForSet",
                Some(AccessorKind::WillSet) => "willSet",
                Some(AccessorKind::DidSet) => "didSet",
                Some(AccessorKind::Addressor | AccessorKind::MutableAddressor) => "addressor",
                None if self.parent.is_type_context() => "method",
                None => "function",
            },
            DeclKind::Constructor(_) => "initializer",
            DeclKind::Destructor(_) => "deinitializer",
            DeclKind::EnumElement(_) => "enum case",
            DeclKind::Extension(_) => "extension",
            DeclKind::Import(_) => "import",
            DeclKind::Operator(_) => "operator",
        }
    }

    pub fn is_type_decl(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::TypeAlias(_)
                | DeclKind::Enum(_)
                | DeclKind::Struct(_)
                | DeclKind::Class(_)
                | DeclKind::Protocol(_)
                | DeclKind::AssociatedType(_)
                | DeclKind::GenericParam(_)
        )
    }

    pub fn is_nominal(&self) -> bool {
        self.as_nominal().is_some()
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, DeclKind::Class(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self.kind, DeclKind::Protocol(_))
    }

    pub fn is_storage(&self) -> bool {
        self.storage().is_some()
    }

    /// Functions, initializers, deinitializers and accessors.
    pub fn is_abstract_function(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Func(_) | DeclKind::Constructor(_) | DeclKind::Destructor(_)
        )
    }

    pub fn is_accessor(&self) -> bool {
        self.accessor().is_some()
    }

    pub fn accessor(&self) -> Option<AccessorInfo> {
        match &self.kind {
            DeclKind::Func(f) => f.accessor,
            _ => None,
        }
    }

    pub fn is_static(&self) -> bool {
        match &self.kind {
            DeclKind::Var(v) => v.is_static,
            DeclKind::Func(f) => f.is_static,
            _ => false,
        }
    }

    pub fn is_final(&self) -> bool {
        self.attrs.is_final()
    }

    pub fn is_objc(&self) -> bool {
        match &self.kind {
            DeclKind::Class(n) | DeclKind::Protocol(n) => n.is_objc || self.attrs.objc().is_some(),
            _ => self.attrs.objc().is_some(),
        }
    }

    pub fn as_nominal(&self) -> Option<&NominalData> {
        match &self.kind {
            DeclKind::Enum(n) | DeclKind::Struct(n) | DeclKind::Class(n) | DeclKind::Protocol(n) => {
                Some(n)
            }
            _ => None,
        }
    }

    pub fn as_nominal_mut(&mut self) -> Option<&mut NominalData> {
        match &mut self.kind {
            DeclKind::Enum(n) | DeclKind::Struct(n) | DeclKind::Class(n) | DeclKind::Protocol(n) => {
                Some(n)
            }
            _ => None,
        }
    }

    pub fn nominal_kind(&self) -> Option<NominalKind> {
        match &self.kind {
            DeclKind::Enum(_) => Some(NominalKind::Enum),
            DeclKind::Struct(_) => Some(NominalKind::Struct),
            DeclKind::Class(_) => Some(NominalKind::Class),
            DeclKind::Protocol(_) => Some(NominalKind::Protocol),
            _ => None,
        }
    }

    pub fn as_type_param(&self) -> Option<&AbstractTypeParamData> {
        match &self.kind {
            DeclKind::AssociatedType(p) | DeclKind::GenericParam(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_type_param_mut(&mut self) -> Option<&mut AbstractTypeParamData> {
        match &mut self.kind {
            DeclKind::AssociatedType(p) | DeclKind::GenericParam(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_extension(&self) -> Option<&ExtensionData> {
        match &self.kind {
            DeclKind::Extension(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_extension_mut(&mut self) -> Option<&mut ExtensionData> {
        match &mut self.kind {
            DeclKind::Extension(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&VarData> {
        match &self.kind {
            DeclKind::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_var_mut(&mut self) -> Option<&mut VarData> {
        match &mut self.kind {
            DeclKind::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_param(&self) -> Option<&ParamData> {
        match &self.kind {
            DeclKind::Param(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_binding(&self) -> Option<&PatternBindingData> {
        match &self.kind {
            DeclKind::PatternBinding(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_binding_mut(&mut self) -> Option<&mut PatternBindingData> {
        match &mut self.kind {
            DeclKind::PatternBinding(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&FuncData> {
        match &self.kind {
            DeclKind::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_func_mut(&mut self) -> Option<&mut FuncData> {
        match &mut self.kind {
            DeclKind::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_ctor(&self) -> Option<&ConstructorData> {
        match &self.kind {
            DeclKind::Constructor(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_ctor_mut(&mut self) -> Option<&mut ConstructorData> {
        match &mut self.kind {
            DeclKind::Constructor(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&EnumElementData> {
        match &self.kind {
            DeclKind::EnumElement(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut EnumElementData> {
        match &mut self.kind {
            DeclKind::EnumElement(e) => Some(e),
            _ => None,
        }
    }

    pub fn storage(&self) -> Option<&StorageData> {
        match &self.kind {
            DeclKind::Var(v) => Some(&v.storage),
            DeclKind::Subscript(s) => Some(&s.storage),
            _ => None,
        }
    }

    pub fn storage_mut(&mut self) -> Option<&mut StorageData> {
        match &mut self.kind {
            DeclKind::Var(v) => Some(&mut v.storage),
            DeclKind::Subscript(s) => Some(&mut s.storage),
            _ => None,
        }
    }

    /// Parameters of functions, initializers and subscripts.
    pub fn params(&self) -> &[DeclId] {
        match &self.kind {
            DeclKind::Func(f) => &f.params,
            DeclKind::Constructor(c) => &c.params,
            DeclKind::Subscript(s) => &s.indices,
            _ => &[],
        }
    }

    pub fn generic_params(&self) -> Option<&GenericParamList> {
        match &self.kind {
            DeclKind::Func(f) => f.generic_params.as_ref(),
            DeclKind::Constructor(c) => c.generic_params.as_ref(),
            _ => self.as_nominal()?.generic_params.as_ref(),
        }
    }

    pub fn generic_params_mut(&mut self) -> Option<&mut GenericParamList> {
        match &mut self.kind {
            DeclKind::Func(f) => f.generic_params.as_mut(),
            DeclKind::Constructor(c) => c.generic_params.as_mut(),
            DeclKind::Enum(n) | DeclKind::Struct(n) | DeclKind::Class(n) | DeclKind::Protocol(n) => {
                n.generic_params.as_mut()
            }
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Body> {
        match &self.kind {
            DeclKind::Func(f) => f.body.as_ref(),
            DeclKind::Constructor(c) => c.body.as_ref(),
            DeclKind::Destructor(d) => d.body.as_ref(),
            _ => None,
        }
    }

    pub fn set_body(&mut self, body: Body) {
        match &mut self.kind {
            DeclKind::Func(f) => f.body = Some(body),
            DeclKind::Constructor(c) => c.body = Some(body),
            DeclKind::Destructor(d) => d.body = Some(body),
            _ => debug_assert!(false, "declaration cannot have a body"),
        }
    }

    /// Written inheritance clause.
    pub fn inherited(&self) -> &[TypeLoc] {
        match &self.kind {
            DeclKind::Extension(e) => &e.inherited,
            DeclKind::AssociatedType(p) | DeclKind::GenericParam(p) => &p.inherited,
            _ => self.as_nominal().map_or(&[], |n| n.inherited.as_slice()),
        }
    }

    pub fn inherited_mut(&mut self) -> Option<&mut Vec<TypeLoc>> {
        match &mut self.kind {
            DeclKind::Extension(e) => Some(&mut e.inherited),
            DeclKind::AssociatedType(p) | DeclKind::GenericParam(p) => Some(&mut p.inherited),
            DeclKind::Enum(n) | DeclKind::Struct(n) | DeclKind::Class(n) | DeclKind::Protocol(n) => {
                Some(&mut n.inherited)
            }
            _ => None,
        }
    }

    /// Resolved protocol set.
    pub fn protocols(&self) -> Option<&IndexSet<DeclId>> {
        match &self.kind {
            DeclKind::Extension(e) => Some(&e.protocols),
            DeclKind::AssociatedType(p) | DeclKind::GenericParam(p) => Some(&p.protocols),
            _ => self.as_nominal().map(|n| &n.protocols),
        }
    }

    pub fn members(&self) -> &[DeclId] {
        match &self.kind {
            DeclKind::Extension(e) => &e.members,
            _ => self.as_nominal().map_or(&[], |n| n.members.as_slice()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    TypeAlias(TypeAliasData),
    Enum(NominalData),
    Struct(NominalData),
    Class(NominalData),
    Protocol(NominalData),
    AssociatedType(AbstractTypeParamData),
    GenericParam(AbstractTypeParamData),
    Var(VarData),
    Param(ParamData),
    PatternBinding(PatternBindingData),
    Subscript(SubscriptData),
    Func(FuncData),
    Constructor(ConstructorData),
    Destructor(DestructorData),
    EnumElement(EnumElementData),
    Extension(ExtensionData),
    Import(ImportData),
    Operator(OperatorData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NominalKind {
    Struct,
    Enum,
    Class,
    Protocol,
}

#[derive(Debug, Clone, Default)]
pub struct GenericParamList {
    pub params: Vec<DeclId>,
    pub requirements: Vec<Requirement>,
    /// All archetypes of the list, filled by finalization.
    pub archetypes: Vec<TypeId>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct Requirement {
    pub kind: RequirementKind,
    pub range: TextRange,
    pub invalid: bool,
}

#[derive(Debug, Clone)]
pub enum RequirementKind {
    Conformance { subject: TypeLoc, constraint: TypeLoc },
    SameType { first: TypeLoc, second: TypeLoc },
}

#[derive(Debug, Clone, Default)]
pub struct NominalData {
    pub generic_params: Option<GenericParamList>,
    pub inherited: Vec<TypeLoc>,
    pub protocols: IndexSet<DeclId>,
    pub superclass: Option<TypeId>,
    pub raw_type: Option<TypeId>,
    /// Aligned with `protocols`; `None` until checked.
    pub conformances: Vec<Option<Conformance>>,
    pub members: Vec<DeclId>,
    pub declared_type: Option<TypeId>,
    pub added_implicit_inits: bool,
    pub has_destructor: bool,
    pub is_objc: bool,
    /// `{ ... }` of the body, for fix-it placement.
    pub brace_range: TextRange,
    /// Implicit `Self` parameter of a protocol.
    pub self_param: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Witness {
    Decl(DeclId),
    /// Provided by the compiler (raw-representable enums).
    Derived,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conformance {
    pub protocol: DeclId,
    /// Requirement -> witness.
    pub witnesses: IndexMap<DeclId, Witness>,
    /// Associated type -> witness type.
    pub type_witnesses: IndexMap<DeclId, TypeId>,
    pub invalid: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AbstractTypeParamData {
    pub inherited: Vec<TypeLoc>,
    pub protocols: IndexSet<DeclId>,
    pub superclass: Option<TypeId>,
    pub archetype: Option<TypeId>,
    pub depth: u32,
    pub index: u32,
    /// Default witness of an associated type.
    pub default: Option<TypeLoc>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeAliasData {
    pub underlying: TypeLoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum StorageKind {
    #[default]
    Stored,
    StoredWithTrivialAccessors,
    Computed,
    Observing,
    Addressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccessorKind {
    Getter,
    Setter,
    MaterializeForSet,
    WillSet,
    DidSet,
    Addressor,
    MutableAddressor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessorInfo {
    pub kind: AccessorKind,
    pub storage: DeclId,
}

#[derive(Debug, Clone, Default)]
pub struct Accessors {
    pub getter: Option<DeclId>,
    pub setter: Option<DeclId>,
    pub materialize_for_set: Option<DeclId>,
    pub will_set: Option<DeclId>,
    pub did_set: Option<DeclId>,
    pub addressor: Option<DeclId>,
    pub mutable_addressor: Option<DeclId>,
    /// `{ get set }` braces, if written.
    pub brace_range: Option<TextRange>,
}

impl Accessors {
    pub fn get(&self, kind: AccessorKind) -> Option<DeclId> {
        match kind {
            AccessorKind::Getter => self.getter,
            AccessorKind::Setter => self.setter,
            AccessorKind::MaterializeForSet => self.materialize_for_set,
            AccessorKind::WillSet => self.will_set,
            AccessorKind::DidSet => self.did_set,
            AccessorKind::Addressor => self.addressor,
            AccessorKind::MutableAddressor => self.mutable_addressor,
        }
    }

    pub fn set(&mut self, kind: AccessorKind, decl: DeclId) {
        let slot = match kind {
            AccessorKind::Getter => &mut self.getter,
            AccessorKind::Setter => &mut self.setter,
            AccessorKind::MaterializeForSet => &mut self.materialize_for_set,
            AccessorKind::WillSet => &mut self.will_set,
            AccessorKind::DidSet => &mut self.did_set,
            AccessorKind::Addressor => &mut self.addressor,
            AccessorKind::MutableAddressor => &mut self.mutable_addressor,
        };
        *slot = Some(decl);
    }

    pub fn all(&self) -> impl Iterator<Item = DeclId> + '_ {
        [
            self.getter,
            self.setter,
            self.materialize_for_set,
            self.will_set,
            self.did_set,
            self.addressor,
            self.mutable_addressor,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StorageData {
    pub kind: StorageKind,
    pub accessors: Accessors,
    pub setter_access: Option<Accessibility>,
}

impl StorageData {
    pub fn has_accessor_functions(&self) -> bool {
        self.kind != StorageKind::Stored
    }

    pub fn has_storage(&self) -> bool {
        matches!(
            self.kind,
            StorageKind::Stored | StorageKind::StoredWithTrivialAccessors | StorageKind::Observing
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum StaticSpelling {
    #[default]
    None,
    Static,
    Class,
}

#[derive(Debug, Clone, Default)]
pub struct VarData {
    pub is_let: bool,
    pub is_static: bool,
    pub binding: Option<DeclId>,
    pub storage: StorageData,
    /// Backing `x.storage` variable of a lazy property.
    pub lazy_storage: Option<DeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DefaultArgKind {
    #[default]
    None,
    Normal,
    /// Default argument of an inherited initializer.
    Inherited,
}

#[derive(Debug, Clone, Default)]
pub struct ParamData {
    pub api_label: Option<Symbol>,
    pub annotation: TypeLoc,
    pub variadic: bool,
    pub inout: bool,
    pub default_arg: DefaultArgKind,
    /// Written label and name, `x y` in `x y: Int`.
    pub names_range: Option<TextRange>,
}

#[derive(Debug, Clone)]
pub struct PatternBindingData {
    pub pattern: Pattern,
    pub init: Option<Expr>,
    pub init_checked: bool,
    pub is_static: bool,
    pub static_spelling: StaticSpelling,
    pub static_range: Option<TextRange>,
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptData {
    pub indices: Vec<DeclId>,
    pub element: TypeLoc,
    pub storage: StorageData,
}

#[derive(Debug, Clone, Default)]
pub struct FuncData {
    pub generic_params: Option<GenericParamList>,
    pub params: Vec<DeclId>,
    /// Written result type; `()` when absent.
    pub result: TypeLoc,
    pub body: Option<Body>,
    pub accessor: Option<AccessorInfo>,
    pub is_static: bool,
    pub static_spelling: StaticSpelling,
    pub is_mutating: bool,
    pub operator: Option<Fixity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CtorKind {
    #[default]
    Designated,
    Convenience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Failability {
    #[default]
    None,
    Optional,
    ImplicitlyUnwrapped,
}

/// Why an initializer was synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImplicitCtorKind {
    Default,
    Memberwise,
    /// Override forwarding to `super.init`.
    Chaining,
    /// Override that traps at run time.
    Stub,
}

#[derive(Debug, Clone, Default)]
pub struct ConstructorData {
    pub generic_params: Option<GenericParamList>,
    pub params: Vec<DeclId>,
    pub body: Option<Body>,
    pub kind: CtorKind,
    pub failability: Failability,
    pub synthesized: Option<ImplicitCtorKind>,
}

impl ConstructorData {
    pub fn is_stub(&self) -> bool {
        self.synthesized == Some(ImplicitCtorKind::Stub)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DestructorData {
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumElementData {
    pub argument: Option<TypeLoc>,
    /// Explicit literal, or the auto-incremented one (marked implicit).
    pub raw_value: Option<Expr>,
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionData {
    pub extended: TypeLoc,
    pub inherited: Vec<TypeLoc>,
    pub protocols: IndexSet<DeclId>,
    pub conformances: Vec<Option<Conformance>>,
    pub members: Vec<DeclId>,
    pub nominal: Option<DeclId>,
    pub default_access: Option<Accessibility>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportData {
    pub path: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct OperatorData {
    pub fixity: Fixity,
}
