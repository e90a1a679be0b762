//! Declaration attributes.

use std::fmt;

use kestrel_core::Symbol;
use rowan::TextRange;
use serde::Serialize;

use super::DeclKind;

/// Access levels, ordered from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Accessibility {
    Private,
    Internal,
    Public,
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Accessibility::Private => "private",
            Accessibility::Internal => "internal",
            Accessibility::Public => "public",
        })
    }
}

/// Reference ownership of a stored property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Ownership {
    Weak,
    Unowned,
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ownership::Weak => "weak",
            Ownership::Unowned => "unowned",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Fixity {
    Prefix,
    Postfix,
    Infix,
}

/// Interop name attached to `@objc`: `foo`, `foo:`, `foo:bar:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjCName {
    pub pieces: Vec<Symbol>,
    /// Number of argument colons; zero for nullary selectors.
    pub num_args: usize,
}

impl ObjCName {
    pub fn nullary(piece: Symbol) -> Self {
        Self {
            pieces: vec![piece],
            num_args: 0,
        }
    }

    pub fn is_nullary(&self) -> bool {
        self.num_args == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrKind {
    Accessibility(Accessibility),
    SetterAccessibility(Accessibility),
    Final,
    Dynamic,
    Override,
    Required,
    Convenience,
    ObjC(Option<ObjCName>),
    NoReturn,
    Mutating,
    NonMutating,
    Lazy,
    Managed,
    CopyOnAssign,
    Optional,
    Prefix,
    Postfix,
    Infix,
    Transparent,
    Unavailable,
    Ownership(Ownership),
    RawDocComment(String),
}

impl AttrKind {
    /// Source spelling, used in diagnostics and fix-its.
    pub fn spelling(&self) -> &'static str {
        match self {
            AttrKind::Accessibility(Accessibility::Private) => "private",
            AttrKind::Accessibility(Accessibility::Internal) => "internal",
            AttrKind::Accessibility(Accessibility::Public) => "public",
            AttrKind::SetterAccessibility(Accessibility::Private) => "private(set)",
            AttrKind::SetterAccessibility(Accessibility::Internal) => "internal(set)",
            AttrKind::SetterAccessibility(Accessibility::Public) => "public(set)",
            AttrKind::Final => "final",
            AttrKind::Dynamic => "dynamic",
            AttrKind::Override => "override",
            AttrKind::Required => "required",
            AttrKind::Convenience => "convenience",
            AttrKind::ObjC(_) => "@objc",
            AttrKind::NoReturn => "@noreturn",
            AttrKind::Mutating => "mutating",
            AttrKind::NonMutating => "nonmutating",
            AttrKind::Lazy => "lazy",
            AttrKind::Managed => "@managed",
            AttrKind::CopyOnAssign => "@copying",
            AttrKind::Optional => "optional",
            AttrKind::Prefix => "prefix",
            AttrKind::Postfix => "postfix",
            AttrKind::Infix => "infix",
            AttrKind::Transparent => "@transparent",
            AttrKind::Unavailable => "@unavailable",
            AttrKind::Ownership(Ownership::Weak) => "weak",
            AttrKind::Ownership(Ownership::Unowned) => "unowned",
            AttrKind::RawDocComment(_) => "doc comment",
        }
    }

    /// Whether the attribute may be written on a declaration of `kind`.
    pub fn allowed_on(&self, kind: &DeclKind) -> bool {
        use DeclKind as K;
        let accessor = matches!(kind, K::Func(f) if f.accessor.is_some());
        match self {
            AttrKind::Accessibility(_) => matches!(
                kind,
                K::TypeAlias(_)
                    | K::Enum(_)
                    | K::Struct(_)
                    | K::Class(_)
                    | K::Protocol(_)
                    | K::Var(_)
                    | K::Subscript(_)
                    | K::Constructor(_)
                    | K::Extension(_)
            ) || (matches!(kind, K::Func(_)) && !accessor),
            AttrKind::SetterAccessibility(_) => matches!(kind, K::Var(_) | K::Subscript(_)),
            AttrKind::Final => matches!(
                kind,
                K::Class(_) | K::Var(_) | K::Subscript(_) | K::Func(_)
            ),
            AttrKind::Dynamic | AttrKind::Override => matches!(
                kind,
                K::Var(_) | K::Subscript(_) | K::Func(_) | K::Constructor(_)
            ),
            AttrKind::Required | AttrKind::Convenience => matches!(kind, K::Constructor(_)),
            AttrKind::ObjC(_) => matches!(
                kind,
                K::Enum(_)
                    | K::Struct(_)
                    | K::Class(_)
                    | K::Protocol(_)
                    | K::Var(_)
                    | K::Subscript(_)
                    | K::Func(_)
                    | K::Constructor(_)
                    | K::Destructor(_)
                    | K::Extension(_)
            ),
            AttrKind::NoReturn | AttrKind::Mutating | AttrKind::NonMutating => {
                matches!(kind, K::Func(_))
            }
            AttrKind::Lazy | AttrKind::Managed | AttrKind::CopyOnAssign => {
                matches!(kind, K::Var(_))
            }
            AttrKind::Optional => matches!(
                kind,
                K::Var(_) | K::Subscript(_) | K::Func(_) | K::Constructor(_)
            ),
            AttrKind::Prefix | AttrKind::Postfix | AttrKind::Infix => {
                matches!(kind, K::Func(_) | K::Operator(_))
            }
            AttrKind::Transparent => matches!(
                kind,
                K::Struct(_) | K::Extension(_) | K::Var(_) | K::Subscript(_) | K::Func(_)
                    | K::Constructor(_)
            ),
            AttrKind::Ownership(_) => matches!(kind, K::Var(_) | K::Param(_)),
            AttrKind::Unavailable | AttrKind::RawDocComment(_) => true,
        }
    }

    fn same_kind(&self, other: &AttrKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub kind: AttrKind,
    pub range: TextRange,
    pub implicit: bool,
    pub invalid: bool,
}

impl Attribute {
    pub fn new(kind: AttrKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            implicit: false,
            invalid: false,
        }
    }

    pub fn implicit(kind: AttrKind) -> Self {
        Self {
            kind,
            range: TextRange::default(),
            implicit: true,
            invalid: false,
        }
    }
}

/// Attribute bag of a declaration. Invalid attributes are kept for
/// diagnostics but ignored by the queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    list: Vec<Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attr: Attribute) {
        self.list.push(attr);
    }

    pub fn add_implicit(&mut self, kind: AttrKind) {
        if !self.has(&kind) {
            self.list.push(Attribute::implicit(kind));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.list.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.list.iter_mut()
    }

    /// Whether a valid attribute of the same kind is present (payload ignored).
    pub fn has(&self, kind: &AttrKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn get(&self, kind: &AttrKind) -> Option<&Attribute> {
        self.list
            .iter()
            .find(|a| !a.invalid && a.kind.same_kind(kind))
    }

    pub fn get_mut(&mut self, kind: &AttrKind) -> Option<&mut Attribute> {
        self.list
            .iter_mut()
            .find(|a| !a.invalid && a.kind.same_kind(kind))
    }

    pub fn remove(&mut self, kind: &AttrKind) {
        self.list.retain(|a| !a.kind.same_kind(kind));
    }

    pub fn invalidate(&mut self, kind: &AttrKind) {
        for attr in self.list.iter_mut().filter(|a| a.kind.same_kind(kind)) {
            attr.invalid = true;
        }
    }

    pub fn range_of(&self, kind: &AttrKind) -> Option<TextRange> {
        self.get(kind).filter(|a| !a.implicit).map(|a| a.range)
    }

    pub fn accessibility(&self) -> Option<Accessibility> {
        self.list.iter().find_map(|a| match a.kind {
            AttrKind::Accessibility(level) if !a.invalid => Some(level),
            _ => None,
        })
    }

    pub fn setter_accessibility(&self) -> Option<Accessibility> {
        self.list.iter().find_map(|a| match a.kind {
            AttrKind::SetterAccessibility(level) if !a.invalid => Some(level),
            _ => None,
        })
    }

    pub fn ownership(&self) -> Option<Ownership> {
        self.list.iter().find_map(|a| match a.kind {
            AttrKind::Ownership(o) if !a.invalid => Some(o),
            _ => None,
        })
    }

    pub fn objc(&self) -> Option<&Attribute> {
        self.get(&AttrKind::ObjC(None))
    }

    pub fn objc_name(&self) -> Option<&ObjCName> {
        match &self.objc()?.kind {
            AttrKind::ObjC(name) => name.as_ref(),
            _ => None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.has(&AttrKind::Final)
    }

    pub fn is_dynamic(&self) -> bool {
        self.has(&AttrKind::Dynamic)
    }
}
