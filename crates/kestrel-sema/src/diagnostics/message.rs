use std::fmt;

use crate::ast::Span;

/// Diagnostic kinds ordered by priority (highest priority first).
///
/// When two diagnostics share a primary range, the higher-priority one
/// suppresses the other in [`super::Diagnostics::filtered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    // Cycles and unresolvable references poison everything downstream
    CircularInheritance,
    CircularReference,
    UndeclaredType,
    NotAType,
    NonNominalExtension,
    GenericArgumentCount,

    // Inheritance clauses
    DuplicateInheritance,
    DynamicLookupConformance,
    MultipleEnumRawTypes,
    RawTypeNotFirst,
    MultipleInheritance,
    SuperclassNotFirst,
    ExtensionClassInheritance,
    NonClassInheritance,
    InheritanceFromNonProtocolOrClass,
    InheritanceFromNonProtocol,
    InheritanceFromFinalClass,
    ObjCProtocolInheritsNonObjCProtocol,

    // Generic signatures
    RequiresConformanceNonProtocol,
    InvalidRequirement,

    // Declarations and pattern bindings
    InvalidRedecl,
    DuplicateEnumElement,
    StaticOutsideType,
    ClassVarInValueType,
    PatternBindsNoVariables,
    StaticStoredInGenericType,
    ClassStoredProperty,
    PatternWithoutType,
    InitializerTypeMismatch,
    TypeNotMaterializable,
    LetRequiresInitializer,
    ObservingPropertyRequiresInitializer,
    StaticRequiresInitializer,
    GlobalRequiresInitializer,
    EnumStoredProperty,
    ExtensionStoredProperty,
    ProtocolPropertyMustBeComputed,
    ProtocolPropertyMustBeComputedVar,

    // Attributes
    AttributeNotAllowed,
    ConflictingAttributes,
    LazyOnLet,
    LazyRequiresInitializer,
    LazyOnComputed,
    LazyOnStatic,
    ManagedOutsideClass,
    CopyOnAssignOnLet,
    CopyOnAssignOutsideClass,
    MutatingInvalidContext,
    InvalidObjCDecl,
    ObjCNameReqNullary,
    ObjCNameSubscript,
    ObjCNameFuncMismatch,
    OptionalAttributeNonProtocol,
    OptionalAttributeNonObjCProtocol,
    OptionalAttributeInitializer,
    UnavailableMethodNonObjCProtocol,
    CopyOnAssignDoesntConform,

    // Overrides
    OverrideObjCTypeMismatch,
    OverrideArgumentNameMismatch,
    OverrideMultipleDecls,
    OverrideNotAccessible,
    OverrideMutableCovariantSubscript,
    OverridePropertyTypeMismatch,
    OverrideMutableCovariantProperty,
    OverrideWithStoredProperty,
    ObservingReadonlyProperty,
    OverrideMutableWithReadonlyProperty,
    OverrideLetProperty,
    OverrideDeclExtension,
    MissingOverride,
    OverrideFinal,
    OverrideNoReturnWithReturn,
    MethodDoesNotOverride,
    PropertyDoesNotOverride,
    InitializerDoesNotOverride,
    RequiredInitializerOverrideKeyword,
    RequiredInitializerOverrideWrongKeyword,
    RequiredInitializerMissingKeyword,
    FailableInitializerOverride,

    // Initializers
    NonClassConvenienceInit,
    DesignatedInitInExtension,
    ClassWithoutInit,
    RequiredInitializerMissing,
    UnsupportedSynthesizeInitVariadic,
    MissingUnimplementedInitRuntime,
    RequiredInitializerNotAccessible,

    // Enums
    RawTypeNotLiteralConvertible,
    EmptyEnumRawType,
    EnumWithRawTypeCaseWithArgument,
    EnumRawValueWithoutRawType,
    EnumNonIntegerRawValueAutoIncrement,
    EnumRawValueIncrementOverflow,
    EnumNonIntegerConvertibleRawType,
    EnumRawValueNotUnique,
    RawValueTypeMismatch,
    EnumElementNotMaterializable,

    // Conformances
    TypeDoesNotConform,

    // Access control
    PatternTypeAccess,
    PatternTypeAccessInferred,
    TypeAliasUnderlyingTypeAccess,
    AssociatedTypeAccess,
    EnumRawTypeAccess,
    ClassSuperAccess,
    ProtocolRefineAccess,
    SubscriptTypeAccess,
    FunctionTypeAccess,
    EnumCaseAccess,
    GenericParamAccess,

    // Warnings
    LetDefaultInit,
    ObjCOverrideNameMismatch,
    OverrideUnavailable,
}

impl DiagnosticKind {
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::LetDefaultInit | Self::ObjCOverrideNameMismatch | Self::OverrideUnavailable => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Whether this kind suppresses `other` when they share a primary range.
    pub fn suppresses(&self, other: &DiagnosticKind) -> bool {
        self < other
    }

    /// Base message for this diagnostic kind, used when no custom message is provided.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::CircularInheritance => "circular inheritance",
            Self::CircularReference => "circular reference",
            Self::UndeclaredType => "use of undeclared type",
            Self::NotAType => "not a type",
            Self::NonNominalExtension => "non-nominal type cannot be extended",
            Self::GenericArgumentCount => "wrong number of generic arguments",

            Self::DuplicateInheritance => "duplicate inheritance",
            Self::DynamicLookupConformance => "only protocols can inherit from 'AnyObject'",
            Self::MultipleEnumRawTypes => "multiple enum raw types",
            Self::RawTypeNotFirst => {
                "raw type must appear first in the enum inheritance clause"
            }
            Self::MultipleInheritance => "multiple inheritance from classes",
            Self::SuperclassNotFirst => "superclass must appear first in the inheritance clause",
            Self::ExtensionClassInheritance => "extension cannot add a superclass",
            Self::NonClassInheritance => "non-class type cannot inherit from a class",
            Self::InheritanceFromNonProtocolOrClass => {
                "inheritance from non-protocol, non-class type"
            }
            Self::InheritanceFromNonProtocol => "inheritance from non-protocol type",
            Self::InheritanceFromFinalClass => "inheritance from a final class",
            Self::ObjCProtocolInheritsNonObjCProtocol => {
                "@objc protocol cannot refine non-@objc protocol"
            }

            Self::RequiresConformanceNonProtocol => {
                "conformance requirement to non-protocol, non-class type"
            }
            Self::InvalidRequirement => "invalid requirement",

            Self::InvalidRedecl => "invalid redeclaration",
            Self::DuplicateEnumElement => "duplicate enum case",
            Self::StaticOutsideType => "static properties may only be declared on a type",
            Self::ClassVarInValueType => {
                "class properties are only allowed within classes and protocols"
            }
            Self::PatternBindsNoVariables => "pattern does not bind any variables",
            Self::StaticStoredInGenericType => {
                "static stored properties not yet supported in generic types"
            }
            Self::ClassStoredProperty => "class stored properties not yet supported in classes",
            Self::PatternWithoutType => "type annotation missing in pattern",
            Self::InitializerTypeMismatch => "cannot type-check initializer",
            Self::TypeNotMaterializable => "variable has a type that cannot be stored",
            Self::LetRequiresInitializer => "'let' declarations require an initializer expression",
            Self::ObservingPropertyRequiresInitializer => {
                "non-member observing properties require an initializer"
            }
            Self::StaticRequiresInitializer => "static properties require an initializer",
            Self::GlobalRequiresInitializer => "global variables require an initializer",
            Self::EnumStoredProperty => "enums may not contain stored properties",
            Self::ExtensionStoredProperty => "extensions may not contain stored properties",
            Self::ProtocolPropertyMustBeComputed => "protocol properties must be computed",
            Self::ProtocolPropertyMustBeComputedVar => {
                "protocol properties must be declared with 'var'"
            }

            Self::AttributeNotAllowed => "attribute cannot be applied to this declaration",
            Self::ConflictingAttributes => "conflicting attributes",
            Self::LazyOnLet => "'lazy' cannot be used on a let",
            Self::LazyRequiresInitializer => "lazy properties must have an initializer",
            Self::LazyOnComputed => "'lazy' may not be used on a computed property",
            Self::LazyOnStatic => "'lazy' may not be used on a static property",
            Self::ManagedOutsideClass => "'@managed' may only be used on class properties",
            Self::CopyOnAssignOnLet => "'@copying' requires property to be mutable",
            Self::CopyOnAssignOutsideClass => "'@copying' may only be used on class properties",
            Self::MutatingInvalidContext => {
                "'mutating' is only valid on methods of structs, enums and protocols"
            }
            Self::InvalidObjCDecl => "only classes, protocols and their members can be @objc",
            Self::ObjCNameReqNullary => "@objc name must not contain ':'",
            Self::ObjCNameSubscript => "@objc subscripts cannot have a name",
            Self::ObjCNameFuncMismatch => "@objc name has the wrong number of arguments",
            Self::OptionalAttributeNonProtocol => {
                "'optional' can only be applied to protocol members"
            }
            Self::OptionalAttributeNonObjCProtocol => {
                "'optional' can only be applied to members of an @objc protocol"
            }
            Self::OptionalAttributeInitializer => {
                "'optional' cannot be applied to an initializer"
            }
            Self::UnavailableMethodNonObjCProtocol => {
                "protocol members can only be marked unavailable in an @objc protocol"
            }
            Self::CopyOnAssignDoesntConform => {
                "'@copying' requires property type to conform to 'Copying'"
            }

            Self::OverrideObjCTypeMismatch => "overriding declaration with an incompatible type",
            Self::OverrideArgumentNameMismatch => "argument names do not match overridden declaration",
            Self::OverrideMultipleDecls => "declaration overrides multiple superclass declarations",
            Self::OverrideNotAccessible => "overriding declaration must be as accessible as its enclosing type",
            Self::OverrideMutableCovariantSubscript => {
                "cannot override mutable subscript with a covariant type"
            }
            Self::OverridePropertyTypeMismatch => "property type does not match overridden property",
            Self::OverrideMutableCovariantProperty => {
                "cannot override mutable property with a covariant type"
            }
            Self::OverrideWithStoredProperty => "cannot override with a stored property",
            Self::ObservingReadonlyProperty => "cannot observe read-only property",
            Self::OverrideMutableWithReadonlyProperty => {
                "cannot override mutable property with read-only property"
            }
            Self::OverrideLetProperty => "cannot override immutable 'let' property",
            Self::OverrideDeclExtension => "declarations in extensions cannot override yet",
            Self::MissingOverride => "overriding declaration requires an 'override' keyword",
            Self::OverrideFinal => "cannot override a final declaration",
            Self::OverrideNoReturnWithReturn => {
                "an override of a @noreturn method should also be @noreturn"
            }
            Self::MethodDoesNotOverride => "method does not override any method from its superclass",
            Self::PropertyDoesNotOverride => {
                "property does not override any property from its superclass"
            }
            Self::InitializerDoesNotOverride => {
                "initializer does not override a designated initializer from its superclass"
            }
            Self::RequiredInitializerOverrideKeyword => {
                "'override' is implied when overriding a required initializer"
            }
            Self::RequiredInitializerOverrideWrongKeyword => {
                "use the 'required' modifier to override a required initializer"
            }
            Self::RequiredInitializerMissingKeyword => {
                "'required' modifier must be present on all overrides of a required initializer"
            }
            Self::FailableInitializerOverride => {
                "failable initializer cannot override a non-failable initializer"
            }

            Self::NonClassConvenienceInit => {
                "delegating initializers in non-class types are not marked 'convenience'"
            }
            Self::DesignatedInitInExtension => {
                "designated initializer cannot be declared in an extension"
            }
            Self::ClassWithoutInit => "class has no initializers",
            Self::RequiredInitializerMissing => "'required' initializer must be provided by subclass",
            Self::UnsupportedSynthesizeInitVariadic => {
                "synthesizing a variadic inherited initializer is unsupported"
            }
            Self::MissingUnimplementedInitRuntime => {
                "standard library error: missing _unimplemented_initializer"
            }
            Self::RequiredInitializerNotAccessible => {
                "'required' initializer must be as accessible as its enclosing type"
            }

            Self::RawTypeNotLiteralConvertible => {
                "raw type is not convertible from any literal"
            }
            Self::EmptyEnumRawType => "an enum with no cases cannot declare a raw type",
            Self::EnumWithRawTypeCaseWithArgument => {
                "enum with raw type cannot have cases with arguments"
            }
            Self::EnumRawValueWithoutRawType => {
                "enum case cannot have a raw value if the enum does not have a raw type"
            }
            Self::EnumNonIntegerRawValueAutoIncrement => {
                "enum case must declare a raw value when the preceding raw value is not an integer"
            }
            Self::EnumRawValueIncrementOverflow => {
                "enum case must declare a raw value when the preceding raw value cannot be incremented"
            }
            Self::EnumNonIntegerConvertibleRawType => {
                "enum cases require explicit raw values when the raw type is not integer literal convertible"
            }
            Self::EnumRawValueNotUnique => "raw value for enum case is not unique",
            Self::RawValueTypeMismatch => "raw value does not match the raw type",
            Self::EnumElementNotMaterializable => "enum case cannot have a non-materializable payload",

            Self::TypeDoesNotConform => "type does not conform to protocol",

            Self::PatternTypeAccess => "variable uses a less accessible type",
            Self::PatternTypeAccessInferred => "variable has an inferred type that is less accessible",
            Self::TypeAliasUnderlyingTypeAccess => "type alias aliases a less accessible type",
            Self::AssociatedTypeAccess => "associated type references a less accessible type",
            Self::EnumRawTypeAccess => "enum raw type is less accessible than the enum",
            Self::ClassSuperAccess => "class superclass is less accessible than the class",
            Self::ProtocolRefineAccess => "protocol refines a less accessible protocol",
            Self::SubscriptTypeAccess => "subscript uses a less accessible type",
            Self::FunctionTypeAccess => "function uses a less accessible type",
            Self::EnumCaseAccess => "enum case uses a less accessible type",
            Self::GenericParamAccess => "generic parameter uses a less accessible type",

            Self::LetDefaultInit => "'let' property is default-initialized and can never change",
            Self::ObjCOverrideNameMismatch => "@objc name does not match overridden declaration",
            Self::OverrideUnavailable => "overriding an unavailable declaration",
        }
    }

    /// Template for custom messages. Contains `{}` placeholder for caller-provided detail.
    pub fn custom_message(&self) -> String {
        match self {
            Self::UndeclaredType => "use of undeclared type '{}'".to_string(),
            Self::NotAType => "'{}' is not a type".to_string(),
            Self::NonNominalExtension => "non-nominal type '{}' cannot be extended".to_string(),
            Self::DuplicateInheritance => "duplicate inheritance from '{}'".to_string(),
            Self::InheritanceFromFinalClass => "inheritance from a final class '{}'".to_string(),
            Self::InvalidRedecl => "invalid redeclaration of '{}'".to_string(),
            Self::DuplicateEnumElement => "duplicate definition of enum case '{}'".to_string(),
            Self::MissingOverride => self.fallback_message().to_string(),
            Self::ClassWithoutInit => "class '{}' has no initializers".to_string(),
            Self::TypeDoesNotConform => "{}".to_string(),
            Self::EmptyEnumRawType => self.fallback_message().to_string(),

            // Detailed messages composed at the call site
            Self::CircularInheritance
            | Self::CircularReference
            | Self::GenericArgumentCount
            | Self::MultipleEnumRawTypes
            | Self::RawTypeNotFirst
            | Self::MultipleInheritance
            | Self::SuperclassNotFirst
            | Self::ExtensionClassInheritance
            | Self::NonClassInheritance
            | Self::InheritanceFromNonProtocolOrClass
            | Self::InheritanceFromNonProtocol
            | Self::ObjCProtocolInheritsNonObjCProtocol
            | Self::RequiresConformanceNonProtocol
            | Self::InvalidRequirement
            | Self::InitializerTypeMismatch
            | Self::TypeNotMaterializable
            | Self::AttributeNotAllowed
            | Self::ConflictingAttributes
            | Self::InvalidObjCDecl
            | Self::ObjCNameFuncMismatch
            | Self::OverrideObjCTypeMismatch
            | Self::OverrideArgumentNameMismatch
            | Self::OverrideMultipleDecls
            | Self::OverrideNotAccessible
            | Self::OverridePropertyTypeMismatch
            | Self::OverrideWithStoredProperty
            | Self::ObservingReadonlyProperty
            | Self::OverrideLetProperty
            | Self::OverrideFinal
            | Self::RequiredInitializerMissing
            | Self::RequiredInitializerNotAccessible
            | Self::RawTypeNotLiteralConvertible
            | Self::EnumRawValueNotUnique
            | Self::PatternTypeAccess
            | Self::PatternTypeAccessInferred
            | Self::TypeAliasUnderlyingTypeAccess
            | Self::AssociatedTypeAccess
            | Self::EnumRawTypeAccess
            | Self::ClassSuperAccess
            | Self::ProtocolRefineAccess
            | Self::SubscriptTypeAccess
            | Self::FunctionTypeAccess
            | Self::EnumCaseAccess
            | Self::GenericParamAccess
            | Self::ObjCOverrideNameMismatch
            | Self::OverrideUnavailable => "{}".to_string(),

            // Standard pattern: fallback + context
            _ => format!("{}: {{}}", self.fallback_message()),
        }
    }

    /// Render the final message.
    ///
    /// - `None` → returns `fallback_message()`
    /// - `Some(detail)` → returns `custom_message()` with `{}` replaced by detail
    pub fn message(&self, msg: Option<&str>) -> String {
        match msg {
            None => self.fallback_message().to_string(),
            Some(detail) => self.custom_message().replace("{}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A source edit: insertion (empty span), removal (empty replacement) or replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    pub span: Span,
    pub replacement: String,
    pub description: String,
}

impl Fix {
    pub fn new(span: Span, replacement: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

impl RelatedInfo {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
    pub fixes: Vec<Fix>,
    pub related: Vec<RelatedInfo>,
    pub highlights: Vec<Span>,
}

impl DiagnosticMessage {
    pub(crate) fn with_default_message(kind: DiagnosticKind, span: Span) -> Self {
        Self {
            kind,
            span,
            message: kind.fallback_message().to_string(),
            fixes: Vec::new(),
            related: Vec::new(),
            highlights: Vec::new(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.default_severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity(),
            u32::from(self.span.range.start()),
            u32::from(self.span.range.end()),
            self.message
        )?;
        for fix in &self.fixes {
            write!(f, " (fix: {})", fix.description)?;
        }
        for highlight in &self.highlights {
            write!(
                f,
                " (highlight: {}..{})",
                u32::from(highlight.range.start()),
                u32::from(highlight.range.end())
            )?;
        }
        for related in &self.related {
            write!(
                f,
                " (related: {} at {}..{})",
                related.message,
                u32::from(related.span.range.start()),
                u32::from(related.span.range.end())
            )?;
        }
        Ok(())
    }
}
