//! Standard declarations the checker refers to by name.
//!
//! A module without a prelude file gets a minimal one built in memory:
//! the literal types, the literal protocols, `RawRepresentable`,
//! `AnyObject`, `Copying` and the trap used by initializer stubs.

use rowan::TextRange;

use crate::ast::{
    Accessibility, Ast, AstBuilder, AttrKind, DeclContext, DeclId, FileKind, NominalKind,
    ParamSpec, TypeRepr,
};

pub const PRELUDE_FILE_NAME: &str = "Prelude.ks";

pub const INTEGER_LITERAL: &str = "IntegerLiteralConvertible";
pub const FLOAT_LITERAL: &str = "FloatLiteralConvertible";
pub const BOOLEAN_LITERAL: &str = "BooleanLiteralConvertible";
pub const STRING_LITERAL: &str = "StringLiteralConvertible";
pub const UNICODE_SCALAR_LITERAL: &str = "UnicodeScalarLiteralConvertible";
pub const CHARACTER_LITERAL: &str = "ExtendedGraphemeClusterLiteralConvertible";
pub const NIL_LITERAL: &str = "NilLiteralConvertible";

/// Declarations resolved from the prelude. Absent entries disable the
/// checks that need them.
#[derive(Debug, Clone, Default)]
pub struct KnownDecls {
    pub int: Option<DeclId>,
    pub double: Option<DeclId>,
    pub float: Option<DeclId>,
    pub bool: Option<DeclId>,
    pub string: Option<DeclId>,
    pub character: Option<DeclId>,
    pub unicode_scalar: Option<DeclId>,
    pub zone: Option<DeclId>,
    pub integer_literal: Option<DeclId>,
    pub float_literal: Option<DeclId>,
    pub boolean_literal: Option<DeclId>,
    pub string_literal: Option<DeclId>,
    pub unicode_scalar_literal: Option<DeclId>,
    pub character_literal: Option<DeclId>,
    pub nil_literal: Option<DeclId>,
    pub raw_representable: Option<DeclId>,
    pub any_object: Option<DeclId>,
    pub copying: Option<DeclId>,
    pub unimplemented_initializer: Option<DeclId>,
}

impl KnownDecls {
    /// Look the known declarations up among the top-level declarations of
    /// prelude files.
    pub fn resolve(ast: &Ast) -> Self {
        let find = |name: &str| -> Option<DeclId> {
            let sym = ast.interner.get(name)?;
            ast.files()
                .filter(|(_, f)| f.kind == FileKind::Prelude)
                .flat_map(|(_, f)| f.decls().iter().copied())
                .find(|&d| ast.decl(d).name.base() == sym)
        };
        Self {
            int: find("Int"),
            double: find("Double"),
            float: find("Float"),
            bool: find("Bool"),
            string: find("String"),
            character: find("Character"),
            unicode_scalar: find("UnicodeScalar"),
            zone: find("Zone"),
            integer_literal: find(INTEGER_LITERAL),
            float_literal: find(FLOAT_LITERAL),
            boolean_literal: find(BOOLEAN_LITERAL),
            string_literal: find(STRING_LITERAL),
            unicode_scalar_literal: find(UNICODE_SCALAR_LITERAL),
            character_literal: find(CHARACTER_LITERAL),
            nil_literal: find(NIL_LITERAL),
            raw_representable: find("RawRepresentable"),
            any_object: find("AnyObject"),
            copying: find("Copying"),
            unimplemented_initializer: find("_unimplemented_initializer"),
        }
    }

    /// Protocols a raw type must conform to one of.
    pub fn raw_value_literal_protocols(&self) -> Vec<DeclId> {
        [
            self.integer_literal,
            self.float_literal,
            self.string_literal,
            self.unicode_scalar_literal,
            self.character_literal,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Whether any file of `ast` is a prelude file.
pub fn has_prelude(ast: &Ast) -> bool {
    ast.files().any(|(_, f)| f.kind == FileKind::Prelude)
}

/// Append the in-memory prelude to `ast`.
pub fn install(ast: &mut Ast) {
    let file = ast.add_file(PRELUDE_FILE_NAME, "", FileKind::Prelude);
    let mut b = AstBuilder::new(ast, file);
    let root = b.root();
    let none = TextRange::default();

    let literal_protocols = [
        INTEGER_LITERAL,
        FLOAT_LITERAL,
        BOOLEAN_LITERAL,
        STRING_LITERAL,
        UNICODE_SCALAR_LITERAL,
        CHARACTER_LITERAL,
        NIL_LITERAL,
    ];
    let mut exported = Vec::new();
    for name in literal_protocols {
        exported.push(b.nominal(NominalKind::Protocol, root, name, none, none));
    }

    let any_object = b.nominal(NominalKind::Protocol, root, "AnyObject", none, none);
    b.attr(any_object, AttrKind::ObjC(None), none);

    let raw = b.nominal(NominalKind::Protocol, root, "RawRepresentable", none, none);
    b.associated_type(raw, "RawValue", none, none);
    exported.extend([any_object, raw]);

    let builtin_structs: [(&str, &[&str]); 8] = [
        ("Int", &[INTEGER_LITERAL]),
        ("Double", &[FLOAT_LITERAL, INTEGER_LITERAL]),
        ("Float", &[FLOAT_LITERAL, INTEGER_LITERAL]),
        ("Bool", &[BOOLEAN_LITERAL]),
        (
            "String",
            &[STRING_LITERAL, CHARACTER_LITERAL, UNICODE_SCALAR_LITERAL],
        ),
        ("Character", &[CHARACTER_LITERAL, UNICODE_SCALAR_LITERAL]),
        ("UnicodeScalar", &[UNICODE_SCALAR_LITERAL]),
        ("Zone", &[]),
    ];
    for (name, protocols) in builtin_structs {
        let decl = b.nominal(NominalKind::Struct, root, name, none, none);
        for proto in protocols {
            let repr = b.ident(proto, none);
            b.inherit(decl, repr);
        }
        exported.push(decl);
    }

    let copying = b.nominal(NominalKind::Protocol, root, "Copying", none, none);
    let zone = b.ident("Zone", none);
    let zone = TypeRepr::optional(zone, none);
    let result = b.ident("AnyObject", none);
    b.func(
        DeclContext::Nominal(copying),
        "copy",
        vec![ParamSpec::labeled("zone", zone, none)],
        Some(result),
        none,
        none,
    );

    let class_name = b.ident("String", none);
    let trap = b.func(
        root,
        "_unimplemented_initializer",
        vec![ParamSpec::labeled("className", class_name, none)],
        None,
        none,
        none,
    );
    b.attr(trap, AttrKind::NoReturn, none);
    exported.extend([copying, trap]);

    for decl in exported {
        b.attr(decl, AttrKind::Accessibility(Accessibility::Public), none);
    }
}

