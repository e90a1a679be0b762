//! Printing types the way they are written.

use std::fmt;

use kestrel_core::Interner;

use super::{BuiltinType, TypeContext, TypeId, TypeShape};

pub struct TypeDisplay<'a> {
    types: &'a TypeContext,
    interner: &'a Interner,
    id: TypeId,
}

impl TypeContext {
    pub fn display<'a>(&'a self, id: TypeId, interner: &'a Interner) -> TypeDisplay<'a> {
        TypeDisplay {
            types: self,
            interner,
            id,
        }
    }
}

impl TypeDisplay<'_> {
    fn nested(&self, id: TypeId) -> Self {
        TypeDisplay {
            types: self.types,
            interner: self.interner,
            id,
        }
    }

    /// Wrap function types in parens when they appear as a postfix operand.
    fn postfix_operand(&self, f: &mut fmt::Formatter<'_>, id: TypeId) -> fmt::Result {
        match self.types.get(id) {
            TypeShape::Function { .. } | TypeShape::InOut(_) => write!(f, "({})", self.nested(id)),
            _ => write!(f, "{}", self.nested(id)),
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |sym| self.interner.resolve(sym);
        match self.types.get(self.id) {
            TypeShape::Error => f.write_str("<<error type>>"),
            TypeShape::Builtin(BuiltinType::RawPointer) => f.write_str("Builtin.RawPointer"),
            TypeShape::Builtin(BuiltinType::Int1) => f.write_str("Builtin.Int1"),
            TypeShape::Tuple(elements) => {
                f.write_str("(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if let Some(label) = e.label {
                        write!(f, "{}: ", name(label))?;
                    }
                    write!(f, "{}", self.nested(e.ty))?;
                    if e.variadic {
                        f.write_str("...")?;
                    }
                }
                f.write_str(")")
            }
            TypeShape::Function {
                input,
                result,
                no_return,
            } => {
                if *no_return {
                    f.write_str("@noreturn ")?;
                }
                match self.types.get(*input) {
                    TypeShape::Tuple(_) => write!(f, "{}", self.nested(*input))?,
                    _ => write!(f, "({})", self.nested(*input))?,
                }
                write!(f, " -> {}", self.nested(*result))
            }
            TypeShape::Metatype(t) => {
                self.postfix_operand(f, *t)?;
                f.write_str(".Type")
            }
            TypeShape::Optional(t) => {
                self.postfix_operand(f, *t)?;
                f.write_str("?")
            }
            TypeShape::ImplicitlyUnwrappedOptional(t) => {
                self.postfix_operand(f, *t)?;
                f.write_str("!")
            }
            TypeShape::InOut(t) => write!(f, "inout {}", self.nested(*t)),
            TypeShape::ReferenceStorage {
                ownership,
                referent,
            } => write!(f, "{} {}", ownership, self.nested(*referent)),
            TypeShape::Nominal { name: n, args, .. } => {
                f.write_str(name(*n))?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", self.nested(*a))?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeShape::UnboundGeneric { name: n, .. }
            | TypeShape::GenericParam { name: n, .. }
            | TypeShape::Archetype { name: n, .. }
            | TypeShape::Alias { name: n, .. } => f.write_str(name(*n)),
            TypeShape::DependentMember { base, name: n, .. } => {
                write!(f, "{}.{}", self.nested(*base), name(*n))
            }
            TypeShape::Composition(members) => {
                f.write_str("protocol<")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.nested(*m))?;
                }
                f.write_str(">")
            }
        }
    }
}
