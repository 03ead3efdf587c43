//! The closed type system used by the analyzer.
//!
//! Kept as a plain enum with structural equality, the same shape the
//! teacher's `typechecker::types::Type` uses — one variant per semantic
//! concept, no open extension point.

use std::fmt::{self, Display};

/// A struct's declared shape, shared between its `Named` type occurrences
/// and its `StructSymbol` so field lookups don't need a second table.
#[derive(Debug, Clone, PartialEq)]
pub struct StructShape {
    pub name: String,
    pub fields: Vec<(String, Type)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// The type of a function or block that returns nothing.
    Void,
    /// The type of a block that always exits via `return` or `break`.
    Never,
    /// Declared but not yet inferred. Reading a `Pending`-typed variable
    /// is a static error; it must never survive to the evaluator.
    Pending,
    /// Error-recovery placeholder. Compatible with everything, so a
    /// prior mistake doesn't cascade into a pile of follow-on ones.
    Bad,
    /// Disables element type-checking (used for array elements whose
    /// declared element type isn't tracked). Using it raises the
    /// `isUsedAnyType` warning.
    Any,
    /// A primitive (`number`, `bool`, `char`, `string`, `array`) or a
    /// user-declared struct, identified by name.
    Named(String),
    Function {
        params: Vec<Type>,
        return_ty: Box<Type>,
    },
    /// Declared but not exercised by the core checks beyond naming array
    /// element types.
    Generic { name: String, params: Vec<Type> },
}

pub const NUMBER: &str = "number";
pub const BOOL: &str = "bool";
pub const CHAR: &str = "char";
pub const STRING: &str = "string";
pub const ARRAY: &str = "array";

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    pub fn number() -> Self {
        Type::Named(NUMBER.to_owned())
    }

    pub fn bool() -> Self {
        Type::Named(BOOL.to_owned())
    }

    pub fn char() -> Self {
        Type::Named(CHAR.to_owned())
    }

    pub fn string() -> Self {
        Type::Named(STRING.to_owned())
    }

    pub fn array() -> Self {
        Type::Named(ARRAY.to_owned())
    }

    pub fn is_primitive_name(name: &str) -> bool {
        matches!(name, NUMBER | BOOL | CHAR | STRING | ARRAY)
    }

    /// Total compatibility check: every pair of types has a defined
    /// answer, there is no "incomparable" outcome.
    pub fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Bad, _) | (_, Type::Bad) => true,
            (Type::Any, other) => !matches!(other, Type::Void | Type::Never | Type::Pending),
            (other, Type::Any) => !matches!(other, Type::Void | Type::Never | Type::Pending),
            (Type::Void, Type::Void) => true,
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Never, Type::Never) => true,
            (Type::Never, _) | (_, Type::Never) => false,
            (Type::Pending, Type::Pending) => true,
            (Type::Pending, _) | (_, Type::Pending) => false,
            (Type::Named(a), Type::Named(b)) => a == b,
            (
                Type::Function {
                    params: pa,
                    return_ty: ra,
                },
                Type::Function {
                    params: pb,
                    return_ty: rb,
                },
            ) => pa.len() == pb.len() && ra.compatible(rb) && pa.iter().zip(pb).all(|(a, b)| a.compatible(b)),
            (Type::Generic { name: na, params: pa }, Type::Generic { name: nb, params: pb }) => {
                na == nb && pa.len() == pb.len() && pa.iter().zip(pb).all(|(a, b)| a.compatible(b))
            }
            _ => false,
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Type::Never)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Never => write!(f, "never"),
            Type::Pending => write!(f, "pending"),
            Type::Bad => write!(f, "bad"),
            Type::Any => write!(f, "any"),
            Type::Named(name) => write!(f, "{name}"),
            Type::Function { params, return_ty } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, "): {return_ty}")
            }
            Type::Generic { name, params } => {
                write!(f, "{name}<")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_type_is_compatible() {
        assert!(Type::number().compatible(&Type::number()));
        assert!(Type::named("A").compatible(&Type::named("A")));
    }

    #[test]
    fn bad_is_universally_compatible() {
        assert!(Type::Bad.compatible(&Type::Void));
        assert!(Type::number().compatible(&Type::Bad));
    }

    #[test]
    fn void_is_only_compatible_with_itself() {
        assert!(Type::Void.compatible(&Type::Void));
        assert!(!Type::Void.compatible(&Type::number()));
        assert!(!Type::number().compatible(&Type::Void));
    }

    #[test]
    fn never_and_pending_are_only_self_compatible() {
        assert!(!Type::Never.compatible(&Type::number()));
        assert!(!Type::Pending.compatible(&Type::number()));
    }

    #[test]
    fn named_types_compare_by_name() {
        assert!(!Type::named("A").compatible(&Type::named("B")));
    }

    #[test]
    fn function_types_compare_structurally() {
        let f1 = Type::Function {
            params: vec![Type::number()],
            return_ty: Box::new(Type::bool()),
        };
        let f2 = Type::Function {
            params: vec![Type::number()],
            return_ty: Box::new(Type::bool()),
        };
        let f3 = Type::Function {
            params: vec![Type::string()],
            return_ty: Box::new(Type::bool()),
        };
        assert!(f1.compatible(&f2));
        assert!(!f1.compatible(&f3));
    }
}
