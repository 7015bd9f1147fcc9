//! Type signatures and their elementwise order.
//!
//! A [`Signature`] is either a tuple of types or [`Signature::Any`], the
//! top of the tuple order that matches every argument count. Signatures are
//! compared elementwise:
//!
//! ```text
//! (bool, int) <= (int, int) <= (object, int) <= Any
//! (int, int)  and (int,)     are unrelated (arity differs)
//! ```

use std::fmt;

use crate::types::{Ty, TypeUniverse};

/// A sequence of argument types, or the catch-all `Any`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    /// Matches every argument tuple not otherwise covered.
    Any,
    /// Positional argument types.
    Types(Vec<Ty>),
}

impl Signature {
    /// Build a tuple signature.
    pub fn of(types: impl IntoIterator<Item = Ty>) -> Self {
        Signature::Types(types.into_iter().collect())
    }

    /// Whether this is the catch-all signature.
    pub fn is_any(&self) -> bool {
        matches!(self, Signature::Any)
    }

    /// Positional types, or `None` for `Any`.
    pub fn types(&self) -> Option<&[Ty]> {
        match self {
            Signature::Any => None,
            Signature::Types(types) => Some(types),
        }
    }

    /// Number of positional types, or `None` for `Any`.
    pub fn arity(&self) -> Option<usize> {
        self.types().map(<[Ty]>::len)
    }

    /// Render as `name(T1, T2)`; `Any` renders as `name(...)`.
    pub fn display<'a>(&'a self, name: &'a str, universe: &'a TypeUniverse) -> SignatureDisplay<'a> {
        SignatureDisplay {
            signature: self,
            name,
            universe,
        }
    }
}

impl From<Vec<Ty>> for Signature {
    fn from(types: Vec<Ty>) -> Self {
        Signature::Types(types)
    }
}

impl From<&[Ty]> for Signature {
    fn from(types: &[Ty]) -> Self {
        Signature::Types(types.to_vec())
    }
}

impl<const N: usize> From<[Ty; N]> for Signature {
    fn from(types: [Ty; N]) -> Self {
        Signature::Types(types.to_vec())
    }
}

/// Renders `(T1, T2)` or `(...)` without a universe; see [`Ty`]'s `Display`.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Any => f.write_str("(...)"),
            Signature::Types(types) => {
                f.write_str("(")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Formatter returned by [`Signature::display`].
pub struct SignatureDisplay<'a> {
    signature: &'a Signature,
    name: &'a str,
    universe: &'a TypeUniverse,
}

impl fmt::Display for SignatureDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signature {
            Signature::Any => write!(f, "{}(...)", self.name),
            Signature::Types(types) => f.write_str(&self.universe.format_call(self.name, types)),
        }
    }
}

/// The subtype predicate, lifted from single types to signatures.
pub trait TypeOrder {
    /// Whether `sub` is a subtype of `sup`. Must be reflexive, antisymmetric
    /// and transitive.
    fn is_subtype(&self, sub: Ty, sup: Ty) -> bool;

    /// Elementwise order over signatures with `Any` as top.
    fn is_subsignature(&self, sub: &Signature, sup: &Signature) -> bool {
        match (sub, sup) {
            (_, Signature::Any) => true,
            (Signature::Any, Signature::Types(_)) => false,
            (Signature::Types(a), Signature::Types(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.is_subtype(*x, *y))
            }
        }
    }

    /// Whether a concrete argument tuple falls under `signature`.
    fn accepts(&self, signature: &Signature, types: &[Ty]) -> bool {
        match signature {
            Signature::Any => true,
            Signature::Types(params) => {
                params.len() == types.len()
                    && types.iter().zip(params).all(|(t, p)| self.is_subtype(*t, *p))
            }
        }
    }

    /// Strict elementwise order: `sub <= sup` and `sub != sup`.
    fn is_strict_subsignature(&self, sub: &Signature, sup: &Signature) -> bool {
        sub != sup && self.is_subsignature(sub, sup)
    }
}
