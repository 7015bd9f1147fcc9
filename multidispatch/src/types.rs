//! Runtime types and the subtype relation.
//!
//! A [`Ty`] is an opaque handle into a [`TypeUniverse`], the host
//! type-reflection facility consulted by dispatch, conversion and promotion.
//! Each declared type names its direct supertypes; the universe keeps a
//! linearised ancestor chain per type so that `is_subtype` is a membership
//! test.
//!
//! Every universe starts with the distinguished Top type `object` followed
//! by the built-in scalar types:
//!
//! ```text
//! object
//! ├── int
//! │   └── bool
//! ├── float
//! ├── complex
//! └── str
//! ```
//!
//! Types can only name supertypes that already exist, so the relation is
//! acyclic and stays a partial order no matter how it is extended.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::signature::TypeOrder;

/// Handle to a type declared in a [`TypeUniverse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ty(u32);

impl Ty {
    /// The Top type. Every type is a subtype of `object`.
    pub const OBJECT: Ty = Ty(0);
    /// Machine integers (`i64` payload).
    pub const INT: Ty = Ty(1);
    /// Booleans, a subtype of `int`.
    pub const BOOL: Ty = Ty(2);
    /// Double precision floats (`f64` payload).
    pub const FLOAT: Ty = Ty(3);
    /// Complex numbers (`Complex` payload).
    pub const COMPLEX: Ty = Ty(4);
    /// Strings (`String` payload).
    pub const STR: Ty = Ty(5);

    /// Position of this type in its universe's declaration order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Built-in types print their name; user types, whose names live in a
/// [`TypeUniverse`], print their declaration index.
impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Ty::OBJECT => f.write_str("object"),
            Ty::INT => f.write_str("int"),
            Ty::BOOL => f.write_str("bool"),
            Ty::FLOAT => f.write_str("float"),
            Ty::COMPLEX => f.write_str("complex"),
            Ty::STR => f.write_str("str"),
            Ty(index) => write!(f, "type#{index}"),
        }
    }
}

/// Errors raised while declaring types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("type `{0}` is already declared")]
    DuplicateType(String),

    #[error("unknown supertype {supertype:?} for `{name}`")]
    UnknownType { name: String, supertype: Ty },
}

/// A declared type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Display name.
    pub name: Arc<str>,
    /// Direct supertypes, in declaration order.
    pub supers: Vec<Ty>,
    /// Self first, then every strict supertype, `object` last.
    pub ancestors: Vec<Ty>,
}

#[derive(Debug, Default)]
struct UniverseInner {
    types: Vec<TypeInfo>,
    by_name: FxHashMap<Arc<str>, Ty>,
}

/// The set of runtime types and their subtype relation.
///
/// Shared between generic functions and the conversion registries through
/// `Arc`; declaration takes a write lock, queries take a read lock.
#[derive(Debug)]
pub struct TypeUniverse {
    inner: RwLock<UniverseInner>,
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeUniverse {
    /// Create a universe holding `object` and the built-in scalar types.
    pub fn new() -> Self {
        let universe = Self {
            inner: RwLock::new(UniverseInner::default()),
        };
        {
            let mut inner = universe.inner.write();
            // `object` is its own root and has no supertypes.
            inner.push("object", Vec::new(), vec![Ty::OBJECT]);
        }

        // Declaration order must match the `Ty` constants.
        let builtins: [(&str, Ty, &[Ty]); 5] = [
            ("int", Ty::INT, &[]),
            ("bool", Ty::BOOL, &[Ty::INT]),
            ("float", Ty::FLOAT, &[]),
            ("complex", Ty::COMPLEX, &[]),
            ("str", Ty::STR, &[]),
        ];
        for (name, expected, supers) in builtins {
            let declared = universe.declare(name, supers);
            debug_assert_eq!(declared.ok(), Some(expected));
        }
        universe
    }

    /// Create a universe ready to be shared.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Declare a new type with the given direct supertypes.
    ///
    /// An empty supertype list makes the type a direct child of `object`.
    pub fn declare(&self, name: &str, supers: &[Ty]) -> Result<Ty, TypeError> {
        let mut inner = self.inner.write();
        if inner.by_name.contains_key(name) {
            return Err(TypeError::DuplicateType(name.to_string()));
        }
        if let Some(&unknown) = supers.iter().find(|s| s.index() >= inner.types.len()) {
            return Err(TypeError::UnknownType {
                name: name.to_string(),
                supertype: unknown,
            });
        }

        let ty = Ty(inner.types.len() as u32);
        let mut ancestors = vec![ty];
        for &sup in supers {
            for &anc in &inner.types[sup.index()].ancestors {
                if anc != Ty::OBJECT && !ancestors.contains(&anc) {
                    ancestors.push(anc);
                }
            }
        }
        ancestors.push(Ty::OBJECT);

        let supers = if supers.is_empty() {
            vec![Ty::OBJECT]
        } else {
            supers.to_vec()
        };
        inner.push(name, supers, ancestors);
        tracing::debug!(name, index = ty.index(), "declared type");
        Ok(ty)
    }

    /// Look up a type by name.
    pub fn lookup(&self, name: &str) -> Option<Ty> {
        self.inner.read().by_name.get(name).copied()
    }

    /// Display name of a type. Unknown handles render as `<type #n>`.
    pub fn name(&self, ty: Ty) -> Arc<str> {
        match self.inner.read().types.get(ty.index()) {
            Some(info) => info.name.clone(),
            None => Arc::from(format!("<type #{}>", ty.index())),
        }
    }

    /// Snapshot of a declared type.
    pub fn info(&self, ty: Ty) -> Option<TypeInfo> {
        self.inner.read().types.get(ty.index()).cloned()
    }

    /// Linearised supertype chain: `ty` itself, its strict supertypes, and
    /// `object` last.
    pub fn ancestors(&self, ty: Ty) -> Vec<Ty> {
        match self.inner.read().types.get(ty.index()) {
            Some(info) => info.ancestors.clone(),
            None => vec![ty, Ty::OBJECT],
        }
    }

    /// Number of declared types, `object` included.
    pub fn len(&self) -> usize {
        self.inner.read().types.len()
    }

    /// A universe is never empty; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Render a call shape as `name(T1, T2)`.
    pub fn format_call(&self, name: &str, types: &[Ty]) -> String {
        let inner = self.inner.read();
        let args: Vec<&str> = types
            .iter()
            .map(|ty| {
                inner
                    .types
                    .get(ty.index())
                    .map(|info| &*info.name)
                    .unwrap_or("?")
            })
            .collect();
        format!("{}({})", name, args.join(", "))
    }
}

impl UniverseInner {
    fn push(&mut self, name: &str, supers: Vec<Ty>, ancestors: Vec<Ty>) {
        let name: Arc<str> = Arc::from(name);
        let ty = Ty(self.types.len() as u32);
        self.by_name.insert(name.clone(), ty);
        self.types.push(TypeInfo {
            name,
            supers,
            ancestors,
        });
    }
}

impl TypeOrder for TypeUniverse {
    fn is_subtype(&self, sub: Ty, sup: Ty) -> bool {
        if sub == sup || sup == Ty::OBJECT {
            return true;
        }
        self.inner
            .read()
            .types
            .get(sub.index())
            .is_some_and(|info| info.ancestors.contains(&sup))
    }
}
