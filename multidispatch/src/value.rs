//! Dynamically typed values passed through generic functions.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::Ty;

/// A complex number, the payload of [`Ty::COMPLEX`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0.0 {
            write!(f, "({}-{}j)", self.re, -self.im)
        } else {
            write!(f, "({}+{}j)", self.re, self.im)
        }
    }
}

/// A runtime value tagged with its type.
///
/// Cloning is cheap: the payload is shared. The tag is what dispatch sees
/// (`typeOf(value)`); the payload is only inspected by implementations.
#[derive(Clone)]
pub struct Value {
    ty: Ty,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Value {
    /// Wrap an arbitrary payload under a user-declared type.
    pub fn new<T: Any + Send + Sync>(ty: Ty, payload: T) -> Self {
        Self {
            ty,
            payload: Arc::new(payload),
        }
    }

    pub fn int(value: i64) -> Self {
        Self::new(Ty::INT, value)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(Ty::BOOL, value)
    }

    pub fn float(value: f64) -> Self {
        Self::new(Ty::FLOAT, value)
    }

    pub fn complex(re: f64, im: f64) -> Self {
        Self::new(Ty::COMPLEX, Complex::new(re, im))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::new(Ty::STR, value.into())
    }

    /// The runtime type used for dispatch.
    pub fn ty(&self) -> Ty {
        self.ty
    }

    /// Borrow the payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Integer payload. Only values tagged `int` qualify.
    pub fn as_int(&self) -> Option<i64> {
        if self.ty != Ty::INT {
            return None;
        }
        self.downcast_ref::<i64>().copied()
    }

    pub fn as_bool(&self) -> Option<bool> {
        if self.ty != Ty::BOOL {
            return None;
        }
        self.downcast_ref::<bool>().copied()
    }

    pub fn as_float(&self) -> Option<f64> {
        if self.ty != Ty::FLOAT {
            return None;
        }
        self.downcast_ref::<f64>().copied()
    }

    pub fn as_complex(&self) -> Option<Complex> {
        if self.ty != Ty::COMPLEX {
            return None;
        }
        self.downcast_ref::<Complex>().copied()
    }

    pub fn as_str(&self) -> Option<&str> {
        if self.ty != Ty::STR {
            return None;
        }
        self.downcast_ref::<String>().map(String::as_str)
    }

    /// Whether both values share the same payload allocation.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.as_int() {
            write!(f, "int({v})")
        } else if let Some(v) = self.as_bool() {
            write!(f, "bool({v})")
        } else if let Some(v) = self.as_float() {
            write!(f, "float({v:?})")
        } else if let Some(v) = self.as_complex() {
            write!(f, "complex{v}")
        } else if let Some(v) = self.as_str() {
            write!(f, "str({v:?})")
        } else {
            write!(f, "<value of type #{}>", self.ty.index())
        }
    }
}

/// Render the payload of a built-in value for messages; user types render
/// as their type index.
pub(crate) fn describe(value: &Value) -> String {
    if let Some(v) = value.as_int() {
        v.to_string()
    } else if let Some(v) = value.as_bool() {
        v.to_string()
    } else if let Some(v) = value.as_float() {
        format!("{v:?}")
    } else if let Some(v) = value.as_complex() {
        v.to_string()
    } else if let Some(v) = value.as_str() {
        format!("{v:?}")
    } else {
        format!("{value:?}")
    }
}
