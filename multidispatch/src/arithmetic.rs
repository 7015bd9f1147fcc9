//! Generic arithmetic and comparison operators.
//!
//! `add`, `sub`, `mul` and `truediv`, and the comparisons `eq`, `ne`, `gt`,
//! `ge`, `lt` and `le`, are binary [`GenericFunction`]s with native methods
//! for same-typed built-in arguments. Mixed arguments fall through to a
//! fallback that promotes both sides with the [`PromotionRegistry`] and
//! dispatches again:
//!
//! ```text
//! add(1, 2.5)
//!   -> no method for add(int, float), fallback
//!   -> promote(1, 2.5) = (1.0, 2.5)
//!   -> add(float, float) = 3.5
//! ```
//!
//! The fallback re-dispatches only when promotion changed an argument type,
//! so a pair that promotes to itself fails instead of recursing.

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::trace;

use crate::config::CacheConfig;
use crate::conversion::{PromotionError, PromotionRegistry};
use crate::dispatch::{DispatchError, GenericFunction};
use crate::types::{Ty, TypeUniverse};
use crate::value::{Complex, Value};
use crate::{Error, Result};

/// The binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    TrueDiv,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 10] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::TrueDiv,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::Lt,
        BinaryOp::Le,
    ];

    /// Name of the generic function.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::TrueDiv => "truediv",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
        }
    }

    /// Whether the operator compares its arguments and returns a `bool`.
    pub fn is_relational(self) -> bool {
        !matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::TrueDiv)
    }

    /// Whether the operator only tests equality, which needs no order.
    fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    fn compare<T: PartialOrd + ?Sized>(self, a: &T, b: &T) -> bool {
        match self {
            BinaryOp::Eq => a == b,
            BinaryOp::Ne => a != b,
            BinaryOp::Gt => a > b,
            BinaryOp::Ge => a >= b,
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::TrueDiv => false,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The operator generic functions sharing one promotion registry.
pub struct Arithmetic {
    /// One function per operator, in [`BinaryOp::ALL`] order.
    functions: Vec<Arc<GenericFunction>>,
}

impl Arithmetic {
    /// Build the operators with their native methods and promotion fallback.
    pub fn new(promotions: Arc<PromotionRegistry>, cache: &CacheConfig) -> Result<Self> {
        let universe = promotions.conversions().universe().clone();
        let functions = BinaryOp::ALL
            .into_iter()
            .map(|op| -> Result<Arc<GenericFunction>> {
                let function = Arc::new(
                    GenericFunction::new(op.name(), universe.clone())
                        .with_arity(2)
                        .with_cache_config(cache),
                );
                if op.is_relational() {
                    register_comparisons(&function, op)?;
                } else {
                    register_natives(&function, op)?;
                }
                register_promotion_fallback(&function, promotions.clone())?;
                Ok(function)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { functions })
    }

    /// The generic function behind `op`. Register methods for user types on it.
    pub fn function(&self, op: BinaryOp) -> &Arc<GenericFunction> {
        &self.functions[op as usize]
    }

    pub fn apply(&self, op: BinaryOp, x: &Value, y: &Value) -> Result<Value> {
        self.function(op).call(&[x.clone(), y.clone()])
    }

    pub fn add(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Add, x, y)
    }

    pub fn sub(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Sub, x, y)
    }

    pub fn mul(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Mul, x, y)
    }

    pub fn truediv(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::TrueDiv, x, y)
    }

    pub fn eq(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Eq, x, y)
    }

    pub fn ne(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Ne, x, y)
    }

    pub fn gt(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Gt, x, y)
    }

    pub fn ge(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Ge, x, y)
    }

    pub fn lt(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Lt, x, y)
    }

    pub fn le(&self, x: &Value, y: &Value) -> Result<Value> {
        self.apply(BinaryOp::Le, x, y)
    }
}

fn register_natives(function: &GenericFunction, op: BinaryOp) -> Result<()> {
    function.register_returning([Ty::INT, Ty::INT], int_result(op), move |args: &[Value]| {
        let (a, b) = (int_arg(&args[0])?, int_arg(&args[1])?);
        let out = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::TrueDiv => {
                if b == 0 {
                    return Err(Error::Arithmetic("division by zero".to_string()));
                }
                return Ok(Value::float(a as f64 / b as f64));
            }
            _ => return Err(not_arithmetic(op)),
        };
        out.map(Value::int)
            .ok_or_else(|| Error::Arithmetic(format!("integer overflow in {op}")))
    })?;

    function.register_returning([Ty::FLOAT, Ty::FLOAT], Ty::FLOAT, move |args: &[Value]| {
        let (a, b) = (float_arg(&args[0])?, float_arg(&args[1])?);
        Ok(Value::float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::TrueDiv => {
                if b == 0.0 {
                    return Err(Error::Arithmetic("float division by zero".to_string()));
                }
                a / b
            }
            _ => return Err(not_arithmetic(op)),
        }))
    })?;

    function.register_returning([Ty::COMPLEX, Ty::COMPLEX], Ty::COMPLEX, move |args: &[Value]| {
        let (a, b) = (complex_arg(&args[0])?, complex_arg(&args[1])?);
        let out = match op {
            BinaryOp::Add => Complex::new(a.re + b.re, a.im + b.im),
            BinaryOp::Sub => Complex::new(a.re - b.re, a.im - b.im),
            BinaryOp::Mul => Complex::new(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re),
            BinaryOp::TrueDiv => {
                let norm = b.re * b.re + b.im * b.im;
                if norm == 0.0 {
                    return Err(Error::Arithmetic("complex division by zero".to_string()));
                }
                Complex::new(
                    (a.re * b.re + a.im * b.im) / norm,
                    (a.im * b.re - a.re * b.im) / norm,
                )
            }
            _ => return Err(not_arithmetic(op)),
        };
        Ok(Value::complex(out.re, out.im))
    })?;

    if op == BinaryOp::Add {
        function.register_returning([Ty::STR, Ty::STR], Ty::STR, |args: &[Value]| {
            let (a, b) = (str_arg(&args[0])?, str_arg(&args[1])?);
            Ok(Value::str(format!("{a}{b}")))
        })?;
    }
    Ok(())
}

fn register_comparisons(function: &GenericFunction, op: BinaryOp) -> Result<()> {
    function.register_returning([Ty::INT, Ty::INT], Ty::BOOL, move |args: &[Value]| {
        let (a, b) = (int_arg(&args[0])?, int_arg(&args[1])?);
        Ok(Value::bool(op.compare(&a, &b)))
    })?;

    function.register_returning([Ty::FLOAT, Ty::FLOAT], Ty::BOOL, move |args: &[Value]| {
        let (a, b) = (float_arg(&args[0])?, float_arg(&args[1])?);
        Ok(Value::bool(op.compare(&a, &b)))
    })?;

    function.register_returning([Ty::STR, Ty::STR], Ty::BOOL, move |args: &[Value]| {
        let (a, b) = (str_arg(&args[0])?, str_arg(&args[1])?);
        Ok(Value::bool(op.compare(a, b)))
    })?;

    // complex numbers compare for equality only
    function.register_returning([Ty::COMPLEX, Ty::COMPLEX], Ty::BOOL, move |args: &[Value]| {
        let (a, b) = (complex_arg(&args[0])?, complex_arg(&args[1])?);
        if !op.is_equality() {
            return Err(Error::Arithmetic(
                "there is no order relation for complex and complex".to_string(),
            ));
        }
        let equal = a.re == b.re && a.im == b.im;
        Ok(Value::bool(if op == BinaryOp::Eq { equal } else { !equal }))
    })?;
    Ok(())
}

fn register_promotion_fallback(function: &Arc<GenericFunction>, promotions: Arc<PromotionRegistry>) -> Result<()> {
    let weak: Weak<GenericFunction> = Arc::downgrade(function);
    function.register_fallback(move |args: &[Value]| {
        let function = weak
            .upgrade()
            .ok_or_else(|| Error::Arithmetic("operator is no longer alive".to_string()))?;
        let universe = function.universe();
        let [x, y] = args else {
            return Err(no_method(&function, universe, args));
        };

        let (px, py) = match promotions.promote(x, y) {
            Ok(pair) => pair,
            Err(Error::Promotion(PromotionError::NoPromotion { .. })) => {
                return Err(no_method(&function, universe, args));
            }
            Err(err) => return Err(err),
        };
        if px.ty() == x.ty() && py.ty() == y.ty() {
            return Err(no_method(&function, universe, args));
        }

        trace!(
            operator = function.name(),
            from = %universe.format_call(function.name(), &[x.ty(), y.ty()]),
            to = %universe.format_call(function.name(), &[px.ty(), py.ty()]),
            "re-dispatching promoted arguments"
        );
        function.call(&[px, py])
    })
}

fn no_method(function: &GenericFunction, universe: &TypeUniverse, args: &[Value]) -> Error {
    let types: Vec<Ty> = args.iter().map(Value::ty).collect();
    DispatchError::NoImplementation {
        name: function.name().to_string(),
        call: universe.format_call(function.name(), &types),
        types,
    }
    .into()
}

fn not_arithmetic(op: BinaryOp) -> Error {
    Error::Arithmetic(format!("{op} is not an arithmetic operator"))
}

fn int_result(op: BinaryOp) -> Ty {
    if op == BinaryOp::TrueDiv {
        Ty::FLOAT
    } else {
        Ty::INT
    }
}

// Arguments are read by payload: `(int, int)` also serves `bool` and user
// subtypes of `int`.

fn int_arg(v: &Value) -> Result<i64> {
    v.downcast_ref::<i64>()
        .copied()
        .or_else(|| v.downcast_ref::<bool>().map(|&b| i64::from(b)))
        .ok_or_else(|| payload_error(v, "int"))
}

fn float_arg(v: &Value) -> Result<f64> {
    v.downcast_ref::<f64>().copied().ok_or_else(|| payload_error(v, "float"))
}

fn complex_arg(v: &Value) -> Result<Complex> {
    v.downcast_ref::<Complex>().copied().ok_or_else(|| payload_error(v, "complex"))
}

fn str_arg(v: &Value) -> Result<&str> {
    v.downcast_ref::<String>()
        .map(String::as_str)
        .ok_or_else(|| payload_error(v, "str"))
}

fn payload_error(v: &Value, expected: &str) -> Error {
    Error::Arithmetic(format!("expected a {expected} payload, got {v:?}"))
}
