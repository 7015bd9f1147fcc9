//! Built-in numeric conversion and promotion rules.
//!
//! Widening conversions (`bool -> int -> float -> complex`) always succeed.
//! Narrowing ones check the value and fail with
//! [`ConversionError::ImpreciseConversion`] when it does not fit.

use crate::types::Ty;
use crate::value::{Complex, Value};
use crate::Result;

use super::convert::{ConversionError, ConversionRegistry};
use super::promote::PromotionRegistry;

/// Exclusive upper bound of `i64` as an `f64` (2^63).
const I64_END: f64 = 9_223_372_036_854_775_808.0;

/// Register the built-in conversions between `bool`, `int`, `float` and
/// `complex`.
pub fn install_builtin_conversions(conversions: &ConversionRegistry) -> Result<()> {
    conversions.set_conversion(Ty::INT, Ty::FLOAT, |v: &Value| Ok(Value::float(integer(v, "float")? as f64)))?;
    conversions.set_conversion(Ty::INT, Ty::COMPLEX, |v: &Value| {
        Ok(Value::complex(integer(v, "complex")? as f64, 0.0))
    })?;
    conversions.set_conversion(Ty::FLOAT, Ty::COMPLEX, |v: &Value| {
        Ok(Value::complex(float(v, "complex")?, 0.0))
    })?;

    conversions.set_conversion(Ty::BOOL, Ty::INT, |v: &Value| Ok(Value::int(integer(v, "int")?)))?;
    conversions.set_conversion(Ty::BOOL, Ty::FLOAT, |v: &Value| Ok(Value::float(integer(v, "float")? as f64)))?;
    conversions.set_conversion(Ty::BOOL, Ty::COMPLEX, |v: &Value| {
        Ok(Value::complex(integer(v, "complex")? as f64, 0.0))
    })?;

    conversions.set_conversion(Ty::INT, Ty::BOOL, |v: &Value| match integer(v, "bool")? {
        0 => Ok(Value::bool(false)),
        1 => Ok(Value::bool(true)),
        _ => Err(ConversionError::imprecise(v, "bool").into()),
    })?;
    conversions.set_conversion(Ty::FLOAT, Ty::BOOL, |v: &Value| {
        number_to_bool(v, Complex::new(float(v, "bool")?, 0.0))
    })?;
    conversions.set_conversion(Ty::COMPLEX, Ty::BOOL, |v: &Value| number_to_bool(v, complex(v, "bool")?))?;

    conversions.set_conversion(Ty::FLOAT, Ty::INT, |v: &Value| {
        number_to_int(v, Complex::new(float(v, "int")?, 0.0))
    })?;
    conversions.set_conversion(Ty::COMPLEX, Ty::INT, |v: &Value| number_to_int(v, complex(v, "int")?))?;
    Ok(())
}

/// Register the built-in promotion rules. The conversions they rely on must
/// already be installed.
pub fn install_builtin_promotions(promotions: &PromotionRegistry) -> Result<()> {
    let rules = [
        (Ty::INT, Ty::FLOAT, Ty::FLOAT),
        (Ty::INT, Ty::COMPLEX, Ty::COMPLEX),
        (Ty::FLOAT, Ty::COMPLEX, Ty::COMPLEX),
        (Ty::BOOL, Ty::INT, Ty::INT),
        (Ty::BOOL, Ty::FLOAT, Ty::FLOAT),
        (Ty::BOOL, Ty::COMPLEX, Ty::COMPLEX),
    ];
    for (t1, t2, t3) in rules {
        promotions.set_promotion_rule(t1, t2, t3)?;
    }
    Ok(())
}

fn number_to_bool(v: &Value, z: Complex) -> Result<Value> {
    if z == Complex::new(0.0, 0.0) {
        Ok(Value::bool(false))
    } else if z == Complex::new(1.0, 0.0) {
        Ok(Value::bool(true))
    } else {
        Err(ConversionError::imprecise(v, "bool").into())
    }
}

fn number_to_int(v: &Value, z: Complex) -> Result<Value> {
    let exact = z.im == 0.0 && z.re.fract() == 0.0 && z.re >= -I64_END && z.re < I64_END;
    if exact {
        Ok(Value::int(z.re as i64))
    } else {
        Err(ConversionError::imprecise(v, "int").into())
    }
}

// Payload readers. They look at the payload, not the tag, so user subtypes
// of the built-ins convert as well.

fn integer(v: &Value, to: &str) -> Result<i64> {
    if let Some(&n) = v.downcast_ref::<i64>() {
        Ok(n)
    } else if let Some(&b) = v.downcast_ref::<bool>() {
        Ok(i64::from(b))
    } else {
        Err(mismatch(v, to))
    }
}

fn float(v: &Value, to: &str) -> Result<f64> {
    v.downcast_ref::<f64>().copied().ok_or_else(|| mismatch(v, to))
}

fn complex(v: &Value, to: &str) -> Result<Complex> {
    v.downcast_ref::<Complex>().copied().ok_or_else(|| mismatch(v, to))
}

fn mismatch(v: &Value, to: &str) -> crate::Error {
    ConversionError::NoConversion {
        from: format!("{v:?}"),
        to: to.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::TypeUniverse;
    use pretty_assertions::assert_eq;

    fn builtins() -> PromotionRegistry {
        let conversions = ConversionRegistry::new(TypeUniverse::shared());
        install_builtin_conversions(&conversions).unwrap();
        let promotions = PromotionRegistry::new(Arc::new(conversions));
        install_builtin_promotions(&promotions).unwrap();
        promotions
    }

    #[test]
    fn test_widening_conversions() {
        let promotions = builtins();
        let conversions = promotions.conversions();
        assert_eq!(conversions.convert(&Value::int(42), Ty::FLOAT).unwrap().as_float(), Some(42.0));
        assert_eq!(
            conversions.convert(&Value::float(1.5), Ty::COMPLEX).unwrap().as_complex(),
            Some(Complex::new(1.5, 0.0))
        );
        assert_eq!(conversions.convert(&Value::bool(true), Ty::INT).unwrap().as_int(), Some(1));
        assert_eq!(conversions.convert(&Value::bool(false), Ty::FLOAT).unwrap().as_float(), Some(0.0));
    }

    #[test]
    fn test_narrowing_checks_the_value() {
        let promotions = builtins();
        let conversions = promotions.conversions();
        assert_eq!(conversions.convert(&Value::float(3.0), Ty::INT).unwrap().as_int(), Some(3));
        assert_eq!(conversions.convert(&Value::complex(2.0, 0.0), Ty::INT).unwrap().as_int(), Some(2));
        assert_eq!(conversions.convert(&Value::int(1), Ty::BOOL).unwrap().as_bool(), Some(true));
        assert_eq!(conversions.convert(&Value::float(0.0), Ty::BOOL).unwrap().as_bool(), Some(false));

        let err = conversions.convert(&Value::float(1.5), Ty::INT).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert 1.5 exactly to 'int'");
        let err = conversions.convert(&Value::complex(1.0, 2.0), Ty::INT).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert (1+2j) exactly to 'int'");
        let err = conversions.convert(&Value::int(2), Ty::BOOL).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert 2 exactly to 'bool'");
        assert!(conversions.convert(&Value::float(1e300), Ty::INT).is_err());
        assert!(conversions.convert(&Value::float(f64::NAN), Ty::INT).is_err());
    }

    #[test]
    fn test_integral_round_trip() {
        let promotions = builtins();
        let conversions = promotions.conversions();
        for n in [-3_i64, 0, 1, 1 << 40] {
            let x = Value::int(n);
            let back = conversions
                .convert(&conversions.convert(&x, Ty::FLOAT).unwrap(), x.ty())
                .unwrap();
            assert_eq!(back.as_int(), Some(n));
        }
    }

    #[test]
    fn test_builtin_promotions() {
        let promotions = builtins().with_numeric_fast_path(false);
        let (x, y) = promotions.promote(&Value::int(1), &Value::float(2.0)).unwrap();
        assert_eq!(format!("{:?}", (x, y)), "(float(1.0), float(2.0))");

        let (x, y) = promotions.promote(&Value::complex(0.0, 1.0), &Value::bool(true)).unwrap();
        assert_eq!(format!("{:?}", (x, y)), "(complex(0+1j), complex(1+0j))");

        assert_eq!(promotions.promoted_type(Ty::BOOL, Ty::FLOAT).unwrap(), Ty::FLOAT);
        assert_eq!(promotions.promoted_type(Ty::COMPLEX, Ty::INT).unwrap(), Ty::COMPLEX);
    }

    #[test]
    fn test_promote_all_with_bool() {
        let promotions = builtins();
        let out = promotions
            .promote_all(&[Value::bool(true), Value::int(2), Value::float(3.0)])
            .unwrap();
        assert_eq!(format!("{:?}", out), "[float(1.0), float(2.0), float(3.0)]");
    }

    #[test]
    fn test_builtins_install_once() {
        let promotions = builtins();
        assert!(install_builtin_conversions(promotions.conversions()).is_err());
        assert!(install_builtin_promotions(&promotions).is_err());
    }
}
