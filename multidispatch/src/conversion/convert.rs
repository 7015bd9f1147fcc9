//! The conversion registry.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::signature::TypeOrder;
use crate::types::{Ty, TypeUniverse};
use crate::value::{self, Value};
use crate::Result;

/// Converts a value to the target type of its rule.
pub type ConversionFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Conversion failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// A rule for the pair already exists; rules are immutable once set.
    #[error("cannot overwrite conversion from {from} to {to}")]
    DuplicateConversion { from: String, to: String },

    /// No rule for the pair and `to` is not a supertype of `from`.
    #[error("cannot convert '{from}' to '{to}'")]
    NoConversion { from: String, to: String },

    /// The pair is convertible in general but not this value.
    #[error("cannot convert {value} exactly to '{to}'")]
    ImpreciseConversion { value: String, to: String },
}

impl ConversionError {
    /// Build an [`ImpreciseConversion`](Self::ImpreciseConversion) for `value`.
    pub fn imprecise(v: &Value, to: &str) -> Self {
        ConversionError::ImpreciseConversion {
            value: value::describe(v),
            to: to.to_string(),
        }
    }
}

/// Pairwise conversion functions keyed by `(from, to)`.
pub struct ConversionRegistry {
    universe: Arc<TypeUniverse>,
    rules: RwLock<IndexMap<(Ty, Ty), ConversionFn>>,
}

impl ConversionRegistry {
    pub fn new(universe: Arc<TypeUniverse>) -> Self {
        Self {
            universe,
            rules: RwLock::new(IndexMap::new()),
        }
    }

    pub fn universe(&self) -> &Arc<TypeUniverse> {
        &self.universe
    }

    /// Register the conversion `from -> to`.
    pub fn set_conversion<F>(&self, from: Ty, to: Ty, function: F) -> Result<()>
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        let mut rules = self.rules.write();
        if rules.contains_key(&(from, to)) {
            return Err(ConversionError::DuplicateConversion {
                from: self.universe.name(from).to_string(),
                to: self.universe.name(to).to_string(),
            }
            .into());
        }
        rules.insert((from, to), Arc::new(function));
        debug!(
            from = %self.universe.name(from),
            to = %self.universe.name(to),
            "registered conversion"
        );
        Ok(())
    }

    /// The function converting `from` to `to`. Without an exact rule, a
    /// conversion to a supertype is the identity.
    pub fn get_conversion(&self, from: Ty, to: Ty) -> Result<ConversionFn> {
        if let Some(function) = self.rules.read().get(&(from, to)) {
            return Ok(function.clone());
        }
        if self.universe.is_subtype(from, to) {
            return Ok(Arc::new(|value: &Value| -> Result<Value> { Ok(value.clone()) }));
        }
        Err(ConversionError::NoConversion {
            from: self.universe.name(from).to_string(),
            to: self.universe.name(to).to_string(),
        }
        .into())
    }

    /// Whether an exact rule exists for the pair.
    pub fn contains(&self, from: Ty, to: Ty) -> bool {
        self.rules.read().contains_key(&(from, to))
    }

    /// Convert `value` to `to`. Values already of type `to` are returned
    /// unchanged; imprecise conversions propagate.
    pub fn convert(&self, value: &Value, to: Ty) -> Result<Value> {
        if value.ty() == to {
            return Ok(value.clone());
        }
        let function = self.get_conversion(value.ty(), to)?;
        function(value)
    }

    /// Registered pairs in registration order.
    pub fn pairs(&self) -> Vec<(Ty, Ty)> {
        self.rules.read().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn registry() -> ConversionRegistry {
        let conversions = ConversionRegistry::new(TypeUniverse::shared());
        conversions
            .set_conversion(Ty::INT, Ty::FLOAT, |v: &Value| {
                Ok(Value::float(v.as_int().unwrap_or_default() as f64))
            })
            .unwrap();
        conversions
    }

    #[test]
    fn test_convert_with_rule() {
        let conversions = registry();
        let out = conversions.convert(&Value::int(42), Ty::FLOAT).unwrap();
        assert_eq!(out.as_float(), Some(42.0));
    }

    #[test]
    fn test_same_type_is_returned_unchanged() {
        let conversions = registry();
        let v = Value::float(1.5);
        assert!(conversions.convert(&v, Ty::FLOAT).unwrap().ptr_eq(&v));
    }

    #[test]
    fn test_supertype_conversion_is_identity() {
        let conversions = registry();
        let v = Value::bool(true);
        let out = conversions.convert(&v, Ty::OBJECT).unwrap();
        assert!(out.ptr_eq(&v));
        assert_eq!(out.ty(), Ty::BOOL);
    }

    #[test]
    fn test_missing_conversion() {
        let conversions = registry();
        let err = conversions.convert(&Value::str("42"), Ty::FLOAT).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert 'str' to 'float'");
        assert!(matches!(
            err,
            Error::Conversion(ConversionError::NoConversion { .. })
        ));
    }

    #[test]
    fn test_rules_are_immutable() {
        let conversions = registry();
        let err = conversions
            .set_conversion(Ty::INT, Ty::FLOAT, |v: &Value| Ok(v.clone()))
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot overwrite conversion from int to float");
        assert_eq!(conversions.pairs(), vec![(Ty::INT, Ty::FLOAT)]);
    }

    #[test]
    fn test_imprecise_conversion_propagates() {
        let conversions = registry();
        conversions
            .set_conversion(Ty::FLOAT, Ty::INT, |v: &Value| {
                let x = v.as_float().unwrap_or_default();
                if x.fract() == 0.0 {
                    Ok(Value::int(x as i64))
                } else {
                    Err(ConversionError::imprecise(v, "int").into())
                }
            })
            .unwrap();

        assert_eq!(conversions.convert(&Value::float(2.0), Ty::INT).unwrap().as_int(), Some(2));
        let err = conversions.convert(&Value::float(1.5), Ty::INT).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert 1.5 exactly to 'int'");
    }
}
