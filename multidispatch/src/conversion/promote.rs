//! The promotion registry.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, trace};

use crate::signature::TypeOrder;
use crate::types::{Ty, TypeUniverse};
use crate::value::Value;
use crate::Result;

use super::convert::ConversionRegistry;

/// Maps a pair of values to a pair of values of one common type.
pub type PromotionFn = Arc<dyn Fn(&Value, &Value) -> Result<(Value, Value)> + Send + Sync>;

/// Promotion failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionError {
    /// A rule for the pair (or its reverse, for symmetric rules) exists.
    #[error(
        "cannot overwrite promotion rule ({first}, {second}){}",
        .out.as_ref().map(|t| format!(" --> {t}")).unwrap_or_default()
    )]
    DuplicatePromotion {
        first: String,
        second: String,
        out: Option<String>,
    },

    /// No rule applies to the pair or any pair of supertypes.
    #[error("no promotion rule found for {first} and {second}")]
    NoPromotion { first: String, second: String },

    /// Several supertype pairs carry a rule.
    #[error("ambiguous promotion found for {first} and {second}: candidates are {}", .candidates.join(", "))]
    AmbiguousPromotion {
        first: String,
        second: String,
        candidates: Vec<String>,
    },
}

#[derive(Clone)]
struct Rule {
    function: PromotionFn,
    out_type: Option<Ty>,
}

/// Pairwise promotion functions keyed by `(T1, T2)`.
pub struct PromotionRegistry {
    universe: Arc<TypeUniverse>,
    conversions: Arc<ConversionRegistry>,
    numeric_fast_path: bool,
    rules: RwLock<IndexMap<(Ty, Ty), Rule>>,
}

impl PromotionRegistry {
    pub fn new(conversions: Arc<ConversionRegistry>) -> Self {
        Self {
            universe: conversions.universe().clone(),
            conversions,
            numeric_fast_path: true,
            rules: RwLock::new(IndexMap::new()),
        }
    }

    /// Enable or disable the built-in `int`/`float` widening in [`promote`](Self::promote).
    pub fn with_numeric_fast_path(mut self, enabled: bool) -> Self {
        self.numeric_fast_path = enabled;
        self
    }

    pub fn conversions(&self) -> &Arc<ConversionRegistry> {
        &self.conversions
    }

    // === Registration ===

    /// Promote `(T1, T2)` and `(T2, T1)` by converting both sides to `T3`.
    ///
    /// The conversions `T1 -> T3` and `T2 -> T3` are looked up now, so they
    /// must be registered first (conversions to a supertype are implicit).
    pub fn set_promotion_rule(&self, t1: Ty, t2: Ty, t3: Ty) -> Result<()> {
        let convert13 = self.conversions.get_conversion(t1, t3)?;
        let convert23 = self.conversions.get_conversion(t2, t3)?;

        let mut rules = self.rules.write();
        if rules.contains_key(&(t1, t2)) || rules.contains_key(&(t2, t1)) {
            return Err(self.duplicate(t1, t2, Some(t3)).into());
        }

        let direct: PromotionFn = if t1 == t3 && t2 == t3 {
            Arc::new(|x: &Value, y: &Value| -> Result<(Value, Value)> {
                Ok((x.clone(), y.clone()))
            })
        } else {
            let (c13, c23) = (convert13.clone(), convert23.clone());
            Arc::new(move |x: &Value, y: &Value| -> Result<(Value, Value)> {
                Ok((c13(x)?, c23(y)?))
            })
        };
        rules.insert(
            (t1, t2),
            Rule {
                function: direct,
                out_type: Some(t3),
            },
        );

        if t1 != t2 {
            let reverse: PromotionFn = Arc::new(move |x: &Value, y: &Value| -> Result<(Value, Value)> {
                Ok((convert23(x)?, convert13(y)?))
            });
            rules.insert(
                (t2, t1),
                Rule {
                    function: reverse,
                    out_type: Some(t3),
                },
            );
        }

        debug!(
            first = %self.universe.name(t1),
            second = %self.universe.name(t2),
            out = %self.universe.name(t3),
            "registered promotion rule"
        );
        Ok(())
    }

    /// Register a custom promotion for `(T1, T2)`. When `symmetric`, the
    /// `(T2, T1)` entry calls `function` with swapped arguments and swaps
    /// the outputs back. `out_type` is reported by
    /// [`promoted_type`](Self::promoted_type).
    pub fn set_promotion<F>(
        &self,
        t1: Ty,
        t2: Ty,
        symmetric: bool,
        out_type: Option<Ty>,
        function: F,
    ) -> Result<()>
    where
        F: Fn(&Value, &Value) -> Result<(Value, Value)> + Send + Sync + 'static,
    {
        let mut rules = self.rules.write();
        let reverse_taken = symmetric && t1 != t2 && rules.contains_key(&(t2, t1));
        if rules.contains_key(&(t1, t2)) || reverse_taken {
            return Err(self.duplicate(t1, t2, out_type).into());
        }

        let function: PromotionFn = Arc::new(function);
        if symmetric && t1 != t2 {
            let forward = function.clone();
            let reverse: PromotionFn = Arc::new(move |x: &Value, y: &Value| -> Result<(Value, Value)> {
                let (b, a) = forward(y, x)?;
                Ok((a, b))
            });
            rules.insert(
                (t2, t1),
                Rule {
                    function: reverse,
                    out_type,
                },
            );
        }
        rules.insert((t1, t2), Rule { function, out_type });

        debug!(
            first = %self.universe.name(t1),
            second = %self.universe.name(t2),
            symmetric,
            "registered promotion"
        );
        Ok(())
    }

    // === Lookup ===

    /// The promotion function for `(T1, T2)`.
    ///
    /// Without an exact rule, identical types promote to themselves; other
    /// pairs search the cartesian product of both ancestor chains for the
    /// most specific pair carrying a rule.
    pub fn get_promotion(&self, t1: Ty, t2: Ty) -> Result<PromotionFn> {
        let rules = self.rules.read();
        if let Some(rule) = rules.get(&(t1, t2)) {
            return Ok(rule.function.clone());
        }
        if t1 == t2 {
            return Ok(Arc::new(|x: &Value, y: &Value| -> Result<(Value, Value)> {
                Ok((x.clone(), y.clone()))
            }));
        }
        let pair = self.search(&rules, t1, t2)?;
        Ok(rules[&pair].function.clone())
    }

    /// Find the single rule key covering `(T1, T2)` through supertypes.
    ///
    /// A candidate is dropped when another candidate is elementwise at
    /// least as specific, so `(bool, float)` shadows `(int, float)` for a
    /// `bool` paired with a subtype of `float`. Candidates left over after
    /// that are incomparable and the lookup is ambiguous.
    fn search(&self, rules: &IndexMap<(Ty, Ty), Rule>, t1: Ty, t2: Ty) -> Result<(Ty, Ty)> {
        let mut valid: Vec<(Ty, Ty)> = Vec::new();
        for ti in self.universe.ancestors(t1) {
            for tj in self.universe.ancestors(t2) {
                if rules.contains_key(&(ti, tj)) && !valid.contains(&(tj, ti)) {
                    valid.push((ti, tj));
                }
            }
        }

        let universe = &self.universe;
        let shadows = |a: (Ty, Ty), b: (Ty, Ty)| {
            a != b && universe.is_subtype(a.0, b.0) && universe.is_subtype(a.1, b.1)
        };
        let specific: Vec<(Ty, Ty)> = valid
            .iter()
            .copied()
            .filter(|&pair| !valid.iter().any(|&other| shadows(other, pair)))
            .collect();

        match specific.as_slice() {
            [] => Err(PromotionError::NoPromotion {
                first: self.universe.name(t1).to_string(),
                second: self.universe.name(t2).to_string(),
            }
            .into()),
            [pair] => {
                trace!(
                    first = %self.universe.name(t1),
                    second = %self.universe.name(t2),
                    via_first = %self.universe.name(pair.0),
                    via_second = %self.universe.name(pair.1),
                    "promotion found through supertypes"
                );
                Ok(*pair)
            }
            _ => Err(PromotionError::AmbiguousPromotion {
                first: self.universe.name(t1).to_string(),
                second: self.universe.name(t2).to_string(),
                candidates: specific
                    .iter()
                    .map(|&(a, b)| format!("({}, {})", self.universe.name(a), self.universe.name(b)))
                    .collect(),
            }
            .into()),
        }
    }

    /// Whether an exact rule exists for the ordered pair.
    pub fn contains(&self, t1: Ty, t2: Ty) -> bool {
        self.rules.read().contains_key(&(t1, t2))
    }

    /// Registered ordered pairs, in registration order.
    pub fn pairs(&self) -> Vec<(Ty, Ty)> {
        self.rules.read().keys().copied().collect()
    }

    // === Promotion ===

    /// Promote two values to a common type.
    pub fn promote(&self, x: &Value, y: &Value) -> Result<(Value, Value)> {
        let (t1, t2) = (x.ty(), y.ty());
        if t1 == t2 {
            return Ok((x.clone(), y.clone()));
        }
        if self.numeric_fast_path {
            match (x.as_int(), y.as_float(), x.as_float(), y.as_int()) {
                (Some(a), Some(_), _, _) => return Ok((Value::float(a as f64), y.clone())),
                (_, _, Some(_), Some(b)) => return Ok((x.clone(), Value::float(b as f64))),
                _ => {}
            }
        }
        let function = self.get_promotion(t1, t2)?;
        function(x, y)
    }

    /// Promote any number of values to a mutually consistent type.
    ///
    /// A forward pass promotes each value against the running result; a
    /// backward pass then re-promotes every earlier element against its
    /// now promoted right neighbour.
    pub fn promote_all(&self, values: &[Value]) -> Result<Vec<Value>> {
        let mut iter = values.iter();
        let Some(first) = iter.next() else {
            return Ok(Vec::new());
        };

        let mut out = vec![first.clone()];
        for x in iter {
            let last = out.len() - 1;
            let (x, y) = self.promote(x, &out[last])?;
            out[last] = y;
            out.push(x);
        }

        for i in (0..out.len().saturating_sub(1)).rev() {
            let (x, y) = self.promote(&out[i], &out[i + 1])?;
            out[i] = x;
            out[i + 1] = y;
        }
        Ok(out)
    }

    /// The type `(T1, T2)` promotes to: the declared output type of the
    /// rule, else the larger of two ordered types, else the output type of
    /// the rule [`get_promotion`](Self::get_promotion) finds through
    /// supertypes.
    pub fn promoted_type(&self, t1: Ty, t2: Ty) -> Result<Ty> {
        let rules = self.rules.read();
        if let Some(out) = rules.get(&(t1, t2)).and_then(|rule| rule.out_type) {
            return Ok(out);
        }
        if self.universe.is_subtype(t1, t2) {
            return Ok(t2);
        }
        if self.universe.is_subtype(t2, t1) {
            return Ok(t1);
        }
        let pair = self.search(&rules, t1, t2)?;
        rules[&pair].out_type.ok_or_else(|| {
            PromotionError::NoPromotion {
                first: self.universe.name(t1).to_string(),
                second: self.universe.name(t2).to_string(),
            }
            .into()
        })
    }

    fn duplicate(&self, t1: Ty, t2: Ty, out: Option<Ty>) -> PromotionError {
        PromotionError::DuplicatePromotion {
            first: self.universe.name(t1).to_string(),
            second: self.universe.name(t2).to_string(),
            out: out.map(|t| self.universe.name(t).to_string()),
        }
    }
}
