//! Type conversion and promotion.
//!
//! Conversions are one-directional, possibly value-dependent functions
//! keyed by `(from, to)`. Promotions map a pair of values to a common
//! representation and are usually derived from two conversions with
//! [`PromotionRegistry::set_promotion_rule`].
//!
//! ```text
//! set_promotion_rule(int, float, float)
//!     (int, float) -> (convert(x, float), y)
//!     (float, int) -> (x, convert(y, float))
//! ```
//!
//! # Module Structure
//!
//! - [`convert`] - `ConversionRegistry` and `ConversionError`
//! - [`promote`] - `PromotionRegistry` and `PromotionError`
//! - [`rules`] - Built-in numeric conversion and promotion rules

mod convert;
mod promote;
mod rules;

pub use convert::{ConversionError, ConversionFn, ConversionRegistry};
pub use promote::{PromotionError, PromotionFn, PromotionRegistry};
pub use rules::{install_builtin_conversions, install_builtin_promotions};
