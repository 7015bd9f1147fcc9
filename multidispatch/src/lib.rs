//! Runtime multiple dispatch.
//!
//! A [`GenericFunction`] holds implementations registered under type
//! [`Signature`]s and, when called, selects the most specific one from the
//! runtime types of all arguments. A companion conversion/promotion layer
//! ([`ConversionRegistry`], [`PromotionRegistry`]) unifies mismatched
//! argument types; the [`arithmetic`] operators use it as their fallback.
//!
//! # Algorithm Overview
//!
//! 1. Signatures are kept in an [`OrderedIndex`], the Hasse diagram of the
//!    elementwise subtype order over type tuples
//! 2. A call computes the argument types and checks the [`DispatchCache`]
//! 3. On a miss the index yields the unique minimal applicable signature,
//!    an ambiguity, or no implementation
//! 4. The resolved callable is cached; registering a new signature evicts
//!    exactly the entries it could now win
//!
//! # Module Structure
//!
//! - [`types`] - `Ty` handles and the `TypeUniverse`
//! - [`value`] - Dynamically typed values
//! - [`signature`] - Signatures and the `TypeOrder` trait
//! - [`index`] - The partial-order signature index
//! - [`dispatch`] - Generic functions and the dispatch cache
//! - [`conversion`] - Conversion and promotion registries
//! - [`arithmetic`] - Generic arithmetic operators
//! - [`config`] - TOML configuration
//!
//! # Example
//!
//! ```
//! use multidispatch::{Config, Context, Value};
//!
//! let cx = Context::new(Config::default())?;
//! let sum = cx.arithmetic().add(&Value::int(1), &Value::float(2.5))?;
//! assert_eq!(sum.as_float(), Some(3.5));
//!
//! let promoted = cx.promotions().promote_all(&[Value::bool(true), Value::int(2), Value::float(3.0)])?;
//! assert_eq!(format!("{:?}", promoted), "[float(1.0), float(2.0), float(3.0)]");
//! # Ok::<(), multidispatch::Error>(())
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

pub mod arithmetic;
pub mod config;
pub mod conversion;
pub mod dispatch;
pub mod index;
pub mod signature;
pub mod types;
pub mod value;

pub use arithmetic::{Arithmetic, BinaryOp};
pub use config::{CacheConfig, Config, ConfigError, PromotionConfig};
pub use conversion::{
    ConversionError, ConversionFn, ConversionRegistry, PromotionError, PromotionFn, PromotionRegistry,
};
pub use dispatch::{DispatchCache, DispatchError, Factory, GenericFunction, Method};
pub use index::{IndexError, NodeId, OrderedIndex};
pub use signature::{Signature, TypeOrder};
pub use types::{Ty, TypeError, TypeInfo, TypeUniverse};
pub use value::{Complex, Value};

/// Any failure raised by this crate or by registered implementations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Promotion(#[from] PromotionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Raised by the built-in arithmetic methods.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A type universe with its registries and arithmetic operators, configured
/// together.
pub struct Context {
    config: Config,
    universe: Arc<TypeUniverse>,
    conversions: Arc<ConversionRegistry>,
    promotions: Arc<PromotionRegistry>,
    arithmetic: Arithmetic,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let universe = TypeUniverse::shared();
        let conversions = Arc::new(ConversionRegistry::new(universe.clone()));
        if config.promotion.builtin_rules {
            conversion::install_builtin_conversions(&conversions)?;
        }

        let promotions = Arc::new(
            PromotionRegistry::new(conversions.clone())
                .with_numeric_fast_path(config.promotion.numeric_fast_path),
        );
        if config.promotion.builtin_rules {
            conversion::install_builtin_promotions(&promotions)?;
        }

        let arithmetic = Arithmetic::new(promotions.clone(), &config.cache)?;
        debug!(
            cache = config.cache.enabled,
            builtin_rules = config.promotion.builtin_rules,
            "context ready"
        );

        Ok(Self {
            config,
            universe,
            conversions,
            promotions,
            arithmetic,
        })
    }

    /// A new generic function over this context's universe, honouring the
    /// cache settings.
    pub fn generic(&self, name: impl Into<String>) -> GenericFunction {
        GenericFunction::new(name, self.universe.clone()).with_cache_config(&self.config.cache)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn universe(&self) -> &Arc<TypeUniverse> {
        &self.universe
    }

    pub fn conversions(&self) -> &Arc<ConversionRegistry> {
        &self.conversions
    }

    pub fn promotions(&self) -> &Arc<PromotionRegistry> {
        &self.promotions
    }

    pub fn arithmetic(&self) -> &Arithmetic {
        &self.arithmetic
    }
}
