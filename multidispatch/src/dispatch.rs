//! Runtime multiple dispatch.
//!
//! A [`GenericFunction`] is a named collection of implementations, each
//! registered under a [`Signature`](crate::Signature). Calling it selects the
//! implementation from the runtime types of *all* arguments.
//!
//! # Algorithm Overview
//!
//! 1. **Type the call**: map every argument to its runtime type
//! 2. **Check the cache**: a previously resolved concrete tuple is reused
//! 3. **Resolve**: on a miss, find the unique most specific registered
//!    signature in the [`OrderedIndex`](crate::OrderedIndex), or report an
//!    ambiguity / missing implementation
//! 4. **Materialise**: factories build the callable for the concrete tuple
//! 5. **Fill the cache** and invoke
//!
//! Registration evicts exactly the cache entries a new, more specific
//! signature could now win.
//!
//! # Module Structure
//!
//! - [`result`] - Dispatch errors
//! - [`cache`] - The concrete-signature cache
//! - [`function`] - `GenericFunction` itself

mod cache;
mod function;
mod result;

pub use cache::DispatchCache;
pub use function::{Factory, GenericFunction, Method};
pub use result::DispatchError;
