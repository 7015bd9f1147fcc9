//! Dispatch errors.

use thiserror::Error;

use crate::signature::Signature;
use crate::types::Ty;

/// Failures of registration and dispatch on a generic function.
///
/// Every variant carries the function name and a rendered call shape
/// (`name(T1, T2)`) so messages are stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The exact signature is already registered.
    #[error("method {call} is already defined")]
    DuplicateSignature {
        name: String,
        call: String,
        signature: Signature,
    },

    /// Nothing matches the argument types and no fallback exists.
    #[error("no method found for {call}")]
    NoImplementation {
        name: String,
        call: String,
        types: Vec<Ty>,
    },

    /// More than one maximally specific signature matches.
    #[error("ambiguous dispatch for {call}: candidates are {}", .candidates.join(", "))]
    AmbiguousDispatch {
        name: String,
        call: String,
        /// Rendered candidates, in registration order.
        candidates: Vec<String>,
        signatures: Vec<Signature>,
    },

    /// A signature of the wrong length for a fixed-arity function.
    #[error("{name}() takes {expected} arguments, cannot register {call}")]
    ArityMismatch {
        name: String,
        call: String,
        expected: usize,
    },
}

impl DispatchError {
    /// Name of the generic function the error was raised by.
    pub fn function_name(&self) -> &str {
        match self {
            DispatchError::DuplicateSignature { name, .. }
            | DispatchError::NoImplementation { name, .. }
            | DispatchError::AmbiguousDispatch { name, .. }
            | DispatchError::ArityMismatch { name, .. } => name,
        }
    }
}
