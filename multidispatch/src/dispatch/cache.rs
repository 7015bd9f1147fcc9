//! Memoised resolution of concrete argument tuples.

use rustc_hash::FxHashMap;

use crate::signature::{Signature, TypeOrder};
use crate::types::Ty;

use super::function::Method;

/// Maps concrete runtime type tuples to resolved callables.
///
/// Entries are created on the first call with a given tuple and removed only
/// by [`invalidate`](Self::invalidate) when a registration could change the
/// answer.
#[derive(Default, Clone)]
pub struct DispatchCache {
    entries: FxHashMap<Vec<Ty>, Method>,
}

impl DispatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, types: &[Ty]) -> Option<Method> {
        self.entries.get(types).cloned()
    }

    pub fn insert(&mut self, types: Vec<Ty>, method: Method) {
        self.entries.insert(types, method);
    }

    /// Evict entries that a newly registered `signature` could now win.
    ///
    /// An entry under `signature` is kept when it also falls under one of
    /// `subkeys`, the already-registered signatures strictly below
    /// `signature`: those were at least as specific before the registration
    /// and still are. Returns the number of evicted entries.
    pub fn invalidate<O>(&mut self, signature: &Signature, subkeys: &[Signature], order: &O) -> usize
    where
        O: TypeOrder + ?Sized,
    {
        let before = self.entries.len();
        self.entries.retain(|types, _| {
            !order.accepts(signature, types) || subkeys.iter().any(|k| order.accepts(k, types))
        });
        before - self.entries.len()
    }

    /// Cached tuples, sorted for stable output.
    pub fn signatures(&self) -> Vec<Vec<Ty>> {
        let mut keys: Vec<Vec<Ty>> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
