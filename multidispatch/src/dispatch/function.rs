//! Generic functions: registration, resolution and invocation.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::index::{IndexError, OrderedIndex};
use crate::signature::Signature;
use crate::types::{Ty, TypeUniverse};
use crate::value::Value;
use crate::Result;

use super::cache::DispatchCache;
use super::result::DispatchError;

/// A resolved implementation.
pub type Method = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Builds an implementation for a concrete argument tuple. Receives the
/// concrete signature of the call and the return-type hint given at
/// registration.
pub type Factory = Arc<dyn Fn(&Signature, Option<Ty>) -> Result<Method> + Send + Sync>;

#[derive(Clone)]
enum Implementation {
    Direct(Method),
    Factory(Factory),
}

#[derive(Clone)]
struct Entry {
    implementation: Implementation,
    return_type: Option<Ty>,
}

/// Index and cache form a single locking domain: a registration updates
/// both atomically.
struct DispatchState {
    index: OrderedIndex<Entry>,
    cache: DispatchCache,
    /// Bumped by every registration; a resolution computed under an older
    /// generation is not written back to the cache.
    generation: u64,
}

/// A named collection of implementations selected by the runtime types of
/// all arguments.
///
/// # Example
///
/// ```
/// use multidispatch::{GenericFunction, Ty, TypeUniverse, Value};
///
/// let add = GenericFunction::new("add", TypeUniverse::shared());
/// add.register([Ty::INT, Ty::INT], |args: &[Value]| {
///     Ok(Value::int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0)))
/// })?;
/// let sum = add.call(&[Value::int(1), Value::int(2)])?;
/// assert_eq!(sum.as_int(), Some(3));
/// # Ok::<(), multidispatch::Error>(())
/// ```
pub struct GenericFunction {
    name: String,
    arity: Option<usize>,
    cache_enabled: bool,
    universe: Arc<TypeUniverse>,
    state: RwLock<DispatchState>,
}

impl GenericFunction {
    /// Create an unpopulated generic function.
    pub fn new(name: impl Into<String>, universe: Arc<TypeUniverse>) -> Self {
        Self {
            name: name.into(),
            arity: None,
            cache_enabled: true,
            universe,
            state: RwLock::new(DispatchState {
                index: OrderedIndex::new(),
                cache: DispatchCache::new(),
                generation: 0,
            }),
        }
    }

    /// Restrict registrations to signatures of exactly `arity` types.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Apply cache settings.
    pub fn with_cache_config(mut self, config: &CacheConfig) -> Self {
        self.cache_enabled = config.enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn universe(&self) -> &Arc<TypeUniverse> {
        &self.universe
    }

    // === Registration ===

    /// Register an implementation under `signature`.
    pub fn register<F>(&self, signature: impl Into<Signature>, implementation: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_method(signature, Arc::new(implementation))
    }

    /// Register an already shared implementation, e.g. the same callable
    /// under several signatures.
    pub fn register_method(&self, signature: impl Into<Signature>, method: Method) -> Result<()> {
        self.insert(
            signature.into(),
            Entry {
                implementation: Implementation::Direct(method),
                return_type: None,
            },
        )
    }

    /// Register an implementation with a return-type hint.
    pub fn register_returning<F>(
        &self,
        signature: impl Into<Signature>,
        return_type: Ty,
        implementation: F,
    ) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(
            signature.into(),
            Entry {
                implementation: Implementation::Direct(Arc::new(implementation)),
                return_type: Some(return_type),
            },
        )
    }

    /// Register the implementation used when no other signature matches.
    pub fn register_fallback<F>(&self, implementation: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(Signature::Any, implementation)
    }

    /// Register a factory. It runs the first time a concrete tuple resolves
    /// to `signature`; the callable it returns is cached for that tuple.
    pub fn register_factory<F>(
        &self,
        signature: impl Into<Signature>,
        return_type: Option<Ty>,
        factory: F,
    ) -> Result<()>
    where
        F: Fn(&Signature, Option<Ty>) -> Result<Method> + Send + Sync + 'static,
    {
        self.insert(
            signature.into(),
            Entry {
                implementation: Implementation::Factory(Arc::new(factory)),
                return_type,
            },
        )
    }

    fn insert(&self, signature: Signature, entry: Entry) -> Result<()> {
        if let (Some(expected), Some(found)) = (self.arity, signature.arity()) {
            if expected != found {
                return Err(DispatchError::ArityMismatch {
                    name: self.name.clone(),
                    call: self.render(&signature),
                    expected,
                }
                .into());
            }
        }

        let universe = &*self.universe;
        let mut guard = self.state.write();
        let state = &mut *guard;

        state
            .index
            .insert(signature.clone(), entry, universe)
            .map_err(|err| self.index_error(err, &signature))?;

        let subkeys: Vec<Signature> = state
            .index
            .descendants_of(&signature, universe)
            .into_iter()
            .filter(|sig| **sig != signature)
            .cloned()
            .collect();
        let evicted = state.cache.invalidate(&signature, &subkeys, universe);
        state.generation += 1;

        debug!(
            function = %self.name,
            signature = %self.render(&signature),
            evicted,
            "registered method"
        );
        Ok(())
    }

    // === Invocation ===

    /// Call with live arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let method = self.preview(args)?;
        method(args)
    }

    /// The callable a call with `args` would invoke, without invoking it.
    pub fn preview(&self, args: &[Value]) -> Result<Method> {
        let types: Vec<Ty> = args.iter().map(Value::ty).collect();
        self.preview_types(&types)
    }

    /// The callable for a concrete argument tuple.
    pub fn preview_types(&self, types: &[Ty]) -> Result<Method> {
        let (implementation, return_type, generation) = {
            let state = self.state.read();
            if let Some(method) = state.cache.get(types) {
                trace!(function = %self.name, "dispatch cache hit");
                return Ok(method);
            }
            let concrete = Signature::from(types);
            let (_, entry) = state
                .index
                .resolve(&concrete, &*self.universe)
                .map_err(|err| self.index_error(err, &concrete))?;
            (entry.implementation.clone(), entry.return_type, state.generation)
        };

        // No lock is held past this point: factories and implementations may
        // call back into this function.
        let method = match implementation {
            Implementation::Direct(method) => method,
            Implementation::Factory(factory) => {
                let concrete = Signature::from(types);
                debug!(
                    function = %self.name,
                    signature = %self.render(&concrete),
                    "materialising factory"
                );
                factory(&concrete, return_type)?
            }
        };

        if self.cache_enabled {
            let mut state = self.state.write();
            if state.generation == generation {
                trace!(function = %self.name, "dispatch cache fill");
                state.cache.insert(types.to_vec(), method.clone());
            }
        }
        Ok(method)
    }

    /// The registered signature a call with `types` resolves to.
    pub fn resolve_signature(&self, types: &[Ty]) -> Result<Signature> {
        let concrete = Signature::from(types);
        let state = self.state.read();
        let (matched, _) = state
            .index
            .resolve(&concrete, &*self.universe)
            .map_err(|err| self.index_error(err, &concrete))?;
        Ok(matched.clone())
    }

    // === Introspection ===

    /// Registered signatures in registration order. `Any` is listed only
    /// when a fallback is registered.
    pub fn list_registered(&self) -> Vec<Signature> {
        self.state.read().index.signatures().cloned().collect()
    }

    /// Whether exactly `signature` is registered.
    pub fn contains(&self, signature: &Signature) -> bool {
        self.state.read().index.contains(signature)
    }

    /// Number of registered signatures, fallback included.
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether at least one concrete signature is registered. A fallback
    /// alone does not count.
    pub fn is_populated(&self) -> bool {
        let state = self.state.read();
        state.index.len() > usize::from(state.index.has_fallback())
    }

    /// Concrete tuples currently cached.
    pub fn cached_signatures(&self) -> Vec<Vec<Ty>> {
        self.state.read().cache.signatures()
    }

    /// Outline of the signature index.
    pub fn pretty(&self) -> String {
        self.state.read().index.pretty(&self.name, &self.universe)
    }

    fn render(&self, signature: &Signature) -> String {
        signature.display(&self.name, &self.universe).to_string()
    }

    fn index_error(&self, err: IndexError, signature: &Signature) -> crate::Error {
        let name = self.name.clone();
        let err = match err {
            IndexError::DuplicateSignature(existing) => DispatchError::DuplicateSignature {
                name,
                call: self.render(&existing),
                signature: existing,
            },
            IndexError::NotFound(_) | IndexError::NoImplementation => DispatchError::NoImplementation {
                name,
                call: self.render(signature),
                types: signature.types().map(<[Ty]>::to_vec).unwrap_or_default(),
            },
            IndexError::Ambiguous(signatures) => DispatchError::AmbiguousDispatch {
                name,
                call: self.render(signature),
                candidates: signatures.iter().map(|s| self.render(s)).collect(),
                signatures,
            },
        };
        err.into()
    }
}

impl fmt::Debug for GenericFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<generic function {}() with {} methods>", self.name, self.len())
    }
}
