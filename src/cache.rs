//! Context-keyed component instance cache.
//!
//! Cached components are instantiated at most once per (domain, binding,
//! context) key, where the context is the active one: the annotations the
//! component and its dependencies actually accept. The map is sharded to keep
//! contention low when many threads instantiate different components at
//! once; each entry is a `OnceCell` so that concurrent callers for the same
//! key block on the first one and then observe its instance.
//!
//! In front of the instances sits a second map from the context defined at
//! the request to the active context it narrowed to. A request whose defined
//! context was seen before finds its instance without resolving the
//! component's dependencies again.

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

use ahash::RandomState;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::context::ComponentContext;
use crate::error::ResolutionResult;
use crate::instance::AnyArc;
use crate::key::TypeRef;

/// Number of shards. Powers of 2 work best for hash distribution.
const SHARD_COUNT: usize = 16;

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    domain: usize,
    source: usize,
    context: ComponentContext,
}

type Shard = HashMap<CacheKey, Arc<OnceCell<AnyArc>>, RandomState>;

/// Concurrent component cache.
///
/// `domain` identifies the container, `source` the binding within it. The
/// interface a component is requested through does not take part in the key,
/// so one instance serves every interface of its implementation.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{AnyArc, ComponentCache, ComponentContext, TypeRef};
/// use std::sync::Arc;
///
/// let cache = ComponentCache::new();
/// let context = ComponentContext::empty();
/// let api = TypeRef::of::<String>();
///
/// assert!(cache.peek(1, 7, &context, &api).is_none());
///
/// let first = cache
///     .lookup(1, 7, &context, &api, || Ok(Arc::new("value".to_string()) as AnyArc))
///     .unwrap();
/// let second = cache
///     .lookup(1, 7, &context, &api, || unreachable!())
///     .unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.len(), 1);
/// ```
pub struct ComponentCache {
    shards: Box<[RwLock<Shard>]>,
    /// Active context per defined context
    contexts: RwLock<HashMap<CacheKey, ComponentContext, RandomState>>,
    hasher: RandomState,
}

impl ComponentCache {
    pub fn new() -> Self {
        let hasher = RandomState::new();
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::with_hasher(hasher.clone())))
            .collect();
        ComponentCache {
            shards,
            contexts: RwLock::new(HashMap::with_hasher(hasher.clone())),
            hasher,
        }
    }

    /// Returns the cached instance, running `factory` on a miss.
    ///
    /// At most one `factory` runs per key at a time; callers arriving while it
    /// runs wait for its result. A failed `factory` leaves the entry empty so a
    /// later lookup tries again.
    pub fn lookup<F>(
        &self,
        domain: usize,
        source: usize,
        context: &ComponentContext,
        api: &TypeRef,
        factory: F,
    ) -> ResolutionResult<AnyArc>
    where
        F: FnOnce() -> ResolutionResult<AnyArc>,
    {
        let key = CacheKey {
            domain,
            source,
            context: context.clone(),
        };
        let shard = self.shard(&key);

        // Fast path: already published
        let existing = shard.read().get(&key).cloned();
        let cell = match existing {
            Some(cell) => {
                if let Some(value) = cell.get() {
                    return Ok(value.clone());
                }
                cell
            }
            None => shard.write().entry(key).or_default().clone(),
        };

        let value = cell.get_or_try_init(|| {
            tracing::trace!(api = %api, context = %context, "instantiating cached component");
            factory()
        })?;
        Ok(value.clone())
    }

    /// The cached instance, without instantiating on a miss.
    pub fn peek(
        &self,
        domain: usize,
        source: usize,
        context: &ComponentContext,
        api: &TypeRef,
    ) -> Option<AnyArc> {
        let key = CacheKey {
            domain,
            source,
            context: context.clone(),
        };
        let found = self.shard(&key).read().get(&key)?.get().cloned();
        if found.is_none() {
            tracing::trace!(api = %api, "component cache miss");
        }
        found
    }

    /// The active context `source` narrowed `defined` to when it was last
    /// resolved.
    pub fn active_context(
        &self,
        domain: usize,
        source: usize,
        defined: &ComponentContext,
    ) -> Option<ComponentContext> {
        let key = CacheKey {
            domain,
            source,
            context: defined.clone(),
        };
        self.contexts.read().get(&key).cloned()
    }

    /// Records the active context `source` narrowed `defined` to.
    pub fn remember(&self, domain: usize, source: usize, defined: &ComponentContext, active: &ComponentContext) {
        let key = CacheKey {
            domain,
            source,
            context: defined.clone(),
        };
        self.contexts.write().insert(key, active.clone());
    }

    /// Number of published instances.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().values().filter(|cell| cell.get().is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached instance and every known active context.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().clear();
        }
        self.contexts.write().clear();
    }

    fn shard(&self, key: &CacheKey) -> &RwLock<Shard> {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }
}

impl Default for ComponentCache {
    fn default() -> Self {
        Self::new()
    }
}
