use futures::stream::{BoxStream, Stream};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::access;
use crate::builder::CacheBuilder;
use crate::error::CacheError;
use crate::invalidate::Invalidator;
use crate::orchestrator::{CallOptions, Decision, Orchestrator};
use crate::store::Store;
use crate::value::Value;

static GLOBAL: Lazy<ReplayCache> = Lazy::new(ReplayCache::new);

/// High-level cache API binding one [`Store`] to the orchestrator, the
/// accessors and the invalidator.
///
/// Cloning a `ReplayCache` is cheap and shares the store. Independent caches
/// are created with [`ReplayCache::new`] or [`CacheBuilder`]; code that wants
/// a single process-wide cache can use [`ReplayCache::global`].
///
/// # Example
/// ```ignore
/// let cache = ReplayCache::new();
///
/// // The first call runs the request, later calls with an equal payload replay it.
/// let users = cache.run(
///     fetch_users(&filter),
///     "getUsers",
///     CallOptions::new().with_request(&filter)?,
/// );
/// ```
#[derive(Clone, Debug)]
pub struct ReplayCache {
    store: Arc<Store>,
    orchestrator: Orchestrator,
    invalidator: Invalidator,
}

impl ReplayCache {
    /// Create a cache with its own store and default configuration.
    pub fn new() -> Self {
        CacheBuilder::new().build()
    }

    /// Start configuring a cache.
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    /// The process-wide default cache.
    pub fn global() -> &'static ReplayCache {
        &GLOBAL
    }

    pub(crate) fn from_parts(
        store: Arc<Store>,
        orchestrator: Orchestrator,
        invalidator: Invalidator,
    ) -> Self {
        ReplayCache {
            store,
            orchestrator,
            invalidator,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    /// Run `producer` through the cache, see [`Orchestrator::run`].
    pub fn run<S, T, E>(
        &self,
        producer: S,
        key: &str,
        options: CallOptions,
    ) -> BoxStream<'static, Result<T, E>>
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: Serialize + DeserializeOwned + Send + 'static,
        E: From<CacheError> + Send + 'static,
    {
        self.orchestrator.run(producer, key, options)
    }

    /// The decision [`ReplayCache::run`] would take right now.
    pub fn decide(&self, key: &str, options: &CallOptions) -> Decision {
        self.orchestrator.decide(key, options)
    }

    /// Snapshot read, see [`access::get_value`].
    pub fn get_value(&self, key: &str) -> Value {
        access::get_value(&self.store, key)
    }

    /// Subscribe to a key (or the whole mapping with an empty key), see
    /// [`access::value_stream`].
    pub fn value_stream(&self, key: &str) -> BoxStream<'static, Value> {
        access::value_stream(&self.store, key)
    }

    /// Delete `keys`, or reset the store when `keys` is `None`.
    pub fn clear<K: AsRef<str>>(&self, keys: Option<&[K]>) {
        self.invalidator.clear(keys);
    }

    /// Delete the given keys.
    pub fn clear_keys<K: AsRef<str>>(&self, keys: &[K]) {
        self.invalidator.clear_keys(keys);
    }

    /// Reset the store.
    pub fn clear_all(&self) {
        self.invalidator.clear_all();
    }

    /// Clear `keys` (or their witness keys) whenever `upstream` succeeds, see
    /// [`Invalidator::clear_on_success`].
    pub fn clear_on_success<S, T, E, K>(
        &self,
        upstream: S,
        keys: &[K],
        include_witness: bool,
    ) -> BoxStream<'static, Result<T, E>>
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: 'static,
        E: 'static,
        K: AsRef<str>,
    {
        self.invalidator
            .clear_on_success(upstream, keys, include_witness)
    }
}

impl Default for ReplayCache {
    fn default() -> Self {
        Self::new()
    }
}
