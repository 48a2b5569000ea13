//! Builder API for configuring cache instances.

use std::sync::Arc;

use crate::cache::ReplayCache;
use crate::invalidate::Invalidator;
use crate::metrics::{Metrics, MetricsSink};
use crate::orchestrator::Orchestrator;
use crate::store::{DEFAULT_NOTIFICATION_CAPACITY, Store};
use crate::utils::DEFAULT_WITNESS_PREFIX;

/// Builder for [`ReplayCache`] instances.
///
/// # Example
///
/// ```ignore
/// use replay_cache::CacheBuilder;
/// use std::sync::Arc;
///
/// let store = Arc::new(Store::new());
///
/// // Two caches over the same store, with a custom witness prefix.
/// let users = CacheBuilder::new().store(store.clone()).witness_prefix("request:").build();
/// let orders = CacheBuilder::new().store(store).witness_prefix("request:").build();
/// ```
pub struct CacheBuilder {
    store: Option<Arc<Store>>,
    notification_capacity: usize,
    witness_prefix: String,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl CacheBuilder {
    /// Create a new CacheBuilder with default settings.
    pub fn new() -> Self {
        CacheBuilder {
            store: None,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            witness_prefix: DEFAULT_WITNESS_PREFIX.to_string(),
            metrics: None,
        }
    }

    /// Use an existing store instead of creating a new one.
    pub fn store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// How many notifications a slow subscriber may fall behind before it
    /// skips the oldest. Ignored when an existing store is supplied.
    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Prefix of the request-witness keys. Defaults to `"req"`.
    pub fn witness_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.witness_prefix = prefix.into();
        self
    }

    /// Send cache events to `sink`.
    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Build the cache.
    pub fn build(self) -> ReplayCache {
        let capacity = self.notification_capacity;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(Store::with_capacity(capacity)));
        let witness_prefix: Arc<str> = Arc::from(self.witness_prefix);
        let metrics = Metrics::new(self.metrics);

        let orchestrator = Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&witness_prefix),
            metrics.clone(),
        );
        let invalidator = Invalidator::new(Arc::clone(&store), witness_prefix, metrics);
        ReplayCache::from_parts(store, orchestrator, invalidator)
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
