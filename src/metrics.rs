//! Observer hook for cache decisions and store mutations.
//!
//! Install a [`MetricsSink`] through [`crate::CacheBuilder::metrics`] to
//! receive a [`CacheEvent`] for every hit, miss, write-through and
//! invalidation.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::{Arc, Mutex};
//! use replay_cache::{CacheBuilder, CacheEvent, MetricsSink};
//!
//! struct BufferedSink {
//!     buffer: Mutex<Vec<CacheEvent>>,
//! }
//!
//! impl MetricsSink for BufferedSink {
//!     fn emit(&self, event: CacheEvent) {
//!         self.buffer.lock().unwrap().push(event);
//!     }
//! }
//!
//! let sink = Arc::new(BufferedSink { buffer: Mutex::new(Vec::new()) });
//! let cache = CacheBuilder::new().metrics(sink.clone()).build();
//! ```

use std::fmt;
use std::sync::Arc;

/// Events emitted by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A call was answered by replaying the stored value.
    Hit {
        /// The cache key.
        key: String,
    },
    /// A call went to the producer.
    Miss {
        /// The cache key.
        key: String,
        /// Whether the call was forced by the caller.
        forced: bool,
    },
    /// A producer emission was written through to the store.
    Write {
        /// The keys written in the batch (result key, and witness key when present).
        keys: Vec<String>,
    },
    /// Keys were deleted from the store.
    Clear {
        /// The deleted keys.
        keys: Vec<String>,
    },
    /// The store was reset.
    Reset {
        /// The generation the store moved to.
        generation: u64,
    },
}

/// Trait for receiving cache events.
///
/// Called synchronously in the hot path; implementations should be cheap
/// (e.g. buffer in memory or bump counters).
pub trait MetricsSink: Send + Sync {
    /// Emit a single event.
    fn emit(&self, event: CacheEvent);
}

/// Optional sink shared by the orchestrator and the invalidator.
#[derive(Clone, Default)]
pub(crate) struct Metrics {
    sink: Option<Arc<dyn MetricsSink>>,
}

impl Metrics {
    pub(crate) fn new(sink: Option<Arc<dyn MetricsSink>>) -> Self {
        Metrics { sink }
    }

    pub(crate) fn emit(&self, event: CacheEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}
