//! replay-cache - A request-deduplicating replay cache for asynchronous producers
//!
//! This library wraps a producer (typically an HTTP call modelled as a
//! `Stream` of results) and avoids re-running it for identical requests:
//! - Results are stored under a cache key together with a copy of the request
//!   that produced them (the request witness)
//! - Calls with no request, or a structurally equal request, replay the stored
//!   value as a stream
//! - A force flag always calls the producer and overwrites the stored value
//! - Keys can be invalidated directly or whenever another call succeeds
//!
//! # Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use replay_cache::{CallOptions, ReplayCache};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = ReplayCache::new();
//!
//!     // First call: the producer runs and its result is stored under "getUser".
//!     let user = cache
//!         .run(fetch_user(42), "getUser", CallOptions::new().request(42))
//!         .next()
//!         .await;
//!
//!     // Same request: the stored result is replayed, `fetch_user` is not polled.
//!     let again = cache
//!         .run(fetch_user(42), "getUser", CallOptions::new().request(42))
//!         .next()
//!         .await;
//! }
//! ```

mod access;
mod builder;
mod cache;
mod equal;
mod error;
mod invalidate;
mod metrics;
mod orchestrator;
mod store;
mod utils;
mod value;

// Re-export public API
pub use access::{get_value, value_stream};
pub use builder::CacheBuilder;
pub use cache::ReplayCache;
pub use equal::equal;
pub use error::CacheError;
pub use invalidate::{ClearOnSuccessExt, Invalidator};
pub use metrics::{CacheEvent, MetricsSink};
pub use orchestrator::{CallOptions, Decision, Orchestrator};
pub use store::{DEFAULT_NOTIFICATION_CAPACITY, Store, StoreState, Subscription};
pub use utils::{DEFAULT_WITNESS_PREFIX, witness_key};
pub use value::{Map, Number, Value};
