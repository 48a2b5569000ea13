//! Read accessors over a [`Store`]: synchronous snapshots and replaying streams.

use futures::stream::BoxStream;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::store::Store;
use crate::value::{Map, Value};

/// Point-in-time read. Returns the live entry for `key` (no copy), the whole
/// mapping when `key` is empty, and [`Value::Undefined`] for absent keys.
pub fn get_value(store: &Store, key: &str) -> Value {
    store.read_snapshot(key)
}

/// Subscribe to the store.
///
/// With a `key`, every published mapping yields a deep copy of `mapping[key]`
/// (`Undefined` when the key is absent); the `Unset` sentinel yields nothing.
///
/// With an empty `key`, every published mapping is yielded as a shared
/// (uncopied) object.
///
/// The current state is replayed on subscription, then each later mutation is
/// yielded in order. A subscriber that falls more than [`Store::capacity`]
/// mutations behind skips the oldest ones and logs a warning. The stream only
/// ends when the store is reset; dropping it unsubscribes without touching
/// the store.
pub fn value_stream(store: &Store, key: &str) -> BoxStream<'static, Value> {
    let mappings = mappings(store);

    if key.is_empty() {
        return Box::pin(mappings.map(Value::Object));
    }

    let key = key.to_string();
    Box::pin(mappings.map(move |map| map.get(&key).map(Value::deep_clone).unwrap_or_default()))
}

fn mappings(store: &Store) -> impl tokio_stream::Stream<Item = Arc<Map>> + Send + 'static {
    let subscription = store.subscribe();
    let current = subscription.current.entries().cloned();

    let updates = BroadcastStream::new(subscription.updates).filter_map(|update| match update {
        Ok(map) => Some(map),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "value stream fell behind, skipping mappings");
            None
        }
    });

    tokio_stream::iter(current).chain(updates)
}
