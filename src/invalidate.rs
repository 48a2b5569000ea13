use futures::StreamExt;
use futures::stream::{BoxStream, Stream};
use std::sync::Arc;

use crate::metrics::{CacheEvent, Metrics};
use crate::store::Store;
use crate::utils::invalidation_targets;

/// Deletes keys from a [`Store`], or resets it entirely.
#[derive(Clone, Debug)]
pub struct Invalidator {
    store: Arc<Store>,
    witness_prefix: Arc<str>,
    metrics: Metrics,
}

impl Invalidator {
    pub(crate) fn new(store: Arc<Store>, witness_prefix: Arc<str>, metrics: Metrics) -> Self {
        Invalidator {
            store,
            witness_prefix,
            metrics,
        }
    }

    /// Delete `keys` from the store, or reset the store when `keys` is `None`.
    ///
    /// Deleting absent keys is a silent no-op (the store still notifies once).
    pub fn clear<K: AsRef<str>>(&self, keys: Option<&[K]>) {
        match keys {
            Some(keys) => self.clear_keys(keys),
            None => self.clear_all(),
        }
    }

    /// Delete the given keys with a single store notification.
    pub fn clear_keys<K: AsRef<str>>(&self, keys: &[K]) {
        self.store.delete_keys(keys);
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        tracing::debug!(keys = ?keys, "cleared cache keys");
        self.metrics.emit(CacheEvent::Clear { keys });
    }

    /// Reset the store: empty mapping, fresh notification channel.
    pub fn clear_all(&self) {
        let generation = self.store.reset();
        tracing::debug!(generation, "cleared cache store");
        self.metrics.emit(CacheEvent::Reset { generation });
    }

    /// Pipeline stage that clears keys each time `upstream` yields `Ok`.
    ///
    /// With `include_witness` the request-witness keys paired with `keys` are
    /// cleared instead of `keys` themselves. Errors pass through without
    /// clearing anything, and every item is forwarded unchanged.
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
        let targets = invalidation_targets(&self.witness_prefix, keys, include_witness);
        let invalidator = self.clone();
        Box::pin(upstream.inspect(move |item| {
            if item.is_ok() {
                invalidator.clear_keys(&targets);
            }
        }))
    }
}

/// Adds [`Invalidator::clear_on_success`] as a combinator on result streams.
///
/// # Example
/// ```ignore
/// let saved = save_user(user)
///     .clear_on_success(&cache.invalidator(), &["getUsers"], true);
/// ```
pub trait ClearOnSuccessExt<T, E>: Stream<Item = Result<T, E>> + Sized {
    fn clear_on_success<K: AsRef<str>>(
        self,
        invalidator: &Invalidator,
        keys: &[K],
        include_witness: bool,
    ) -> BoxStream<'static, Result<T, E>>;
}

impl<S, T, E> ClearOnSuccessExt<T, E> for S
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: 'static,
    E: 'static,
{
    fn clear_on_success<K: AsRef<str>>(
        self,
        invalidator: &Invalidator,
        keys: &[K],
        include_witness: bool,
    ) -> BoxStream<'static, Result<T, E>> {
        invalidator.clear_on_success(self, keys, include_witness)
    }
}
