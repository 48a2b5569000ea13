use futures::StreamExt;
use futures::stream::{BoxStream, Stream};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::access::value_stream;
use crate::equal::equal;
use crate::error::CacheError;
use crate::metrics::{CacheEvent, Metrics};
use crate::store::Store;
use crate::utils::witness_key;
use crate::value::Value;

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Always call the producer and overwrite the stored value.
    pub force: bool,
    /// Payload the result depends on. The cached result is only replayed
    /// while a structurally equal payload is passed.
    pub request: Option<Value>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the force flag.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Attach a request payload.
    pub fn request(mut self, request: impl Into<Value>) -> Self {
        self.request = Some(request.into());
        self
    }

    /// Attach any serializable request payload.
    pub fn with_request<R: Serialize + ?Sized>(mut self, request: &R) -> Result<Self, CacheError> {
        self.request = Some(Value::from_serialize(request)?);
        Ok(self)
    }

    /// The request payload if it takes part in caching.
    ///
    /// A falsy payload (`null`, `false`, `0`, `""`...) counts as no payload.
    fn effective_request(&self) -> Option<&Value> {
        self.request.as_ref().filter(|request| request.is_truthy())
    }
}

/// Outcome of the hit/miss decision for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Replay the stored value.
    Replay,
    /// Call the producer and write its emission through to the store.
    LiveCall {
        /// Whether the call was forced by the caller.
        forced: bool,
    },
}

/// The cache decision engine.
///
/// Decides once per call whether to replay the stored value or to call the
/// producer, and writes producer emissions through to the store.
#[derive(Clone, Debug)]
pub struct Orchestrator {
    store: Arc<Store>,
    witness_prefix: Arc<str>,
    metrics: Metrics,
}

impl Orchestrator {
    pub(crate) fn new(store: Arc<Store>, witness_prefix: Arc<str>, metrics: Metrics) -> Self {
        Orchestrator {
            store,
            witness_prefix,
            metrics,
        }
    }

    /// Decide between replay and live call against the current store state.
    pub fn decide(&self, key: &str, options: &CallOptions) -> Decision {
        if options.force {
            return Decision::LiveCall { forced: true };
        }

        let hit = match options.effective_request() {
            Some(request) => {
                let witness = self
                    .store
                    .read_snapshot(&witness_key(&self.witness_prefix, key));
                equal(request, &witness)
            }
            None => self.store.read_snapshot(key).is_truthy(),
        };

        if hit {
            Decision::Replay
        } else {
            Decision::LiveCall { forced: false }
        }
    }

    /// Run `producer` through the cache under `key`.
    ///
    /// On a hit the returned stream replays the stored value, decoded into
    /// `T`, and keeps yielding it after every store mutation until the store is
    /// reset. On a miss the producer is returned with a write-through stage:
    /// each `Ok` emission is stored under `key` (together with a copy of the
    /// request under its witness key, in the same batch) before being
    /// forwarded unchanged. Errors and empty completions are forwarded and
    /// leave the store untouched.
    ///
    /// The decision is taken now, not when the stream is first polled.
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
        match self.decide(key, &options) {
            Decision::Replay => {
                tracing::debug!(key, "cache hit, replaying stored value");
                self.metrics.emit(CacheEvent::Hit {
                    key: key.to_string(),
                });
                self.replay(key)
            }
            Decision::LiveCall { forced } => {
                tracing::debug!(key, forced, "cache miss, calling producer");
                self.metrics.emit(CacheEvent::Miss {
                    key: key.to_string(),
                    forced,
                });
                self.live_call(producer, key, options)
            }
        }
    }

    fn replay<T, E>(&self, key: &str) -> BoxStream<'static, Result<T, E>>
    where
        T: DeserializeOwned + Send + 'static,
        E: From<CacheError> + Send + 'static,
    {
        let owned_key = key.to_string();
        Box::pin(value_stream(&self.store, key).map(move |value| {
            value
                .deserialize_into::<T>()
                .map_err(|err| E::from(CacheError::decode(owned_key.as_str(), err.to_string())))
        }))
    }

    fn live_call<S, T, E>(
        &self,
        producer: S,
        key: &str,
        options: CallOptions,
    ) -> BoxStream<'static, Result<T, E>>
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Send + 'static,
    {
        let witness = options
            .effective_request()
            .map(|request| (witness_key(&self.witness_prefix, key), request.clone()));
        let writer = WriteThrough {
            store: Arc::clone(&self.store),
            metrics: self.metrics.clone(),
            key: key.to_string(),
            witness,
        };

        Box::pin(producer.inspect(move |item| {
            if let Ok(value) = item {
                writer.write(value);
            }
        }))
    }
}

/// Stores producer emissions for one live call.
struct WriteThrough {
    store: Arc<Store>,
    metrics: Metrics,
    key: String,
    witness: Option<(String, Value)>,
}

impl WriteThrough {
    fn write<T: Serialize>(&self, value: &T) {
        // Encoding builds fresh containers, so the stored value shares nothing
        // with the emission.
        let encoded = match Value::from_serialize(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(
                    key = self.key.as_str(),
                    error = %err,
                    "failed to encode producer emission, skipping cache write"
                );
                return;
            }
        };

        let mut batch = Vec::with_capacity(2);
        if let Some((witness_key, request)) = &self.witness {
            batch.push((witness_key.clone(), request.deep_clone()));
        }
        batch.push((self.key.clone(), encoded));

        let keys: Vec<String> = batch.iter().map(|(k, _)| k.clone()).collect();
        self.store.write(batch);
        tracing::debug!(keys = ?keys, "wrote producer emission to cache");
        self.metrics.emit(CacheEvent::Write { keys });
    }
}
