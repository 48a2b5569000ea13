use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::value::{Map, Value};

/// Mappings a subscriber may fall behind by before it starts skipping them.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;

/// Whether anything was published since the store was created or last reset.
#[derive(Debug, Clone)]
pub enum StoreState {
    /// Nothing was written since the store was created or last reset.
    Unset,
    /// The full mapping after the most recent mutation.
    Ready(Arc<Map>),
}

impl StoreState {
    pub fn is_unset(&self) -> bool {
        matches!(self, StoreState::Unset)
    }

    /// The mapping, if the state is not the `Unset` sentinel.
    pub fn entries(&self) -> Option<&Arc<Map>> {
        match self {
            StoreState::Unset => None,
            StoreState::Ready(map) => Some(map),
        }
    }
}

/// A consistent starting point for a subscriber: the state at the moment of
/// subscription plus every mapping published after it.
#[derive(Debug)]
pub struct Subscription {
    pub current: StoreState,
    pub updates: broadcast::Receiver<Arc<Map>>,
}

struct Inner {
    /// Bumped on every `reset`.
    generation: u64,
    /// Bumped on every published notification.
    revision: u64,
    /// False until the first publish after creation or reset.
    published: bool,
    entries: Arc<Map>,
    tx: broadcast::Sender<Arc<Map>>,
}

impl Inner {
    fn publish(&mut self) {
        self.revision += 1;
        self.published = true;
        // No receivers is fine: late subscribers start from `entries`.
        let _ = self.tx.send(Arc::clone(&self.entries));
    }

    fn state(&self) -> StoreState {
        if self.published {
            StoreState::Ready(Arc::clone(&self.entries))
        } else {
            StoreState::Unset
        }
    }
}

/// Versioned key/value state with a change-notification channel.
///
/// Every mutation happens under a write lock and publishes the new mapping
/// before the lock is released, so notifications are ordered exactly like the
/// writes that produced them. Each mutation is delivered to every subscriber;
/// a subscriber more than `capacity` notifications behind skips the oldest
/// ones. The mapping itself is copy-on-write: a snapshot handed out earlier
/// is never modified afterwards.
///
/// Values are stored as given. Deep copies are the caller's responsibility.
pub struct Store {
    capacity: usize,
    inner: RwLock<Inner>,
}

impl Store {
    /// Create an empty store whose channel is in the `Unset` state.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NOTIFICATION_CAPACITY)
    }

    /// Create an empty store that buffers up to `capacity` notifications per
    /// subscriber (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Store {
            capacity,
            inner: RwLock::new(Inner {
                generation: 0,
                revision: 0,
                published: false,
                entries: Arc::new(Map::new()),
                tx,
            }),
        }
    }

    /// Merge `entries` into the mapping, overwriting existing keys, then
    /// publish the full mapping once.
    pub fn write<I, K>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut inner = self.inner.write();
        let map = Arc::make_mut(&mut inner.entries);
        for (key, value) in entries {
            map.insert(key.into(), value);
        }
        inner.publish();
        tracing::trace!(
            generation = inner.generation,
            revision = inner.revision,
            "store written"
        );
    }

    /// Return the entry for `key`, or the whole mapping as an object when
    /// `key` is empty. Absent keys read as [`Value::Undefined`].
    ///
    /// Nothing is copied: structured values share their containers with the store.
    pub fn read_snapshot(&self, key: &str) -> Value {
        let inner = self.inner.read();
        if key.is_empty() {
            return Value::Object(Arc::clone(&inner.entries));
        }
        inner.entries.get(key).cloned().unwrap_or_default()
    }

    /// Remove every key in `keys` that is present, then publish once.
    ///
    /// Publishes even when none of the keys existed.
    pub fn delete_keys<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut inner = self.inner.write();
        let map = Arc::make_mut(&mut inner.entries);
        for key in keys {
            map.remove(key.as_ref());
        }
        inner.publish();
        tracing::trace!(
            generation = inner.generation,
            revision = inner.revision,
            "store keys deleted"
        );
    }

    /// Empty the mapping and replace the notification channel with a fresh
    /// one in the `Unset` state.
    ///
    /// Receivers of the previous channel drain what was already sent and then
    /// observe it as closed: streams built on them end. Returns the new generation.
    pub fn reset(&self) -> u64 {
        let mut inner = self.inner.write();
        let (tx, _) = broadcast::channel(self.capacity);
        inner.tx = tx;
        inner.published = false;
        inner.entries = Arc::new(Map::new());
        inner.generation += 1;
        tracing::trace!(generation = inner.generation, "store reset");
        inner.generation
    }

    /// Subscribe to the current channel.
    ///
    /// The current state and the receiver are taken under one lock, so no
    /// mutation is both in `current` and in `updates`, and none is missing.
    pub fn subscribe(&self) -> Subscription {
        let inner = self.inner.read();
        Subscription {
            current: inner.state(),
            updates: inner.tx.subscribe(),
        }
    }

    /// The state most recently published on the current channel.
    pub fn state(&self) -> StoreState {
        self.inner.read().state()
    }

    /// Notifications buffered per subscriber.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The current mapping.
    pub fn entries(&self) -> Arc<Map> {
        Arc::clone(&self.inner.read().entries)
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Number of notifications published since the store was created.
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Store")
            .field("generation", &inner.generation)
            .field("revision", &inner.revision)
            .field("capacity", &self.capacity)
            .field("len", &inner.entries.len())
            .finish()
    }
}
