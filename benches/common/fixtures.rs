use futures::Stream;
use futures::stream;
use rand::Rng;
use replay_cache::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test data structure for benchmarks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub score: u32,
}

impl BenchUser {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("User {}", id),
            email: format!("user{}@example.com", id),
            score: (id % 1000) as u32,
        }
    }
}

/// Error type of the simulated API.
#[derive(Debug)]
pub struct BenchError;

impl From<replay_cache::CacheError> for BenchError {
    fn from(_: replay_cache::CacheError) -> Self {
        BenchError
    }
}

/// Simulated HTTP API with configurable latency
#[derive(Clone)]
pub struct FakeApi {
    data: Arc<HashMap<String, BenchUser>>,
    latency_ms: u64,
    call_count: Arc<AtomicUsize>,
}

impl FakeApi {
    pub fn new(num_users: usize, latency_ms: u64) -> Self {
        let mut data = HashMap::new();
        for i in 0..num_users {
            let user = BenchUser::new(i as u64);
            data.insert(format!("user:{}", i), user);
        }

        Self {
            data: Arc::new(data),
            latency_ms,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A single-emission producer for `key`.
    pub fn get(
        &self,
        key: &str,
    ) -> impl Stream<Item = Result<Option<BenchUser>, BenchError>> + Send + 'static {
        let user = self.data.get(key).cloned();
        let latency = Duration::from_millis(self.latency_ms);
        let call_count = self.call_count.clone();

        stream::once(async move {
            call_count.fetch_add(1, Ordering::Relaxed);
            // Simulate network latency
            tokio::time::sleep(latency).await;
            Ok(user)
        })
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

/// Nested value of roughly `width * width` leaves for comparator benchmarks.
pub fn nested_value(width: usize) -> Value {
    Value::array((0..width).map(|i| {
        Value::object((0..width).map(|j| (format!("field{}", j), Value::from((i * j) as u64))))
    }))
}

/// Generate test keys for different workload patterns
pub struct KeyGenerator {
    num_keys: usize,
}

impl KeyGenerator {
    pub fn new(num_keys: usize) -> Self {
        Self { num_keys }
    }

    /// Generate sequential keys (for cold cache tests)
    pub fn sequential(&self) -> Vec<String> {
        (0..self.num_keys).map(|i| format!("user:{}", i)).collect()
    }

    /// Generate request pages for a mixed workload (some hits, some misses)
    pub fn mixed_pages(&self, hit_ratio: f64, count: usize) -> Vec<u32> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| {
                if rng.gen_bool(hit_ratio) {
                    0
                } else {
                    rng.gen_range(1..self.num_keys as u32)
                }
            })
            .collect()
    }
}

