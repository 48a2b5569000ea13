//! Integration tests for replay-cache: decision, write-through, replay and invalidation.

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use replay_cache::{
    CacheError, CallOptions, ClearOnSuccessExt, Decision, ReplayCache, Value, equal,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;

// ============================================================================
// Test Types
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct UserQuery {
    name_prefix: String,
    page: u32,
}

#[derive(Debug, PartialEq, thiserror::Error)]
enum ApiError {
    #[error("http status {0}")]
    Status(u16),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

// ============================================================================
// Fake Database
// ============================================================================

fn fake_user_db() -> HashMap<String, User> {
    let mut db = HashMap::new();
    db.insert(
        "user:1".into(),
        User {
            id: 1,
            name: "Alice".into(),
            email: "alice@example.com".into(),
        },
    );
    db.insert(
        "user:2".into(),
        User {
            id: 2,
            name: "Bob".into(),
            email: "bob@example.com".into(),
        },
    );
    db.insert(
        "user:3".into(),
        User {
            id: 3,
            name: "Charlie".into(),
            email: "charlie@example.com".into(),
        },
    );
    db
}

// ============================================================================
// Helper Functions
// ============================================================================

/// A producer standing in for an HTTP call: emits once, counting its calls.
fn fetch_user(
    db: &HashMap<String, User>,
    key: &str,
    calls: Arc<AtomicUsize>,
) -> impl Stream<Item = Result<User, ApiError>> + Send + 'static {
    let user = db.get(key).cloned();
    stream::once(async move {
        calls.fetch_add(1, Ordering::SeqCst);
        user.ok_or(ApiError::Status(404))
    })
}

fn search_users(
    db: &HashMap<String, User>,
    query: &UserQuery,
    calls: Arc<AtomicUsize>,
) -> impl Stream<Item = Result<Vec<User>, ApiError>> + Send + 'static {
    let mut users: Vec<User> = db
        .values()
        .filter(|u| u.name.starts_with(&query.name_prefix))
        .cloned()
        .collect();
    users.sort_by_key(|u| u.id);
    stream::once(async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(users)
    })
}

async fn first<T>(stream: &mut BoxStream<'static, T>) -> Option<T> {
    timeout(Duration::from_millis(200), stream.next())
        .await
        .expect("stream did not emit in time")
}

// ============================================================================
// Equality
// ============================================================================

#[test]
fn test_equality_examples() {
    assert!(equal(&Value::array([1, 2, 3]), &Value::array([1, 2, 3])));
    assert!(!equal(&Value::array([1, 2]), &Value::array([2, 1])));
    assert!(equal(
        &Value::object([("a", 1), ("b", 2)]),
        &Value::object([("b", 2), ("a", 1)])
    ));
    assert!(!equal(
        &Value::object([("a", 1)]),
        &Value::object([("a", 1), ("b", 2)])
    ));
    assert!(equal(&Value::Null, &Value::Null));
    assert!(!equal(&Value::from(1), &Value::from("1")));
}

// ============================================================================
// Orchestrator
// ============================================================================

#[tokio::test]
async fn test_cache_miss_calls_producer() {
    let cache = ReplayCache::new();
    let db = fake_user_db();
    let calls = Arc::new(AtomicUsize::new(0));

    let result: Vec<_> = cache
        .run(fetch_user(&db, "user:1", calls.clone()), "getUser", CallOptions::new())
        .collect()
        .await;

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].as_ref().unwrap().name, "Alice");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cache_hit_does_not_call_producer() {
    let cache = ReplayCache::new();
    let db = fake_user_db();
    let calls = Arc::new(AtomicUsize::new(0));

    // First call - cache miss
    let _: Vec<_> = cache
        .run(fetch_user(&db, "user:2", calls.clone()), "getUser", CallOptions::new())
        .collect()
        .await;

    // Second call - cache hit, even though the producer would return someone else
    let mut replay = cache.run(
        fetch_user(&db, "user:3", calls.clone()),
        "getUser",
        CallOptions::new(),
    );
    let mut user = first(&mut replay).await.unwrap().unwrap();
    assert_eq!(user.name, "Bob");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Mutating the replayed value does not affect the cache
    user.name = "Mallory".into();
    let mut again = cache.run(
        fetch_user(&db, "user:3", calls.clone()),
        "getUser",
        CallOptions::new(),
    );
    assert_eq!(first(&mut again).await.unwrap().unwrap().name, "Bob");
}

#[tokio::test]
async fn test_equal_request_replays_different_request_calls() {
    let cache = ReplayCache::new();
    let db = fake_user_db();
    let calls = Arc::new(AtomicUsize::new(0));

    let query = UserQuery {
        name_prefix: "A".into(),
        page: 1,
    };
    let options = CallOptions::new().with_request(&query).unwrap();
    let result: Vec<_> = cache
        .run(search_users(&db, &query, calls.clone()), "searchUsers", options)
        .collect()
        .await;
    assert_eq!(result[0].as_ref().unwrap().len(), 1);

    // Structurally equal request built from a fresh value
    let same = UserQuery {
        name_prefix: "A".into(),
        page: 1,
    };
    let options = CallOptions::new().with_request(&same).unwrap();
    assert_eq!(cache.decide("searchUsers", &options), Decision::Replay);
    let mut replay = cache.run(search_users(&db, &same, calls.clone()), "searchUsers", options);
    let users = first(&mut replay).await.unwrap().unwrap();
    assert_eq!(users[0].name, "Alice");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Different request
    let other = UserQuery {
        name_prefix: "B".into(),
        page: 1,
    };
    let options = CallOptions::new().with_request(&other).unwrap();
    let result: Vec<_> = cache
        .run(search_users(&db, &other, calls.clone()), "searchUsers", options)
        .collect()
        .await;
    assert_eq!(result[0].as_ref().unwrap()[0].name, "Bob");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The witness now holds the latest request
    let witness: UserQuery = cache.get_value("reqsearchUsers").deserialize_into().unwrap();
    assert_eq!(witness, other);
}

#[tokio::test]
async fn test_force_always_calls_producer() {
    let cache = ReplayCache::new();
    let db = fake_user_db();
    let calls = Arc::new(AtomicUsize::new(0));

    let _: Vec<_> = cache
        .run(fetch_user(&db, "user:1", calls.clone()), "getUser", CallOptions::new())
        .collect()
        .await;

    let result: Vec<_> = cache
        .run(
            fetch_user(&db, "user:3", calls.clone()),
            "getUser",
            CallOptions::new().force(true),
        )
        .collect()
        .await;

    assert_eq!(result[0].as_ref().unwrap().name, "Charlie");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let stored: User = cache.get_value("getUser").deserialize_into().unwrap();
    assert_eq!(stored.name, "Charlie");
}

#[tokio::test]
async fn test_producer_failure_passes_through_uncached() {
    let cache = ReplayCache::new();
    let db = fake_user_db();
    let calls = Arc::new(AtomicUsize::new(0));

    let result: Vec<_> = cache
        .run(fetch_user(&db, "user:404", calls.clone()), "getUser", CallOptions::new())
        .collect()
        .await;

    assert_eq!(result, vec![Err(ApiError::Status(404))]);
    assert!(cache.get_value("getUser").is_undefined());

    // Nothing was cached, so the next call goes to the producer again
    let _: Vec<_> = cache
        .run(fetch_user(&db, "user:1", calls.clone()), "getUser", CallOptions::new())
        .collect()
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_misses_are_not_coalesced() {
    let cache = ReplayCache::new();
    let db = fake_user_db();
    let calls = Arc::new(AtomicUsize::new(0));

    // Both decisions are taken before either producer emits
    let a = cache.run(fetch_user(&db, "user:1", calls.clone()), "getUser", CallOptions::new());
    let b = cache.run(fetch_user(&db, "user:2", calls.clone()), "getUser", CallOptions::new());

    let _: Vec<_> = a.collect().await;
    let _: Vec<_> = b.collect().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    // Last write wins
    let stored: User = cache.get_value("getUser").deserialize_into().unwrap();
    assert_eq!(stored.name, "Bob");
}

// ============================================================================
// Accessors and invalidation
// ============================================================================

#[tokio::test]
async fn test_clear_key_notifies_live_subscribers() {
    let cache = ReplayCache::new();
    cache.store().write([("foo", Value::from("bar"))]);

    let mut stream = cache.value_stream("foo");
    assert_eq!(first(&mut stream).await, Some(Value::from("bar")));

    cache.clear(Some(&["foo"][..]));
    assert!(cache.get_value("foo").is_undefined());
    assert_eq!(first(&mut stream).await, Some(Value::Undefined));
}

#[tokio::test]
async fn test_subscriber_sees_clear_followed_by_rewrite() {
    let cache = ReplayCache::new();
    cache.store().write([("foo", Value::from(1))]);

    let mut stream = cache.value_stream("foo");
    assert_eq!(first(&mut stream).await, Some(Value::from(1)));

    cache.clear(Some(&["foo"][..]));
    cache.store().write([("foo", Value::from(2))]);

    assert_eq!(first(&mut stream).await, Some(Value::Undefined));
    assert_eq!(first(&mut stream).await, Some(Value::from(2)));
}

#[tokio::test]
async fn test_replay_preserves_large_integers() {
    let cache = ReplayCache::new();

    let live: Vec<Result<u64, ApiError>> = cache
        .run(stream::iter(vec![Ok(u64::MAX)]), "big", CallOptions::new())
        .collect()
        .await;
    let mut replay = cache.run(
        stream::iter(vec![Ok::<u64, ApiError>(0)]),
        "big",
        CallOptions::new(),
    );

    assert_eq!(live, vec![Ok(u64::MAX)]);
    assert_eq!(first(&mut replay).await, Some(Ok(u64::MAX)));
}

#[tokio::test]
async fn test_clear_all_resets_sentinel() {
    let cache = ReplayCache::new();
    cache.store().write([("foo", Value::from("bar"))]);

    cache.clear::<&str>(None);
    assert_eq!(cache.get_value(""), Value::object(Vec::<(String, Value)>::new()));

    let mut whole = cache.value_stream("");
    assert!(
        timeout(Duration::from_millis(50), whole.next())
            .await
            .is_err()
    );

    cache.store().write([("baz", Value::from(1))]);
    assert_eq!(
        first(&mut whole).await,
        Some(Value::object([("baz", 1)]))
    );
}

#[tokio::test]
async fn test_round_trip_preserves_structure() {
    let cache = ReplayCache::new();
    let original = Value::object([
        ("name", Value::from("Alice")),
        ("tags", Value::array(["a", "b"])),
        ("nested", Value::object([("n", Value::Null), ("ok", Value::from(true))])),
    ]);
    cache.store().write([("doc", original.clone())]);

    let mut stream = cache.value_stream("doc");
    let replayed = first(&mut stream).await.unwrap();
    assert!(equal(&original, &replayed));
    assert!(!original.same_ref(&replayed));
}

#[tokio::test]
async fn test_clear_on_success_invalidates_request_witness() {
    let cache = ReplayCache::new();
    let db = fake_user_db();
    let calls = Arc::new(AtomicUsize::new(0));
    let query = UserQuery {
        name_prefix: "C".into(),
        page: 1,
    };

    let _: Vec<_> = cache
        .run(
            search_users(&db, &query, calls.clone()),
            "searchUsers",
            CallOptions::new().with_request(&query).unwrap(),
        )
        .collect()
        .await;

    // A successful write elsewhere invalidates the search
    let saved: Vec<Result<&str, ApiError>> = stream::iter(vec![Ok("saved")])
        .clear_on_success(cache.invalidator(), &["searchUsers"], true)
        .collect()
        .await;
    assert_eq!(saved, vec![Ok("saved")]);
    assert!(cache.get_value("reqsearchUsers").is_undefined());

    // Same request misses now
    let _: Vec<_> = cache
        .run(
            search_users(&db, &query, calls.clone()),
            "searchUsers",
            CallOptions::new().with_request(&query).unwrap(),
        )
        .collect()
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_replay_stream_ends_on_reset() {
    let cache = ReplayCache::new();
    let db = fake_user_db();
    let calls = Arc::new(AtomicUsize::new(0));

    let _: Vec<_> = cache
        .run(fetch_user(&db, "user:1", calls.clone()), "getUser", CallOptions::new())
        .collect()
        .await;

    let mut replay = cache.run(
        fetch_user(&db, "user:1", calls.clone()),
        "getUser",
        CallOptions::new(),
    );
    assert!(first(&mut replay).await.is_some());

    cache.clear_all();
    assert!(first(&mut replay).await.is_none());
}
