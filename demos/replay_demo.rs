//! Example demonstrating request-keyed replay with a simulated HTTP call.
//!
//! The first call for a given filter goes to the "server"; repeating it with an
//! equal filter replays the stored response. A successful save invalidates the
//! stored filter so the next search goes back to the server.

use futures::stream::{self, StreamExt};
use futures::Stream;
use replay_cache::{CacheError, CallOptions, ClearOnSuccessExt, ReplayCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Product {
    sku: String,
    name: String,
    price_cents: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ProductFilter {
    category: String,
    max_price_cents: u64,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("server returned {0}")]
    Status(u16),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Pretend HTTP GET: emits a single response after some latency.
fn search_products(
    filter: ProductFilter,
    calls: Arc<AtomicUsize>,
) -> impl Stream<Item = Result<Vec<Product>, ApiError>> + Send + 'static {
    stream::once(async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        if filter.max_price_cents == 0 {
            return Err(ApiError::Status(400));
        }
        Ok(vec![Product {
            sku: "KB-01".into(),
            name: format!("{} keyboard", filter.category),
            price_cents: filter.max_price_cents.min(4_999),
        }])
    })
}

/// Pretend HTTP POST.
fn save_product(
    product: Product,
) -> impl Stream<Item = Result<Product, ApiError>> + Send + 'static {
    stream::once(async move { Ok(product) })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cache = ReplayCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let filter = ProductFilter {
        category: "mechanical".into(),
        max_price_cents: 10_000,
    };

    for attempt in 1..=3 {
        let options = CallOptions::new().with_request(&filter)?;
        let products = cache
            .run(search_products(filter.clone(), calls.clone()), "searchProducts", options)
            .next()
            .await
            .transpose()?;
        println!(
            "attempt {}: {:?} (server calls so far: {})",
            attempt,
            products,
            calls.load(Ordering::SeqCst)
        );
    }

    // Saving a product invalidates the stored search request.
    let saved = save_product(Product {
        sku: "KB-02".into(),
        name: "Silent keyboard".into(),
        price_cents: 7_999,
    })
    .clear_on_success(cache.invalidator(), &["searchProducts"], true)
    .next()
    .await
    .transpose()?;
    println!("saved {:?}", saved);

    let options = CallOptions::new().with_request(&filter)?;
    let _ = cache
        .run(search_products(filter.clone(), calls.clone()), "searchProducts", options)
        .next()
        .await;
    println!(
        "after save: server calls so far: {}",
        calls.load(Ordering::SeqCst)
    );

    // A forced call always reaches the server.
    let forced = CallOptions::new().with_request(&filter)?.force(true);
    let _ = cache
        .run(search_products(filter, calls.clone()), "searchProducts", forced)
        .next()
        .await;
    println!("after force: server calls so far: {}", calls.load(Ordering::SeqCst));

    Ok(())
}
