//! Throttling shared across instances through Redis.
//!
//! Requires a Redis server at `redis://127.0.0.1/`:
//!
//! ```text
//! docker run --rm -p 6379:6379 redis
//! cargo run --example redis --features redis-storage
//! ```
//!
//! Two throttles share one Redis store, standing in for two application
//! instances behind a load balancer.

use request_throttle::{RedisStore, RedisStoreConfig, Throttle, WindowStore};
use std::error::Error;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("request_throttle=debug")),
        )
        .init();

    let config = RedisStoreConfig {
        key_prefix: "request-throttle-demo:".to_string(),
        ..RedisStoreConfig::default()
    };

    let instance_a = Throttle::builder()
        .build_with_store(RedisStore::connect_with_config("redis://127.0.0.1/", config.clone()).await?)?;
    let instance_b = Throttle::builder()
        .build_with_store(RedisStore::connect_with_config("redis://127.0.0.1/", config).await?)?;
    instance_a.store().clear();

    println!("=== Shared Redis Throttling Example ===\n");
    println!("Limit: 4 requests per 10 seconds, split across two instances\n");

    let window = Duration::from_secs(10);
    for i in 1..=6 {
        let (name, throttle) = if i % 2 == 0 {
            ("B", &instance_b)
        } else {
            ("A", &instance_a)
        };
        let decision = throttle.check("203.0.113.7", "search", 4, window);
        println!("request {} via instance {}: {:?}", i, name, decision);
    }

    instance_a.reset("203.0.113.7", "search");
    println!("\nAfter reset: {:?}", instance_b.check("203.0.113.7", "search", 4, window));

    instance_a.store().clear();
    println!("\n=== Example Complete ===");
    Ok(())
}
