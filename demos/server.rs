//! HTTP server throttling requests per client IP and path category.
//!
//! Run with:
//!
//! ```text
//! cargo run --example server --features axum
//! curl -i http://127.0.0.1:3000/api/search
//! ```
//!
//! Configuration is read from `THROTTLE_CONFIG` (JSON) if set, otherwise the
//! standard limits apply: search 100/h, api 1000/h, admin 200/h, auth 5 per
//! 15 minutes.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use request_throttle::{throttle_middleware, HttpThrottle, MemoryStore, ThrottleConfig};
use std::error::Error;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,request_throttle=debug")),
        )
        .init();

    let config: ThrottleConfig = match std::env::var("THROTTLE_CONFIG") {
        Ok(json) => serde_json::from_str(&json)?,
        Err(_) => ThrottleConfig::default(),
    };

    let throttle = config.builder()?.build()?;
    let sweeper = throttle.start_sweeper(config.sweeper_config()?);

    let app = Router::new()
        .route("/api/search", get(|| async { "search results" }))
        .route("/api/admin/auth", post(|| async { "signed in" }))
        .route("/api/admin/stats", get(|| async { "admin stats" }))
        .route("/api/listings", get(|| async { "listings" }))
        .route("/", get(|| async { "home" }))
        .layer(middleware::from_fn_with_state(
            HttpThrottle::new(throttle.clone()),
            throttle_middleware::<MemoryStore>,
        ));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    sweeper.shutdown().await?;
    tracing::info!(metrics = ?throttle.metrics().snapshot(), "shut down");
    Ok(())
}
