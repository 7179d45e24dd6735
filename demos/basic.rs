//! Basic example demonstrating fixed-window throttling.
//!
//! A client gets 3 requests per second. The fourth is rejected with the time
//! left in the window; after the window ends the client is admitted again.

use request_throttle::{Decision, Throttle};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("request_throttle=debug")),
        )
        .init();

    let throttle = Throttle::builder().build().expect("valid configuration");
    let window = Duration::from_secs(1);

    println!("=== Basic Throttling Example ===\n");
    println!("Limit: 3 requests per second per client and category\n");

    for i in 1..=5 {
        match throttle.check("203.0.113.7", "search", 3, window) {
            Decision::Admitted { remaining } => {
                println!("request {}: admitted ({} left)", i, remaining)
            }
            Decision::Rejected { retry_after } => {
                println!("request {}: rejected, retry in {:?}", i, retry_after)
            }
        }
    }

    println!("\nAnother client is counted separately:");
    let decision = throttle.check("198.51.100.2", "search", 3, window);
    println!("198.51.100.2: {:?}", decision);

    println!("\nWaiting for the window to end...");
    thread::sleep(window + Duration::from_millis(10));
    let decision = throttle.check("203.0.113.7", "search", 3, window);
    println!("203.0.113.7: {:?}", decision);

    println!("\nCategory table (search 100/h, api 1000/h, admin 200/h, auth 5/15 min):");
    for category in ["search", "api", "admin", "auth", "unknown"] {
        let decision = throttle.check_category("192.0.2.1", category);
        println!("{:>8}: {} left", category, decision.remaining());
    }

    let removed = throttle.sweep(Duration::ZERO);
    println!("\nSwept {} expired windows", removed);
    println!("Metrics: {:?}", throttle.metrics().snapshot());
    println!("\n=== Example Complete ===");
}
