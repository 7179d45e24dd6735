//! Throttle behaviour under concurrent access.

mod common;

use common::throttle_with;
use request_throttle::infrastructure::mocks::MockClock;
use std::sync::Barrier;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_shared_key_admits_exactly_limit() {
    let clock = MockClock::starting_now();
    let throttle = throttle_with(&clock);
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let throttle = throttle.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..100)
                    .filter(|_| {
                        throttle
                            .check("203.0.113.7", "search", 250, Duration::from_secs(3600))
                            .is_admitted()
                    })
                    .count()
            })
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 250);

    let metrics = throttle.metrics().snapshot();
    assert_eq!(metrics.admitted, 250);
    assert_eq!(metrics.rejected, 1350);
}

#[test]
fn test_distinct_keys_each_get_full_quota() {
    let clock = MockClock::starting_now();
    let throttle = throttle_with(&clock);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let throttle = throttle.clone();
            thread::spawn(move || {
                let ip = format!("10.0.0.{}", i);
                (0..20)
                    .filter(|_| throttle.check(&ip, "api", 10, Duration::from_secs(60)).is_admitted())
                    .count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
    assert_eq!(throttle.tracked_keys(), 8);
}

#[test]
fn test_sweep_during_traffic_keeps_live_windows() {
    let clock = MockClock::starting_now();
    let throttle = throttle_with(&clock);

    // Stale windows for half the clients
    for i in 0..50 {
        throttle.check(&format!("stale-{}", i), "api", 5, Duration::from_millis(100));
    }
    clock.advance(Duration::from_secs(1));

    let worker = {
        let throttle = throttle.clone();
        thread::spawn(move || {
            for round in 0..20 {
                for i in 0..50 {
                    throttle.check(&format!("live-{}", i), "api", 1000, Duration::from_secs(60));
                }
                if round % 5 == 0 {
                    thread::yield_now();
                }
            }
        })
    };

    let mut removed = 0;
    for _ in 0..10 {
        removed += throttle.sweep(Duration::ZERO);
    }
    worker.join().unwrap();
    removed += throttle.sweep(Duration::ZERO);

    assert_eq!(removed, 50);
    for i in 0..50 {
        let state = throttle.peek(&format!("live-{}", i), "api").unwrap();
        assert_eq!(state.count(), 20);
    }
}
