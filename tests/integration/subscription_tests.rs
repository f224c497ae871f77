//! Integration tests for the subscription registry under concurrency.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use waterstation::app::subscriptions::SubscriptionRegistry;
use waterstation::cancel::CancelToken;
use waterstation::model::Station;

use super::mock_hw::wait_until;

fn snapshot(level: f64) -> Station {
    let mut s = Station::new(1, "Station 1");
    s.water_level = level;
    s
}

#[test]
fn cancelled_subscriber_misses_later_broadcasts() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let stay = registry.subscribe(CancelToken::new());
    let cancel = CancelToken::new();
    let leave = registry.subscribe(cancel.clone());

    assert_eq!(registry.broadcast(&snapshot(10.0)), 2);
    cancel.cancel();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.broadcast(&snapshot(20.0)), 1);

    let left: Vec<f64> = leave.map(|s| s.water_level).collect();
    assert_eq!(left, vec![10.0]);
    assert_eq!(stay.try_recv().map(|s| s.water_level), Some(10.0));
    assert_eq!(stay.try_recv().map(|s| s.water_level), Some(20.0));
}

#[test]
fn subscription_cancel_method_unregisters() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let sub = registry.subscribe(CancelToken::new());
    sub.cancel();
    assert!(sub.is_closed());
    assert_eq!(registry.broadcast(&snapshot(1.0)), 0);
    assert!(registry.is_empty());
}

#[test]
fn churn_during_broadcasts_keeps_the_set_consistent() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let steady = registry.subscribe(CancelToken::new());
    let done = Arc::new(AtomicBool::new(false));

    let broadcaster = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut sent = 0u32;
            while !done.load(Ordering::SeqCst) {
                registry.broadcast(&snapshot(f64::from(sent)));
                sent += 1;
            }
            sent
        })
    };

    let churners: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..50 {
                    let cancel = CancelToken::new();
                    let sub = registry.subscribe(cancel.clone());
                    if i % 2 == 0 {
                        cancel.cancel();
                    } else {
                        drop(sub);
                    }
                }
            })
        })
        .collect();

    for c in churners {
        c.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    let sent = broadcaster.join().unwrap();
    assert!(sent > 0);

    wait_until("all churners gone", || registry.len() == 1);

    // The steady subscriber holds the newest snapshots, oldest dropped.
    let levels: Vec<f64> = std::iter::from_fn(|| steady.try_recv())
        .map(|s| s.water_level)
        .collect();
    assert!(!levels.is_empty());
    assert!(levels.windows(2).all(|w| w[0] < w[1]), "{levels:?}");
    assert_eq!(levels.last().copied(), Some(f64::from(sent - 1)));
}

#[test]
fn broadcast_never_blocks_on_an_idle_subscriber() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let _idle = registry.subscribe(CancelToken::new());
    for i in 0..1000 {
        assert_eq!(registry.broadcast(&snapshot(f64::from(i))), 1);
    }
}
