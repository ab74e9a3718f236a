mod common;

use callgate::testing::{CountingNotify, LatchNotify};
use callgate::{Courier, HandlerRegistry};
use common::{CancellingNotify, shared_registry};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_no_invocation_starts_after_cancel_returns() {
    for _ in 0..50 {
        let registry = HandlerRegistry::new();
        let cancelled = Arc::new(AtomicBool::new(false));
        let late = Arc::new(AtomicUsize::new(0));

        let flag = cancelled.clone();
        let late_calls = late.clone();
        let token = registry
            .register("D", move |_: &str, _: &[u8]| {
                if flag.load(Ordering::SeqCst) {
                    late_calls.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

        let barrier = Barrier::new(2);
        thread::scope(|s| {
            s.spawn(|| {
                barrier.wait();
                for _ in 0..200 {
                    registry.dispatch("D", "S", b"x");
                }
            });
            s.spawn(|| {
                barrier.wait();
                registry.cancel_and_drain(token).unwrap();
                cancelled.store(true, Ordering::SeqCst);
            });
        });

        assert_eq!(late.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn test_cancel_and_drain_waits_for_in_flight() {
    let registry = HandlerRegistry::new();
    let latch = LatchNotify::new();
    let token = registry.register("D", latch.clone()).unwrap();
    let drained = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| registry.dispatch("D", "S", b"x"));
        latch.wait_entered(1);

        s.spawn(|| {
            registry.cancel_and_drain(token).unwrap();
            drained.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!drained.load(Ordering::SeqCst));
        // Cancelled already: new dispatches skip it even while draining.
        assert_eq!(registry.dispatch("D", "S", b"y"), 0);
        latch.release();
    });

    assert!(drained.load(Ordering::SeqCst));
    assert_eq!(latch.calls(), 1);
}

#[test]
fn test_plain_cancel_does_not_wait() {
    let registry = HandlerRegistry::new();
    let latch = LatchNotify::new();
    let token = registry.register("D", latch.clone()).unwrap();

    thread::scope(|s| {
        s.spawn(|| registry.dispatch("D", "S", b"x"));
        latch.wait_entered(1);
        registry.cancel(token).unwrap();
        latch.release();
    });
    assert_eq!(latch.calls(), 1);
}

#[test]
fn test_reentrant_self_cancel() {
    let registry = shared_registry();
    let target = Arc::new(Mutex::new(None));
    let calls = Arc::new(AtomicUsize::new(0));

    let token = registry
        .register(
            "D",
            CancellingNotify {
                registry: registry.clone(),
                target: target.clone(),
                calls: calls.clone(),
            },
        )
        .unwrap();
    *target.lock().unwrap() = Some(token);

    assert_eq!(registry.dispatch("D", "S", b"x"), 1);
    assert_eq!(registry.dispatch("D", "S", b"x"), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
}

#[test]
fn test_concurrent_register_and_cancel() {
    let registry = HandlerRegistry::new();
    let counter = CountingNotify::new();

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..100 {
                    let token = registry.register("D", counter.clone()).unwrap();
                    registry.dispatch("D", "S", b"x");
                    registry.cancel(token).unwrap();
                }
            });
        }
    });

    assert!(registry.is_empty());
    assert!(counter.count() >= 800);
}

#[test]
fn test_courier_delivers_nothing_after_cancel() {
    let registry = shared_registry();
    let latch = LatchNotify::new();
    let counter = CountingNotify::new();
    registry.register("gate", latch.clone()).unwrap();
    let token = registry.register("D", counter.clone()).unwrap();

    let mut courier = Courier::spawn(registry.clone()).unwrap();
    courier.post(envelope("gate")).unwrap();
    latch.wait_entered(1);

    // Queued behind the parked delivery.
    courier.post(envelope("D")).unwrap();
    registry.cancel(token).unwrap();
    latch.release();
    courier.shutdown();

    assert_eq!(counter.count(), 0);
}

fn envelope(destination: &str) -> callgate::Envelope {
    callgate::Envelope::new(
        callgate::Destination::new(destination).unwrap(),
        "S",
        &b"x"[..],
    )
}
