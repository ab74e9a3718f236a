mod common;

use callgate::HandlerRegistry;
use callgate::testing::CountingNotify;
use common::{OrderRecordingNotify, order_log};

#[test]
fn test_fanout_invokes_each_handler_once() {
    let registry = HandlerRegistry::new();
    let counters: Vec<CountingNotify> = (0..4).map(|_| CountingNotify::new()).collect();
    for counter in &counters {
        registry.register("D", counter.clone()).unwrap();
    }

    assert_eq!(registry.dispatch("D", "S", b"x"), 4);
    for counter in &counters {
        assert_eq!(counter.count(), 1);
    }
}

#[test]
fn test_fanout_follows_registration_order() {
    let registry = HandlerRegistry::new();
    let order = order_log();
    for id in 0..5 {
        registry
            .register("D", OrderRecordingNotify { id, order: order.clone() })
            .unwrap();
    }

    registry.dispatch("D", "S", b"");
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_cancel_one_of_many() {
    let registry = HandlerRegistry::new();
    let kept = CountingNotify::new();
    let dropped = CountingNotify::new();
    registry.register("D", kept.clone()).unwrap();
    let token = registry.register("D", dropped.clone()).unwrap();

    registry.cancel(token).unwrap();
    assert_eq!(registry.dispatch("D", "S", b"x"), 1);
    assert_eq!(kept.count(), 1);
    assert_eq!(dropped.count(), 0);
}

#[test]
fn test_same_handler_registered_twice() {
    let registry = HandlerRegistry::new();
    let counter = CountingNotify::new();
    let first = registry.register("D", counter.clone()).unwrap();
    let second = registry.register("D", counter.clone()).unwrap();
    assert_ne!(first, second);

    assert_eq!(registry.dispatch("D", "S", b"x"), 2);
    registry.cancel(first).unwrap();
    assert_eq!(registry.dispatch("D", "S", b"x"), 1);
    assert_eq!(counter.count(), 3);
}
