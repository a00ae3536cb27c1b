use super::*;
use parking_lot::Mutex;
use std::sync::atomic::AtomicUsize;

#[test]
fn test_emit_reaches_all_handlers_in_order() {
    let bus: EventBus<u32> = EventBus::new("test");
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s1 = seen.clone();
    bus.subscribe(move |e| s1.lock().push(("first", *e)));
    let s2 = seen.clone();
    bus.subscribe(move |e| s2.lock().push(("second", *e)));

    bus.emit(&7);
    assert_eq!(*seen.lock(), vec![("first", 7), ("second", 7)]);
}

#[test]
fn test_unsubscribe_detaches_handler() {
    let bus: EventBus<()> = EventBus::new("test");
    let count = Arc::new(AtomicUsize::new(0));

    let c = count.clone();
    let sub = bus.subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    bus.emit(&());
    assert!(sub.unsubscribe());
    bus.emit(&());

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(bus.handler_count(), 0);
}

#[test]
fn test_panicking_handler_does_not_block_others() {
    let bus: EventBus<&'static str> = EventBus::new("test");
    let count = Arc::new(AtomicUsize::new(0));

    bus.subscribe(|_| panic!("bad subscriber"));
    let c = count.clone();
    bus.subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    bus.emit(&"event");
    bus.emit(&"event");
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unsubscribe_after_bus_dropped() {
    let bus: EventBus<()> = EventBus::new("test");
    let sub = bus.subscribe(|_| {});
    drop(bus);
    assert!(!sub.unsubscribe());
}

#[test]
fn test_clear() {
    let bus: EventBus<()> = EventBus::new("test");
    bus.subscribe(|_| {});
    bus.subscribe(|_| {});
    assert_eq!(bus.handler_count(), 2);
    bus.clear();
    assert_eq!(bus.handler_count(), 0);
}
