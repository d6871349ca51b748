use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::{Listener, ListenerResult, ListenerSet, ServiceAction, ServiceChanged};

fn event() -> ServiceChanged {
    ServiceChanged {
        service_name: "log".to_string(),
        action: ServiceAction::Add,
    }
}

fn listener(f: impl Fn(&ServiceChanged) -> ListenerResult + Send + Sync + 'static) -> Listener<ServiceChanged> {
    Arc::new(f)
}

fn counting(counter: &Arc<AtomicUsize>) -> Listener<ServiceChanged> {
    let counter = Arc::clone(counter);
    listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn test_listeners_run_in_registration_order() {
    let set = ListenerSet::default();
    let order = Arc::new(Mutex::new(Vec::new()));
    for id in 1..=3u64 {
        let order = Arc::clone(&order);
        set.add(
            id,
            listener(move |_| {
                order.lock().unwrap().push(id);
                Ok(())
            }),
        );
    }

    set.fire(&event());
    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_failing_and_panicking_listeners_are_isolated() {
    let set = ListenerSet::default();
    let counter = Arc::new(AtomicUsize::new(0));
    set.add(1, listener(|_| Err("broken listener".into())));
    set.add(2, listener(|_| panic!("listener exploded")));
    set.add(3, counting(&counter));

    set.fire(&event());
    set.fire(&event());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(set.len(), 3);
}

#[test]
fn test_remove_and_clear() {
    let set = ListenerSet::default();
    let counter = Arc::new(AtomicUsize::new(0));
    set.add(7, counting(&counter));
    set.add(8, counting(&counter));

    assert!(set.remove(7));
    assert!(!set.remove(7));
    set.fire(&event());
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    set.clear();
    assert!(set.is_empty());
}

#[test]
fn test_listener_may_register_during_fire() {
    let set = Arc::new(ListenerSet::default());
    let counter = Arc::new(AtomicUsize::new(0));
    let inner_set = Arc::clone(&set);
    let inner_counter = Arc::clone(&counter);
    set.add(
        1,
        listener(move |_| {
            inner_set.add(2, counting(&inner_counter));
            Ok(())
        }),
    );

    // The new listener only sees later events.
    set.fire(&event());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(set.len(), 2);
}
