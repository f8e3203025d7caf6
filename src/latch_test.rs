use std::{sync::Arc, thread, time};

use super::*;
use crate::{arena::Writer, config::Config, node::Entry};

fn new_arena(n: usize) -> (Arena<u64, u64>, Vec<NodeId>) {
    let mut config = Config::new("test_latch");
    config.set_chunk_size(4).set_max_nodes(n);
    let arena = Arena::new(&config);
    let mut w = Writer::new();
    let ids = (0..n).map(|_| arena.reserve(&mut w).unwrap()).collect();
    (arena, ids)
}

#[test]
fn test_descent() {
    let latch = RwLock::new(10_u64);

    let mut guard = Descent::shared(&latch);
    assert_eq!(*guard, 10);
    assert!(guard.as_mut().is_none());
    // shared mode is compatible with readers.
    assert!(latch.try_read().is_some());

    let mut guard = guard.upgrade();
    assert!(latch.try_read().is_none());
    *guard.as_mut().unwrap() = 20;
    assert_eq!(*guard, 20);

    let guard = guard.upgrade();
    assert_eq!(*guard, 20);
    std::mem::drop(guard);
    assert_eq!(*latch.read(), 20);
}

#[test]
fn test_descent_upgrade_waits() {
    let latch = Arc::new(RwLock::new(0_u64));

    let reader = latch.read();
    let handle = {
        let latch = Arc::clone(&latch);
        thread::spawn(move || {
            let mut guard = Descent::shared(latch.as_ref()).upgrade();
            *guard.as_mut().unwrap() = 1;
        })
    };
    thread::sleep(time::Duration::from_millis(50));
    // upgrade cannot complete while a reader is holding the latch.
    assert_eq!(*reader, 0);
    std::mem::drop(reader);

    handle.join().unwrap();
    assert_eq!(*latch.read(), 1);
}

#[test]
fn test_ordered() {
    let (arena, ids) = new_arena(4);
    for id in ids.iter() {
        *arena.get(*id).latch.write() = Some(Entry { key: *id as u64, value: 0 });
    }
    let (a, b) = (ids[0], ids[3]);
    assert!(arena.get(a).to_order() < arena.get(b).to_order());

    // already holding the later node, as a reader would hold the parent.
    let held = arena.get(b).latch.read();
    let ordered = Ordered::acquire(&arena, &[b, a, b]);
    assert_eq!(ordered.guards.len(), 2);
    assert_eq!(ordered.guards[0].0, a);
    assert_eq!(ordered.guards[1].0, b);

    let guard = ordered.into_guard(a).unwrap();
    assert_eq!((*guard).as_ref().map(|e| e.key), Some(a as u64));
    std::mem::drop(held);
    // only `a` is still latched.
    assert!(arena.get(b).latch.try_write().is_some());
    assert!(arena.get(a).latch.try_write().is_none());
    std::mem::drop(guard);
    assert!(arena.get(a).latch.try_write().is_some());

    let ordered = Ordered::acquire(&arena, &[a]);
    assert!(ordered.into_guard(b).is_none());
}

#[test]
fn test_exclusive() {
    let (arena, ids) = new_arena(3);
    let head = RwLock::new(NIL);
    let (x, y, z) = (ids[0], ids[1], ids[2]);

    {
        let mut ex = Exclusive::acquire(&head, &arena, &[HEAD, x, NIL, y, x]);
        assert!(ex.is_locked(HEAD));
        assert!(ex.is_locked(x));
        assert!(ex.is_locked(y));
        assert!(!ex.is_locked(z));
        assert!(!ex.is_locked(NIL));
        assert_eq!(ex.guards.len(), 2);
        assert!(arena.get(x).latch.try_read().is_none());
        assert!(arena.get(z).latch.try_read().is_some());

        ex.replace_child(NIL, NIL, x);
        ex.set_left(x, y);
        ex.set_parent(y, x);
        ex.set_color(x, Color::Black);
        // sentinel is never written.
        ex.set_parent(NIL, x);
        ex.set_color(NIL, Color::Red);
    }
    assert_eq!(*head.read(), x);
    assert_eq!(arena.get(x).to_left(), y);
    assert_eq!(arena.get(y).to_parent(), x);
    assert_eq!(arena.get(x).to_color(), Color::Black);
    assert_eq!(arena.get(NIL).to_parent(), NIL);
    assert_eq!(arena.get(NIL).to_color(), Color::Black);

    {
        let mut ex = Exclusive::acquire(&head, &arena, &[x, y, z]);
        ex.replace_child(x, y, z);
        ex.set_parent(z, x);
    }
    assert_eq!(arena.get(x).to_left(), z);
    assert_eq!(arena.get(x).to_right(), NIL);

    *arena.get(y).latch.write() = Some(Entry { key: 1, value: 2 });
    let mut ex = Exclusive::acquire(&head, &arena, &[y]);
    assert_eq!(ex.take(y), Some(Entry { key: 1, value: 2 }));
    assert_eq!(ex.take(y), None);
    assert_eq!(ex.take(z), None);
}
