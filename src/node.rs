use parking_lot::RwLock;

use std::sync::atomic::{
    AtomicBool, AtomicU64, AtomicUsize,
    Ordering::{Acquire, Relaxed, Release},
};

/// Handle to a node slot in the arena.
pub(crate) type NodeId = usize;

/// Arena slot reserved for the sentinel, shared by every leaf position.
pub(crate) const NIL: NodeId = 0;

/// Pseudo handle for the tree's head latch, that guards the root handle.
/// Used when latching the parent of the root node.
pub(crate) const HEAD: NodeId = usize::MAX;

/// Payload guarded by a node's latch. Sentinel and free slots carry None.
pub(crate) type Payload<K, V> = Option<Entry<K, V>>;

/// Color of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Key, value pair held by a tree node.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

// Node corresponds to a single arena slot.
//
// Links, color and order are stored only while the writer holds the
// node's latch in exclusive mode. Readers load them only while holding
// the latch in shared mode. The writer, being the only mutator, may load
// them at any time.
pub(crate) struct Node<K, V> {
    pub(crate) latch: RwLock<Payload<K, V>>,
    black: AtomicBool,
    parent: AtomicUsize,
    left: AtomicUsize,
    right: AtomicUsize,
    order: AtomicU64, // stable lock-order key, 0 for sentinel
}

impl<K, V> Node<K, V> {
    pub(crate) fn vacant() -> Node<K, V> {
        Node {
            latch: RwLock::new(None),
            black: AtomicBool::new(true),
            parent: AtomicUsize::new(NIL),
            left: AtomicUsize::new(NIL),
            right: AtomicUsize::new(NIL),
            order: AtomicU64::new(0),
        }
    }

    // prepare a recycled or fresh slot to be linked as a new RED leaf.
    pub(crate) fn reset(&self, order: u64) {
        self.black.store(false, Relaxed);
        self.parent.store(NIL, Relaxed);
        self.left.store(NIL, Relaxed);
        self.right.store(NIL, Relaxed);
        self.order.store(order, Release);
    }

    #[inline]
    pub(crate) fn to_parent(&self) -> NodeId {
        self.parent.load(Relaxed)
    }

    #[inline]
    pub(crate) fn to_left(&self) -> NodeId {
        self.left.load(Relaxed)
    }

    #[inline]
    pub(crate) fn to_right(&self) -> NodeId {
        self.right.load(Relaxed)
    }

    #[inline]
    pub(crate) fn to_color(&self) -> Color {
        match self.black.load(Relaxed) {
            true => Color::Black,
            false => Color::Red,
        }
    }

    #[inline]
    pub(crate) fn is_red(&self) -> bool {
        !self.black.load(Relaxed)
    }

    #[inline]
    pub(crate) fn to_order(&self) -> u64 {
        self.order.load(Acquire)
    }

    #[inline]
    pub(crate) fn set_parent(&self, id: NodeId) {
        self.parent.store(id, Relaxed)
    }

    #[inline]
    pub(crate) fn set_left(&self, id: NodeId) {
        self.left.store(id, Relaxed)
    }

    #[inline]
    pub(crate) fn set_right(&self, id: NodeId) {
        self.right.store(id, Relaxed)
    }

    #[inline]
    pub(crate) fn set_color(&self, color: Color) {
        self.black.store(color == Color::Black, Relaxed)
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
