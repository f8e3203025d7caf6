//! Module `latch` implement the locking protocols used over node latches.
//!
//! * [Descent], shared latch held by a writer while descending the tree,
//!   that can be converted to exclusive mode without an unlocked window.
//! * [Ordered], shared latches on a set of nodes acquired in the order of
//!   their stable order-key.
//! * [Exclusive], exclusive latches on the neighbourhood of a structural
//!   step, acquired top-down, from ancestor to descendant.

use parking_lot::{
    RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard,
};

use std::ops::Deref;

use crate::{
    arena::Arena,
    node::{Color, NodeId, Payload, HEAD, NIL},
};

/// Latch held by the writer during descent. Starts in shared mode, where
/// it is compatible with readers, and is upgraded in place to exclusive
/// mode just before modifying the latched value.
pub(crate) enum Descent<'a, T> {
    Shared(RwLockUpgradableReadGuard<'a, T>),
    Exclusive(RwLockWriteGuard<'a, T>),
}

impl<'a, T> Descent<'a, T> {
    pub(crate) fn shared(latch: &'a RwLock<T>) -> Descent<'a, T> {
        Descent::Shared(latch.upgradable_read())
    }

    /// Convert to exclusive mode, waits for readers to drain. Calling
    /// upgrade on an exclusive latch is a no-op.
    pub(crate) fn upgrade(self) -> Descent<'a, T> {
        match self {
            Descent::Shared(guard) => {
                Descent::Exclusive(RwLockUpgradableReadGuard::upgrade(guard))
            }
            val @ Descent::Exclusive(_) => val,
        }
    }

    /// Mutable access is allowed only in exclusive mode.
    pub(crate) fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Descent::Shared(_) => None,
            Descent::Exclusive(guard) => Some(&mut **guard),
        }
    }
}

impl<'a, T> Deref for Descent<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Descent::Shared(guard) => guard.deref(),
            Descent::Exclusive(guard) => guard.deref(),
        }
    }
}

/// Shared latches over a set of nodes, acquired in ascending order of
/// their order-key. Duplicates are latched once. Latches are acquired
/// recursively, so that a latch already held by the calling thread
/// does not block behind a waiting writer.
pub(crate) struct Ordered<'a, K, V> {
    guards: Vec<(NodeId, RwLockReadGuard<'a, Payload<K, V>>)>,
}

impl<'a, K, V> Ordered<'a, K, V> {
    pub(crate) fn acquire(arena: &'a Arena<K, V>, ids: &[NodeId]) -> Ordered<'a, K, V> {
        let mut keys: Vec<(u64, NodeId)> =
            ids.iter().map(|id| (arena.get(*id).to_order(), *id)).collect();
        keys.sort_unstable();
        keys.dedup();

        let guards = keys
            .into_iter()
            .map(|(_, id)| (id, arena.get(id).latch.read_recursive()))
            .collect();
        Ordered { guards }
    }

    /// Release every latch except the one on `id`, which is returned.
    pub(crate) fn into_guard(self, id: NodeId) -> Option<RwLockReadGuard<'a, Payload<K, V>>> {
        self.guards.into_iter().find(|(x, _)| *x == id).map(|(_, g)| g)
    }
}

/// Exclusive latches over the neighbourhood of a single structural step.
///
/// Nodes are latched in the order they are supplied, caller shall list
/// them top-down. [NIL] entries and duplicates are skipped, the sentinel
/// is never written. [HEAD] latches the root handle.
pub(crate) struct Exclusive<'a, K, V> {
    arena: &'a Arena<K, V>,
    head: Option<RwLockWriteGuard<'a, NodeId>>,
    guards: Vec<(NodeId, RwLockWriteGuard<'a, Payload<K, V>>)>,
}

impl<'a, K, V> Exclusive<'a, K, V> {
    pub(crate) fn acquire(
        head: &'a RwLock<NodeId>,
        arena: &'a Arena<K, V>,
        ids: &[NodeId],
    ) -> Exclusive<'a, K, V> {
        let mut val = Exclusive {
            arena,
            head: None,
            guards: Vec::with_capacity(ids.len()),
        };
        for id in ids.iter() {
            match *id {
                NIL => (),
                HEAD if val.head.is_none() => val.head = Some(head.write()),
                HEAD => (),
                id if val.is_locked(id) => (),
                id => val.guards.push((id, arena.get(id).latch.write())),
            }
        }
        val
    }

    pub(crate) fn is_locked(&self, id: NodeId) -> bool {
        match id {
            HEAD => self.head.is_some(),
            id => self.guards.iter().any(|(x, _)| *x == id),
        }
    }

    #[inline]
    pub(crate) fn set_left(&mut self, id: NodeId, child: NodeId) {
        if id != NIL {
            debug_assert!(self.is_locked(id), "set_left {}", id);
            self.arena.get(id).set_left(child)
        }
    }

    #[inline]
    pub(crate) fn set_right(&mut self, id: NodeId, child: NodeId) {
        if id != NIL {
            debug_assert!(self.is_locked(id), "set_right {}", id);
            self.arena.get(id).set_right(child)
        }
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        if id != NIL {
            debug_assert!(self.is_locked(id), "set_parent {}", id);
            self.arena.get(id).set_parent(parent)
        }
    }

    #[inline]
    pub(crate) fn set_color(&mut self, id: NodeId, color: Color) {
        if id != NIL {
            debug_assert!(self.is_locked(id), "set_color {}", id);
            self.arena.get(id).set_color(color)
        }
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        match self.head.as_mut() {
            Some(head) => **head = root,
            None => panic!("set_root without head latch, call the programmer"),
        }
    }

    /// Make `new` take the place of `old` under `parent`. A NIL parent
    /// means `old` is the root.
    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if parent == NIL {
            self.set_root(new)
        } else if self.arena.get(parent).to_left() == old {
            self.set_left(parent, new)
        } else {
            self.set_right(parent, new)
        }
    }

    /// Take out the payload of a latched node.
    pub(crate) fn take(&mut self, id: NodeId) -> Payload<K, V> {
        match self.guards.iter_mut().find(|(x, _)| *x == id) {
            Some((_, guard)) => guard.take(),
            None => None,
        }
    }
}

#[cfg(test)]
#[path = "latch_test.rs"]
mod latch_test;
