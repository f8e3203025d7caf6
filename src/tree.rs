//! Module `tree` implement the lock-coupled, concurrent red-black tree.
//!
//! **Readers**, [Tree::lookup] and [Tree::lookup_ordered], walk from the
//! root towards the leaf in hand-over-hand fashion: latch the child in
//! shared mode before un-latching the parent. At any point in time a
//! reader holds at most two node latches.
//!
//! **Writers**, [Tree::insert] and [Tree::erase], are serialized by the
//! writer lock. A writer descends the tree holding upgradable latches
//! and converts them to exclusive mode only where it modifies a link, a
//! value or a color. Re-balancing latches, in exclusive mode, the
//! neighbourhood of each rotation or re-color step, from ancestor to
//! descendant, and releases them at the end of the step.
//!
//! Since readers and the writer both acquire latches top-down, and a
//! reader waits only on a child latch while holding its parent latch,
//! there is no cycle in the wait-for graph.

use log::{info, warn};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use std::{
    cmp::Ordering,
    fmt, mem,
    sync::atomic::{AtomicUsize, Ordering::SeqCst},
};

use crate::{
    arena::{Arena, Writer},
    compare::{Comparator, Natural},
    config::Config,
    latch::{Descent, Ordered},
    node::{Color, Entry, NodeId, Payload, NIL},
    Depth, Map, Result, Stats,
};

/// Tree type, a thread-safe ordered map with concurrent readers and
/// serialized writers.
///
/// Share it across threads by wrapping it in an `Arc`.
pub struct Tree<K, V, C = Natural> {
    pub(crate) name: String,
    pub(crate) arena: Arena<K, V>,
    // root handle, parent latch of the root node.
    pub(crate) head: RwLock<NodeId>,
    pub(crate) writers: Mutex<Writer>,
    pub(crate) n_count: AtomicUsize,
    pub(crate) cmp: C,
}

impl<K, V, C> Tree<K, V, C>
where
    C: Comparator<K>,
{
    /// Create an empty tree with default configuration.
    pub fn new(name: &str) -> Tree<K, V, C> {
        Self::build(Config::new(name), C::default())
    }

    /// Create an empty tree with supplied configuration.
    pub fn with_config(config: Config) -> Result<Tree<K, V, C>> {
        config.validate()?;
        Ok(Self::build(config, C::default()))
    }

    /// Create an empty tree with supplied configuration and comparator
    /// value.
    pub fn with_comparator(config: Config, cmp: C) -> Result<Tree<K, V, C>> {
        config.validate()?;
        Ok(Self::build(config, cmp))
    }

    fn build(config: Config, cmp: C) -> Tree<K, V, C> {
        let tree = Tree {
            name: config.name.clone(),
            arena: Arena::new(&config),
            head: RwLock::new(NIL),
            writers: Mutex::new(Writer::new()),
            n_count: AtomicUsize::new(0),
            cmp,
        };
        info!(
            target: "rbcc",
            "{:?}, new tree max_nodes:{} chunk_size:{}",
            tree.name,
            config.max_nodes,
            config.chunk_size
        );
        tree
    }
}

impl<K, V, C> Drop for Tree<K, V, C> {
    fn drop(&mut self) {
        info!(
            target: "rbcc",
            "{:?}, dropping tree with {} entries",
            self.name,
            self.n_count.load(SeqCst)
        );
    }
}

impl<K, V, C> Tree<K, V, C> {
    /// Return name of this tree.
    #[inline]
    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    /// Return number of entries in this tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count.load(SeqCst)
    }

    /// Return whether tree is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the writer-serialization lock. Holding this lock excludes
    /// every writer, while readers continue to make progress. Validation
    /// must be done holding this lock.
    pub fn writer_lock(&self) -> &Mutex<Writer> {
        &self.writers
    }

    /// Return tree statistics. Black height and depth histogram are
    /// available only from [Tree::check].
    pub fn to_stats(&self) -> Stats {
        let w = self.writers.lock();
        let mut stats = self.new_stats();
        stats.n_allocated = w.to_allocated();
        stats.n_free = w.to_free();
        stats
    }

    fn new_stats(&self) -> Stats {
        let mut stats = Stats::new(&self.name);
        stats.n_count = self.len();
        stats.node_size = mem::size_of::<crate::node::Node<K, V>>();
        stats.max_nodes = self.arena.to_max_nodes();
        stats
    }

    #[inline]
    pub(crate) fn to_root(&self) -> NodeId {
        *self.head.read()
    }
}

impl<K, V, C> Tree<K, V, C>
where
    C: Comparator<K>,
{
    /// Return a copy of the value for `key`, latching nodes hand-over-hand.
    pub fn lookup(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let head = self.head.read();
        let mut id = *head;
        let mut guard = self.arena.get(id).latch.read();
        mem::drop(head);

        loop {
            // sentinel carries no payload.
            let entry = (*guard).as_ref()?;
            let next = match self.cmp.compare(key, &entry.key) {
                Ordering::Less => self.arena.get(id).to_left(),
                Ordering::Greater => self.arena.get(id).to_right(),
                Ordering::Equal => break Some(entry.value.clone()),
            };
            let child = self.arena.get(next).latch.read();
            guard = child;
            id = next;
        }
    }

    /// Same as [Tree::lookup], except that when a child node was allocated
    /// before its parent, both latches are acquired in allocation order,
    /// through the ordered guard, before un-latching the parent.
    pub fn lookup_ordered(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let head = self.head.read();
        let mut id = *head;
        if id == NIL {
            return None;
        }
        let mut guard = self.arena.get(id).latch.read();
        mem::drop(head);

        loop {
            let entry = to_entry(&guard, id);
            let next = match self.cmp.compare(key, &entry.key) {
                Ordering::Less => self.arena.get(id).to_left(),
                Ordering::Greater => self.arena.get(id).to_right(),
                Ordering::Equal => break Some(entry.value.clone()),
            };
            if next == NIL {
                break None;
            }

            let (parent, child) = (self.arena.get(id), self.arena.get(next));
            let child = if parent.to_order() < child.to_order() {
                child.latch.read()
            } else {
                Ordered::acquire(&self.arena, &[id, next]).into_guard(next)?
            };
            guard = child;
            id = next;
        }
    }

    /// Lookup `key` holding the writer lock, useful as a baseline.
    pub fn lookup_serialized(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let _w = self.writers.lock();
        let id = self.find(key)?;
        let payload = self.arena.get(id).latch.read();
        (*payload).as_ref().map(|entry| entry.value.clone())
    }

    /// Insert `key`, `value` into the tree. If key is already present, its
    /// value is replaced and the old value is returned. Fails with
    /// ArenaFull, leaving the tree untouched, when a new node is needed
    /// and capacity is exhausted.
    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        let mut w = self.writers.lock();
        // slot is reserved before latching any node.
        let z = self.arena.reserve(&mut w);

        let head = Descent::shared(&self.head);
        if *head == NIL {
            let z = z?;
            let mut head = head.upgrade();
            *self.arena.get(z).latch.write() = Some(Entry { key, value });
            if let Some(root) = head.as_mut() {
                *root = z;
            }
            mem::drop(head);

            self.n_count.fetch_add(1, SeqCst);
            self.insert_fixup(z);
            return Ok(None);
        }

        let mut y = *head;
        let mut guard = Descent::shared(&self.arena.get(y).latch);
        mem::drop(head);

        let side = loop {
            let node = self.arena.get(y);
            let ord = self.cmp.compare(&key, &to_entry(&guard, y).key);
            let next = match ord {
                Ordering::Less => node.to_left(),
                Ordering::Greater => node.to_right(),
                Ordering::Equal => {
                    let mut guard = guard.upgrade();
                    let old = match guard.as_mut().and_then(Option::as_mut) {
                        Some(entry) => mem::replace(&mut entry.value, value),
                        None => unreachable!(),
                    };
                    mem::drop(guard);
                    if let Ok(z) = z {
                        self.arena.release(&mut w, z);
                    }
                    return Ok(Some(old));
                }
            };
            if next == NIL {
                break ord;
            }
            let child = Descent::shared(&self.arena.get(next).latch);
            guard = child;
            y = next;
        };

        let z = z?;
        let guard = guard.upgrade();
        {
            let zn = self.arena.get(z);
            let mut payload = zn.latch.write();
            *payload = Some(Entry { key, value });
            zn.set_parent(y);
        }
        match side {
            Ordering::Less => self.arena.get(y).set_left(z),
            _ => self.arena.get(y).set_right(z),
        }
        mem::drop(guard);

        self.n_count.fetch_add(1, SeqCst);
        self.insert_fixup(z);
        Ok(None)
    }

    /// Remove `key` from the tree, return whether it was present.
    pub fn erase(&self, key: &K) -> bool {
        let mut w = self.writers.lock();
        let z = match self.find(key) {
            Some(z) => z,
            None => return false,
        };

        let (x, xp, color) = self.splice(&mut w, z);
        self.n_count.fetch_sub(1, SeqCst);

        if color == Color::Black {
            self.delete_fixup(x, xp);
        }
        true
    }

    // writer side search, links are stable under the writer lock.
    pub(crate) fn find(&self, key: &K) -> Option<NodeId> {
        let mut id = self.to_root();
        while id != NIL {
            let node = self.arena.get(id);
            let ord = {
                let payload = node.latch.read();
                self.cmp.compare(key, &to_entry(&payload, id).key)
            };
            id = match ord {
                Ordering::Less => node.to_left(),
                Ordering::Greater => node.to_right(),
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    /// Validate tree invariants, return statistics on success and the
    /// first violation on failure. Caller must hold [Tree::writer_lock].
    ///
    /// * Sentinel is black and carries no payload.
    /// * Root is black.
    /// * No red node has a red child.
    /// * Every path from root to leaf has the same number of black nodes.
    /// * Keys are in strictly ascending comparator order.
    /// * Parent links are consistent with child links.
    /// * Number of reachable nodes match the entry count.
    pub fn check(&self) -> Result<Stats>
    where
        K: fmt::Debug,
    {
        let sentinel = self.arena.get(NIL);
        if sentinel.is_red() {
            err_at!(Fatal, msg: "{:?} sentinel must be black", self.name)?;
        }
        if sentinel.latch.read().is_some() {
            err_at!(Fatal, msg: "{:?} sentinel carries payload", self.name)?;
        }

        let root = self.to_root();
        if self.arena.get(root).is_red() {
            err_at!(Fatal, msg: "{:?} root node must be black", self.name)?;
        }
        if root != NIL && self.arena.get(root).to_parent() != NIL {
            err_at!(Fatal, msg: "{:?} root {} has a parent", self.name, root)?;
        }

        let mut depths = Depth::default();
        let mut blacks: Option<usize> = None;
        let mut n_count = 0;
        let mut prev: Option<(NodeId, RwLockReadGuard<Payload<K, V>>)> = None;

        // in-order walk, (node, blacks, depth) where blacks and depth
        // count the nodes from root up to, and including, the node.
        let mut stack: Vec<(NodeId, usize, usize)> = vec![];
        let (mut id, mut n_blacks, mut depth) = (root, 0, 0);
        loop {
            while id != NIL {
                let node = self.arena.get(id);
                let (left, right) = (node.to_left(), node.to_right());
                let red_child = self.arena.get(left).is_red() || self.arena.get(right).is_red();
                if node.is_red() && red_child {
                    err_at!(Fatal, msg: "{:?} consecutive reds at {}", self.name, id)?;
                }
                for child in [left, right].iter().filter(|c| **c != NIL) {
                    let parent = self.arena.get(*child).to_parent();
                    if parent != id {
                        err_at!(
                            Fatal,
                            msg: "{:?} node {} parent {} expected {}",
                            self.name,
                            child,
                            parent,
                            id
                        )?;
                    }
                }
                n_blacks += if node.is_red() { 0 } else { 1 };
                depth += 1;
                stack.push((id, n_blacks, depth));
                id = left;
            }

            // reached a leaf.
            match blacks {
                Some(n) if n != n_blacks => err_at!(
                    Fatal,
                    msg: "{:?} unbalanced blacks {} != {}",
                    self.name,
                    n,
                    n_blacks
                )?,
                Some(_) => (),
                None => blacks = Some(n_blacks),
            }
            depths.sample(depth);

            let (curr, nb, d) = match stack.pop() {
                Some(item) => item,
                None => break,
            };
            let guard = self.arena.get(curr).latch.read_recursive();
            let entry = match (*guard).as_ref() {
                Some(entry) => entry,
                None => err_at!(Fatal, msg: "{:?} node {} without payload", self.name, curr)?,
            };
            if let Some((p, pguard)) = prev.as_ref() {
                let pentry = to_entry(pguard, *p);
                if self.cmp.compare(&pentry.key, &entry.key) != Ordering::Less {
                    err_at!(
                        Fatal,
                        msg: "{:?} sort order {:?} >= {:?}",
                        self.name,
                        pentry.key,
                        entry.key
                    )?;
                }
            }
            prev = Some((curr, guard));
            n_count += 1;

            id = self.arena.get(curr).to_right();
            n_blacks = nb;
            depth = d;
        }

        if n_count != self.len() {
            err_at!(Fatal, msg: "{:?} n_count {} != {}", self.name, n_count, self.len())?;
        }

        let mut stats = self.new_stats();
        stats.blacks = blacks;
        stats.depths = Some(depths);
        Ok(stats)
    }

    /// Return whether the tree satisfies every invariant, refer to
    /// [Tree::check]. Caller must hold [Tree::writer_lock].
    pub fn validate(&self) -> bool
    where
        K: fmt::Debug,
    {
        match self.check() {
            Ok(_) => true,
            Err(err) => {
                warn!(target: "rbcc", "{:?}, validation failed {}", self.name, err);
                false
            }
        }
    }
}

impl<K, V, C> Map<K, V> for Tree<K, V, C>
where
    K: fmt::Debug,
    V: Clone,
    C: Comparator<K>,
{
    fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        Tree::insert(self, key, value)
    }

    fn erase(&self, key: &K) -> bool {
        Tree::erase(self, key)
    }

    fn lookup(&self, key: &K) -> Option<V> {
        Tree::lookup(self, key)
    }

    fn validate(&self) -> bool {
        Tree::validate(self)
    }

    fn validate_snapshot(&self) -> bool {
        let _w = self.writers.lock();
        Tree::validate(self)
    }

    fn len(&self) -> usize {
        Tree::len(self)
    }
}

// payload of a reachable node, other than the sentinel.
#[inline]
pub(crate) fn to_entry<K, V>(payload: &Payload<K, V>, id: NodeId) -> &Entry<K, V> {
    match payload {
        Some(entry) => entry,
        None => panic!("node {} without payload, call the programmer", id),
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
