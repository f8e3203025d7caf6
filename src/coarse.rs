//! Module `coarse` implement the tree-wide locking strategy.
//!
//! [Coarse] wraps a [Tree] under a single reader-writer lock. Lookups
//! share the lock and proceed in parallel, mutations take it in exclusive
//! mode. Useful as a fallback and as a baseline to compare the
//! lock-coupled tree against.

use parking_lot::RwLock;

use std::fmt;

use crate::{
    compare::{Comparator, Natural},
    config::Config,
    Map, Result, Stats, Tree,
};

/// Coarse type, ordered map guarded by a single tree-wide lock.
pub struct Coarse<K, V, C = Natural> {
    lock: RwLock<()>,
    tree: Tree<K, V, C>,
}

impl<K, V, C> Coarse<K, V, C>
where
    C: Comparator<K>,
{
    /// Create an empty map with default configuration.
    pub fn new(name: &str) -> Coarse<K, V, C> {
        Coarse {
            lock: RwLock::new(()),
            tree: Tree::new(name),
        }
    }

    /// Create an empty map with supplied configuration.
    pub fn with_config(config: Config) -> Result<Coarse<K, V, C>> {
        let tree = Tree::with_config(config)?;
        Ok(Coarse {
            lock: RwLock::new(()),
            tree,
        })
    }

    /// Insert `key`, `value`, return the old value if key was present.
    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        let _guard = self.lock.write();
        self.tree.insert(key, value)
    }

    /// Remove `key`, return whether it was present.
    pub fn erase(&self, key: &K) -> bool {
        let _guard = self.lock.write();
        self.tree.erase(key)
    }

    /// Return a copy of the value for `key`.
    pub fn lookup(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let _guard = self.lock.read();
        self.tree.lookup(key)
    }

    /// Validate tree invariants, refer to [Tree::check]. Caller must hold
    /// [Coarse::tree_lock], in shared or exclusive mode.
    pub fn check(&self) -> Result<Stats>
    where
        K: fmt::Debug,
    {
        self.tree.check()
    }

    /// Same as [Coarse::check], return a boolean instead.
    pub fn validate(&self) -> bool
    where
        K: fmt::Debug,
    {
        self.tree.validate()
    }
}

impl<K, V, C> Coarse<K, V, C> {
    /// Return the tree-wide lock. Holding it in shared mode excludes
    /// writers.
    pub fn tree_lock(&self) -> &RwLock<()> {
        &self.lock
    }

    /// Return name of this map.
    pub fn to_name(&self) -> String {
        self.tree.to_name()
    }

    /// Return number of entries in this map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Return whether map is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Return statistics of the underlying tree.
    pub fn to_stats(&self) -> Stats {
        self.tree.to_stats()
    }
}

impl<K, V, C> Map<K, V> for Coarse<K, V, C>
where
    K: fmt::Debug,
    V: Clone,
    C: Comparator<K>,
{
    fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        Coarse::insert(self, key, value)
    }

    fn erase(&self, key: &K) -> bool {
        Coarse::erase(self, key)
    }

    fn lookup(&self, key: &K) -> Option<V> {
        Coarse::lookup(self, key)
    }

    fn validate(&self) -> bool {
        Coarse::validate(self)
    }

    fn validate_snapshot(&self) -> bool {
        let _guard = self.lock.read();
        Coarse::validate(self)
    }

    fn len(&self) -> usize {
        Coarse::len(self)
    }
}

#[cfg(test)]
#[path = "coarse_test.rs"]
mod coarse_test;
