//! Rbcc provide a thread-safe ordered map implemented as a red-black tree,
//! where any number of concurrent lookups proceed in parallel while
//! mutations are serialized.
//!
//! Every node carries its own reader-writer latch. Readers descend from
//! root to leaf using [lock coupling], holding at most two node latches
//! at any point in time. Writers are serialized by a single mutex and
//! cooperate with readers by latching, in exclusive mode, only the nodes
//! they are about to modify.
//!
//! * [Tree] is the fine-grained, lock-coupled variant.
//! * [Coarse] wraps the same tree under a single tree-wide reader-writer
//!   lock, useful as a fallback and as a baseline.
//!
//! Both types implement the [Map] trait, so that harness code can be
//! written once and exercised against either strategy.
//!
//! A tree is validated by calling [Tree::validate] while holding
//! [Tree::writer_lock], or [Coarse::validate] while holding
//! [Coarse::tree_lock]. Refer to [Map::validate_snapshot] for a variant
//! that takes the right lock by itself.
//!
//! [lock coupling]: https://en.wikipedia.org/wiki/Fine-grained_locking

use std::result;

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// use crate::Error;
/// err_at!(Fatal, msg: "node {} has consecutive reds", id);
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailConvert, u64::try_from(n));
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err($crate::Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err($crate::Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err($crate::Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

mod arena;
mod coarse;
mod compare;
mod config;
mod depth;
mod error;
mod fixup;
mod latch;
mod node;
mod stats;
mod tree;

pub use crate::arena::Writer;
pub use crate::coarse::Coarse;
pub use crate::compare::{Comparator, Natural, Reverse};
pub use crate::config::{Config, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_NODES};
pub use crate::depth::Depth;
pub use crate::error::Error;
pub use crate::node::Color;
pub use crate::stats::Stats;
pub use crate::tree::Tree;

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;

/// Common interface over the concurrency strategies implemented by this
/// package. All methods take `&self`, implementing types are `Sync` and
/// meant to be shared across threads, typically behind an `Arc`.
pub trait Map<K, V> {
    /// Insert `key`, `value` into the map. If an entry with same key is
    /// already present, its value is overwritten and the old value is
    /// returned.
    fn insert(&self, key: K, value: V) -> Result<Option<V>>;

    /// Remove the entry matching `key`, return whether it was present.
    fn erase(&self, key: &K) -> bool;

    /// Return a copy of the value for `key`.
    fn lookup(&self, key: &K) -> Option<V>;

    /// Validate the tree invariants. Caller must already hold the lock
    /// that excludes writers.
    fn validate(&self) -> bool;

    /// Acquire the lock that excludes writers and validate the tree.
    fn validate_snapshot(&self) -> bool;

    /// Return the number of entries in the map.
    fn len(&self) -> usize;

    /// Return whether the map is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
