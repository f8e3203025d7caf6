//! Module `compare` abstract the key ordering used by the tree.

use std::cmp;

/// Comparator defines a strict total order over keys of type `K`. It is
/// the only configuration surface that affects the shape of the tree.
pub trait Comparator<K: ?Sized>: Default + Send + Sync {
    /// Compare `a` with `b`.
    fn compare(&self, a: &K, b: &K) -> cmp::Ordering;
}

/// Order keys by their [Ord] implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Natural;

impl<K> Comparator<K> for Natural
where
    K: ?Sized + Ord,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> cmp::Ordering {
        a.cmp(b)
    }
}

/// Reverse the order defined by the wrapped comparator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reverse<C>(pub C);

impl<K, C> Comparator<K> for Reverse<C>
where
    K: ?Sized,
    C: Comparator<K>,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> cmp::Ordering {
        self.0.compare(b, a)
    }
}
