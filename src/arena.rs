//! Module `arena` implement segmented storage for tree nodes.
//!
//! Nodes are addressed by a [NodeId] handle. Storage is a list of chunks,
//! where chunk `i` holds `chunk_size << i` slots. Chunks are allocated
//! lazily and never move once allocated, hence readers can resolve a
//! handle to its slot without taking any lock on the chunk table. Slot
//! [NIL] is reserved for the sentinel.

use log::debug;
use once_cell::sync::OnceCell;

use std::convert::TryFrom;

use crate::{
    config::Config,
    node::{Node, NodeId, NIL},
    Result,
};

/// State owned by the writer-serialization lock, refer to
/// [Tree::writer_lock][crate::Tree::writer_lock]. Only writers mutate it.
pub struct Writer {
    free: Vec<NodeId>, // released slots, ready for reuse
    next: NodeId,      // first slot never handed out
    seqno: u64,        // lock-order key for the next allocation
}

impl Writer {
    pub(crate) fn new() -> Writer {
        Writer {
            free: Vec::default(),
            next: NIL + 1,
            seqno: 0,
        }
    }

    /// Return number of slots released and ready for reuse.
    pub fn to_free(&self) -> usize {
        self.free.len()
    }

    /// Return number of slots ever handed out, excluding the sentinel.
    pub fn to_allocated(&self) -> usize {
        self.next - 1
    }
}

pub(crate) struct Arena<K, V> {
    name: String,
    chunk_size: usize,
    max_nodes: usize,
    chunks: Vec<OnceCell<Box<[Node<K, V>]>>>,
}

impl<K, V> Arena<K, V> {
    // config is expected to be validated.
    pub(crate) fn new(config: &Config) -> Arena<K, V> {
        let chunk_size = config.chunk_size;
        // slots 0..=max_nodes must be addressable.
        let mut n_chunks = 1;
        while n_chunks < (usize::BITS as usize)
            && capacity_of(chunk_size, n_chunks) <= config.max_nodes
        {
            n_chunks += 1;
        }

        let chunks: Vec<OnceCell<Box<[Node<K, V>]>>> =
            (0..n_chunks).map(|_| OnceCell::new()).collect();
        let arena = Arena {
            name: config.name.clone(),
            chunk_size,
            max_nodes: config.max_nodes,
            chunks,
        };
        // chunk-0 holds the sentinel, vacant slots are BLACK.
        arena.chunks[0].get_or_init(|| new_chunk(chunk_size));
        arena
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node<K, V> {
        let (i, off) = locate(self.chunk_size, id);
        match self.chunks.get(i).and_then(OnceCell::get) {
            Some(chunk) => &chunk[off],
            None => panic!("{:?} node {} not allocated, call the programmer", self.name, id),
        }
    }

    /// Return the maximum number of nodes this arena can hold.
    pub(crate) fn to_max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Hand out a slot for a new node, reset as a RED leaf with a fresh
    /// lock-order key. Fails with ArenaFull when capacity is exhausted.
    pub(crate) fn reserve(&self, w: &mut Writer) -> Result<NodeId> {
        let id = match w.free.pop() {
            Some(id) => id,
            None if w.next <= self.max_nodes => {
                let id = w.next;
                self.grow(id);
                w.next += 1;
                id
            }
            None => err_at!(
                ArenaFull,
                msg: "{:?} reached max_nodes {}",
                self.name,
                self.max_nodes
            )?,
        };

        w.seqno += 1;
        let node = self.get(id);
        let _latch = node.latch.write();
        node.reset(w.seqno);

        Ok(id)
    }

    /// Return a slot to the free list. Caller must make sure the slot is
    /// unreachable and its payload already taken out.
    pub(crate) fn release(&self, w: &mut Writer, id: NodeId) {
        debug_assert!(id != NIL);
        w.free.push(id);
    }

    fn grow(&self, id: NodeId) {
        let (i, _) = locate(self.chunk_size, id);
        let chunk_size = self.chunk_size << i;
        self.chunks[i].get_or_init(|| {
            debug!(target: "rbcc", "{:?}, arena chunk-{} with {} slots", self.name, i, chunk_size);
            new_chunk(chunk_size)
        });
    }
}

fn new_chunk<K, V>(size: usize) -> Box<[Node<K, V>]> {
    (0..size).map(|_| Node::vacant()).collect()
}

// total slots held by the first `n_chunks` chunks, saturates at usize::MAX.
fn capacity_of(chunk_size: usize, n_chunks: usize) -> usize {
    match u32::try_from(n_chunks).ok().and_then(|n| 1_usize.checked_shl(n)) {
        Some(n) => chunk_size.saturating_mul(n - 1),
        None => usize::MAX,
    }
}

// map slot handle to (chunk-index, offset-within-chunk).
#[inline]
fn locate(chunk_size: usize, id: NodeId) -> (usize, usize) {
    let n = id / chunk_size + 1;
    let i = (usize::BITS - 1 - n.leading_zeros()) as usize;
    let off = id - chunk_size * ((1 << i) - 1);
    (i, off)
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
