use std::{fmt, result};

#[allow(unused_imports)]
use crate::Tree;
use crate::Depth;

/// Statistic type, for [Tree] type.
#[derive(Clone, Debug)]
pub struct Stats {
    pub name: String,
    pub n_count: usize,
    pub node_size: usize,
    /// Maximum number of nodes the arena can hold.
    pub max_nodes: usize,
    /// Slots handed out so far, live nodes and free slots.
    pub n_allocated: usize,
    /// Released slots waiting to be reused.
    pub n_free: usize,
    /// Black height of the tree, computed on validation.
    pub blacks: Option<usize>,
    /// Leaf depth histogram, computed on validation.
    pub depths: Option<Depth>,
}

impl Stats {
    pub(crate) fn new(name: &str) -> Stats {
        Stats {
            name: name.to_string(),
            n_count: Default::default(),
            node_size: Default::default(),
            max_nodes: Default::default(),
            n_allocated: Default::default(),
            n_free: Default::default(),
            blacks: None,
            depths: None,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let none = "none".to_string();
        let b = self.blacks.as_ref().map_or(none.clone(), |x| x.to_string());
        let d = self.depths.as_ref().map_or(none, |x| x.to_string());
        writeln!(f, "rbcc.name = {}", self.name)?;
        writeln!(
            f,
            "rbcc = {{ n_count={}, node_size={}, blacks={} }}",
            self.n_count, self.node_size, b,
        )?;
        writeln!(
            f,
            "rbcc.arena = {{ max_nodes={}, n_allocated={}, n_free={} }}",
            self.max_nodes, self.n_allocated, self.n_free
        )?;
        writeln!(f, "rbcc.depths = {}", d)
    }
}
