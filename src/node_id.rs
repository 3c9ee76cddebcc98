//! Lightweight identifier for nodes within a [`Pipeline`](crate::pipeline::Pipeline).
//!
//! Each [`Node`](crate::node::Node) appended to the graph gets the next sequential
//! `NodeId`. A node's inputs always carry smaller ids than the node itself, so
//! sorting by id yields a valid topological order.

/// Unique numeric identifier for a node in a pipeline graph.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a new `NodeId` (used internally by the pipeline).
    pub(crate) fn new(v: u64) -> Self {
        Self(v)
    }

    /// Return the underlying numeric value.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Position of the node in its pipeline's insertion order.
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}
