//! The read-only graph abstraction consumed by the engine, and a paged CSR
//! implementation of it.

pub mod csr;

pub use csr::CsrGraph;

/// A read-only view of a directed graph with dense `u64` node ids `[0, node_count)`.
///
/// Iteration takes `&self` and keeps no cursor state in the view, so each thread
/// iterating neighborhoods does so independently. Implementations must not be
/// mutated while a computation borrows them.
pub trait GraphView: Sync {
    /// Number of nodes.
    fn node_count(&self) -> u64;

    /// Number of (directed) relationships.
    fn relationship_count(&self) -> u64;

    /// Out-degree of `node`.
    fn degree(&self, node: u64) -> u64;

    /// Calls `visitor` for every out-neighbor of `node` until it returns `false`.
    fn for_each_neighbor(&self, node: u64, visitor: &mut dyn FnMut(u64) -> bool);

    /// Like [`for_each_neighbor`](Self::for_each_neighbor), also passing the edge
    /// weight. Unweighted graphs report `1.0`.
    fn for_each_weighted_neighbor(&self, node: u64, visitor: &mut dyn FnMut(u64, f64) -> bool) {
        self.for_each_neighbor(node, &mut |target| visitor(target, 1.0));
    }
}

impl<G: GraphView + ?Sized> GraphView for &G {
    fn node_count(&self) -> u64 {
        (**self).node_count()
    }

    fn relationship_count(&self) -> u64 {
        (**self).relationship_count()
    }

    fn degree(&self, node: u64) -> u64 {
        (**self).degree(node)
    }

    fn for_each_neighbor(&self, node: u64, visitor: &mut dyn FnMut(u64) -> bool) {
        (**self).for_each_neighbor(node, visitor);
    }

    fn for_each_weighted_neighbor(&self, node: u64, visitor: &mut dyn FnMut(u64, f64) -> bool) {
        (**self).for_each_weighted_neighbor(node, visitor);
    }
}
