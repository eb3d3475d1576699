//! The per-node API handed to user computations.

use super::{messenger::MessageSink, node_value::NodeValue};
use crate::{collections::paged::AtomicValue, concurrency::AtomicBitSet, graph::GraphView};

/// Handed to [`PregelComputation::init`](super::PregelComputation::init) once per
/// node before the first superstep.
pub struct InitContext<'a> {
    pub(crate) node_id: u64,
    pub(crate) graph: &'a dyn GraphView,
    pub(crate) values: &'a NodeValue,
}

impl InitContext<'_> {
    /// The node being initialized.
    #[inline]
    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Number of nodes in the graph.
    #[inline]
    pub fn node_count(&self) -> u64 {
        self.graph.node_count()
    }

    /// Out-degree of this node.
    #[inline]
    pub fn degree(&self) -> u64 {
        self.graph.degree(self.node_id)
    }

    /// Sets the `Double` property `key` of this node.
    #[inline]
    #[track_caller]
    pub fn set_double_value(&mut self, key: &str, value: f64) {
        self.values.set_double_value(key, self.node_id, value);
    }

    /// Sets the `Long` property `key` of this node.
    #[inline]
    #[track_caller]
    pub fn set_long_value(&mut self, key: &str, value: i64) {
        self.values.set_long_value(key, self.node_id, value);
    }
}

/// Handed to [`PregelComputation::compute`](super::PregelComputation::compute)
/// for every active node of a superstep.
///
/// Property accessors are scoped to the current node: each node is computed by
/// exactly one worker per superstep, so they need no locking.
pub struct ComputeContext<'a, M: AtomicValue> {
    pub(crate) node_id: u64,
    pub(crate) superstep: u32,
    pub(crate) graph: &'a dyn GraphView,
    pub(crate) values: &'a NodeValue,
    pub(crate) votes: &'a AtomicBitSet,
    pub(crate) outbox: &'a mut dyn MessageSink<M>,
    pub(crate) sent: &'a mut bool,
}

impl<M: AtomicValue> ComputeContext<'_, M> {
    /// The node being computed.
    #[inline]
    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Current superstep, starting at 0.
    #[inline]
    pub fn superstep(&self) -> u32 {
        self.superstep
    }

    /// Returns `true` during superstep 0.
    #[inline]
    pub fn is_initial_superstep(&self) -> bool {
        self.superstep == 0
    }

    /// Number of nodes in the graph.
    #[inline]
    pub fn node_count(&self) -> u64 {
        self.graph.node_count()
    }

    /// Out-degree of this node.
    #[inline]
    pub fn degree(&self) -> u64 {
        self.graph.degree(self.node_id)
    }

    /// Sends `message` to `target`; it is delivered in the next superstep.
    ///
    /// # Panics
    /// Panics if `target` is not a node of the graph.
    #[inline]
    #[track_caller]
    pub fn send_to(&mut self, target: u64, message: M) {
        assert!(
            target < self.graph.node_count(),
            "message target {target} out of bounds for {} nodes",
            self.graph.node_count()
        );
        self.outbox.send(target, message);
        *self.sent = true;
    }

    /// Sends `message` to every out-neighbor of this node.
    pub fn send_to_neighbors(&mut self, message: M) {
        let outbox = &mut *self.outbox;
        let mut any = false;
        self.graph.for_each_neighbor(self.node_id, &mut |target| {
            outbox.send(target, message);
            any = true;
            true
        });
        *self.sent |= any;
    }

    /// Calls `visitor` for every out-neighbor until it returns `false`.
    pub fn for_each_neighbor(&self, mut visitor: impl FnMut(u64) -> bool) {
        self.graph.for_each_neighbor(self.node_id, &mut visitor);
    }

    /// Calls `visitor` with every out-neighbor and edge weight until it returns
    /// `false`.
    pub fn for_each_weighted_neighbor(&self, mut visitor: impl FnMut(u64, f64) -> bool) {
        self.graph
            .for_each_weighted_neighbor(self.node_id, &mut visitor);
    }

    /// Deactivates this node until it receives a message.
    #[inline]
    pub fn vote_to_halt(&mut self) {
        self.votes.set(self.node_id);
    }

    /// The `Double` property `key` of this node.
    #[inline]
    #[track_caller]
    pub fn double_value(&self, key: &str) -> f64 {
        self.values.double_value(key, self.node_id)
    }

    /// Sets the `Double` property `key` of this node.
    #[inline]
    #[track_caller]
    pub fn set_double_value(&mut self, key: &str, value: f64) {
        self.values.set_double_value(key, self.node_id, value);
    }

    /// The `Long` property `key` of this node.
    #[inline]
    #[track_caller]
    pub fn long_value(&self, key: &str) -> i64 {
        self.values.long_value(key, self.node_id)
    }

    /// Sets the `Long` property `key` of this node.
    #[inline]
    #[track_caller]
    pub fn set_long_value(&mut self, key: &str, value: i64) {
        self.values.set_long_value(key, self.node_id, value);
    }
}

/// Handed to [`PregelComputation::master_compute`](super::PregelComputation::master_compute)
/// on the driver thread after every superstep barrier.
pub struct MasterComputeContext<'a> {
    pub(crate) superstep: u32,
    pub(crate) graph: &'a dyn GraphView,
    pub(crate) values: &'a NodeValue,
}

impl MasterComputeContext<'_> {
    /// The superstep that just completed.
    pub fn superstep(&self) -> u32 {
        self.superstep
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> u64 {
        self.graph.node_count()
    }

    /// All node properties. No worker runs while the master computes.
    pub fn node_values(&self) -> &NodeValue {
        self.values
    }

    /// The graph.
    pub fn graph(&self) -> &dyn GraphView {
        self.graph
    }

    /// Calls `f` for every node id in order until it returns `false`.
    pub fn for_each_node(&self, mut f: impl FnMut(u64) -> bool) {
        for node in 0..self.graph.node_count() {
            if !f(node) {
                break;
            }
        }
    }
}
