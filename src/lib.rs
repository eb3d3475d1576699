//! # `superstep` - Concurrent core for large-graph analytics
//!
//! Building blocks for graph algorithms over node and relationship counts that do
//! not fit ordinary `usize`-indexed collections, executed safely across a pool of
//! worker threads.
//!
//! ## Layers
//!
//! 1. **Paged arrays** ([`collections::paged`]): `u64`-indexed arrays split into
//!    fixed power-of-two pages, in a plain and an atomic flavor.
//! 2. **Concurrency** ([`concurrency`]): partitioning of the node id space, a
//!    bounded task runner with first-failure cancellation, an atomic bitset, and a
//!    sign-bit lock for lock-free relaxation of multi-field node state.
//! 3. **Graph view** ([`graph`]): the read-only adjacency abstraction every layer
//!    above consumes, plus a paged CSR implementation.
//! 4. **BSP engine** ([`pregel`]): vertex-centric computations in supersteps with
//!    double-buffered messaging and vote-to-halt termination.
//!
//! ## Example
//!
//! ```rust
//! use superstep::{
//!     concurrency::WorkerPool,
//!     graph::CsrGraph,
//!     pregel::{ComputeContext, Messages, NodeSchema, Pregel, PregelComputation, PregelConfig, ValueType},
//! };
//!
//! /// Propagates the smallest node id through every (undirected) component.
//! struct MinLabel;
//!
//! impl PregelComputation for MinLabel {
//!     type Message = i64;
//!
//!     fn schema(&self) -> NodeSchema {
//!         NodeSchema::new().add("component", ValueType::Long)
//!     }
//!
//!     fn compute(&self, ctx: &mut ComputeContext<'_, i64>, messages: Messages<'_, i64>) {
//!         let current = if ctx.is_initial_superstep() {
//!             ctx.node_id() as i64
//!         } else {
//!             ctx.long_value("component")
//!         };
//!         let best = messages.fold(current, i64::min);
//!         if ctx.is_initial_superstep() || best < current {
//!             ctx.set_long_value("component", best);
//!             ctx.send_to_neighbors(best);
//!         }
//!         ctx.vote_to_halt();
//!     }
//! }
//!
//! let graph = CsrGraph::undirected(4, &[(0, 1), (2, 3)]);
//! let pool = WorkerPool::new(2).unwrap();
//! let mut engine = Pregel::new(&graph, MinLabel, PregelConfig::default(), &pool).unwrap();
//! let result = engine.run().unwrap();
//!
//! assert!(result.did_converge());
//! let labels = result.node_values().long_properties("component").to_vec();
//! assert_eq!(labels, vec![0, 0, 2, 2]);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

mod tracing_helpers;

pub mod collections;
pub mod concurrency;
pub mod graph;
pub mod pregel;

pub use collections::{AtomicPagedArray, AtomicValue, PagedArray, PagedArrayError};
pub use concurrency::{
    AtomicBitSet, Concurrency, DistanceTracker, Partition, TaskRunner, TerminationFlag, WorkerPool,
};
pub use graph::{CsrGraph, GraphView};
pub use pregel::{Pregel, PregelComputation, PregelConfig, PregelError, PregelResult};

const _: () = {
    use core::mem;

    // Float elements share the width of their integer atomics.
    assert!(mem::size_of::<<f64 as AtomicValue>::Atom>() == mem::size_of::<u64>());
    assert!(mem::size_of::<<f32 as AtomicValue>::Atom>() == mem::size_of::<u32>());
};
