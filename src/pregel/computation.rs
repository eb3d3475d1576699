//! The user side of a vertex-centric computation.

use super::{
    context::{ComputeContext, InitContext, MasterComputeContext},
    messenger::Messages,
    reducer::Reducer,
    schema::NodeSchema,
};
use crate::collections::paged::AtomicValue;

/// A bulk-synchronous vertex program.
///
/// `compute` is called concurrently from several workers, for different nodes, so
/// implementations are `Sync` and keep per-node state in the declared
/// [`NodeSchema`] properties rather than in `self`.
///
/// ```
/// use superstep::pregel::{ComputeContext, Messages, NodeSchema, PregelComputation, ValueType};
///
/// /// Counts the in-degree of every node.
/// struct InDegree;
///
/// impl PregelComputation for InDegree {
///     type Message = i64;
///
///     fn schema(&self) -> NodeSchema {
///         NodeSchema::new().add("in_degree", ValueType::Long)
///     }
///
///     fn compute(&self, ctx: &mut ComputeContext<'_, i64>, messages: Messages<'_, i64>) {
///         if ctx.is_initial_superstep() {
///             ctx.send_to_neighbors(1);
///         } else {
///             ctx.set_long_value("in_degree", messages.sum());
///         }
///         ctx.vote_to_halt();
///     }
/// }
/// ```
pub trait PregelComputation: Sync {
    /// Type of the messages exchanged between nodes.
    type Message: AtomicValue;

    /// The per-node properties this computation stores.
    fn schema(&self) -> NodeSchema;

    /// Initializes the properties of one node before superstep 0.
    fn init(&self, _ctx: &mut InitContext<'_>) {}

    /// Runs one node for one superstep with the messages it received in the
    /// previous one.
    fn compute(&self, ctx: &mut ComputeContext<'_, Self::Message>, messages: Messages<'_, Self::Message>);

    /// Folds messages per target as they are sent. `None` keeps every message.
    fn reducer(&self) -> Option<Box<dyn Reducer<Self::Message>>> {
        None
    }

    /// Runs on the driver thread after every superstep. Returning `true` stops the
    /// computation as converged.
    fn master_compute(&self, _ctx: &mut MasterComputeContext<'_>) -> bool {
        false
    }
}
