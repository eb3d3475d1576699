//! Bulk-synchronous, vertex-centric computations.
//!
//! A [`PregelComputation`] declares per-node properties and a `compute` step. The
//! [`Pregel`] engine runs that step for every active node in rounds (supersteps)
//! separated by a barrier:
//!
//! 1. nodes read the messages sent to them in the previous superstep, update their
//!    own properties, send messages and may vote to halt;
//! 2. after every partition task joined, the message buffers are swapped;
//! 3. the computation converges once all nodes halted and no message was sent, or
//!    when [`PregelComputation::master_compute`] asks for it.
//!
//! A halted node is woken up by an incoming message for exactly the superstep that
//! delivers it.

mod computation;
mod config;
mod context;
mod error;
mod executor;
mod messenger;
mod node_value;
mod reducer;
mod schema;

pub use computation::PregelComputation;
pub use config::{Partitioning, PregelConfig};
pub use context::{ComputeContext, InitContext, MasterComputeContext};
pub use error::PregelError;
pub use executor::{EngineState, Outcome, Pregel, PregelResult};
pub use messenger::Messages;
pub use node_value::{NodeValue, PropertyColumn, PropertyError};
pub use reducer::{Count, Max, Min, Reducer, Sum};
pub use schema::{Element, NodeSchema, ValueType, Visibility};
