//! Lock-free "best value so far" relaxation.
//!
//! [`SignBitLock`] is the reusable part: a per-element lock living in the sign bit of
//! an otherwise meaningful non-negative field. [`DistanceTracker`] applies it to the
//! shortest-path triple; the same shape fits any per-node best value that must move
//! together with an auxiliary payload.

pub mod distance;
pub mod sign_lock;

pub use distance::{DistanceTracker, Exchange, RelaxOutcome, NO_PREDECESSOR};
pub use sign_lock::{Contended, SignBitGuard, SignBitLock};
