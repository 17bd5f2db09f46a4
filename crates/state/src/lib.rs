//! Pointer state samples and the coalescing queue that buffers them.
//!
//! A producer pushes [`PointerState`] samples into a shared [`StateQueue`];
//! the protocol handler drains it one reported sample per read request,
//! collapsing bursts of equivalent motion into the freshest sample while
//! keeping every button edge, scroll direction change and large jump.

mod queue;
mod state;

pub use queue::StateQueue;
pub use state::{LEFT_BUTTON, PointerState, RIGHT_BUTTON, WheelDirection};

/// Displacement (per axis, relative to the last delivered sample) at or
/// beyond which a queued sample is never merged into an earlier one.
pub const COALESCE_DISTANCE: u32 = 300;
