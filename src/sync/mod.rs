//! Synchronization module: the frame-set barrier and the vsync release gate.

mod barrier;
mod gate;

pub use barrier::{FrameSet, FrameSetBarrier};
pub use gate::ReleaseGate;
