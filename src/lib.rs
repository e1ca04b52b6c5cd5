//! Boomerang Player Library
//!
//! A looping, reversible playback engine that decodes multiple video streams
//! in parallel and assembles one complete frame set per external clock tick
//! for compositing.

pub mod config;
pub mod error;
pub mod playback;
pub mod session;
pub mod sync;
pub mod video;

// Re-export commonly used types
pub use config::{PlayerConfig, StreamConfig};
pub use error::PlayerError;
pub use playback::{BoomerangCursor, Direction, FrameProducer, ProducerControl};
pub use session::{PlayerSession, StreamSource};
pub use sync::{FrameSet, FrameSetBarrier, ReleaseGate};
pub use video::{
    FrameBuffer, FrameDecoder, FramePool, FrameRangeExtractor, KeyframeIndex, MediaAsset,
    SyntheticDecoder,
};
