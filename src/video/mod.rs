//! Video module: demuxed streams, the decode-service boundary, and
//! keyframe-indexed frame extraction.

mod decoder;
mod extractor;
mod frame_pool;
mod keyframes;
mod stream;

pub use decoder::{
    synthetic_asset, DrainStatus, FrameDecoder, ImageHandle, ImageReadySignal, SyntheticDecoder,
    IMAGE_WAIT_TIMEOUT,
};
pub use extractor::FrameRangeExtractor;
pub use frame_pool::{FrameBuffer, FramePool};
pub use keyframes::KeyframeIndex;
pub use stream::{MediaAsset, Sample, SampleCursor, SampleFlags, SeekPolicy, Track, TrackKind};
