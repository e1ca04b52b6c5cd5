//! Error types for the playback engine.

use thiserror::Error;

/// Errors that can occur in the decode and playback pipeline.
///
/// Every decoder-side variant is fatal: it signals an unrecoverable
/// desynchronization between the decode service and the engine, not a
/// transient fault, so nothing in the core retries.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("No video track found in input stream")]
    NoVideoTrack,
    #[error("Stream has no keyframes; cannot build a seek index")]
    NoKeyframes,
    #[error("Decoder made no progress within {0} ms")]
    DecoderTimeout(u64),
    #[error("Unexpected result from decoder drain: {0}")]
    UnexpectedDecoderStatus(i32),
    #[error("Timed out waiting for decoded image availability")]
    ImageWaitTimeout,
    #[error("Image-ready signal raised twice before a consume; a frame could be dropped")]
    ImageSignalOverrun,
    #[error("Stream '{stream}' published twice before the frame set drained")]
    BarrierProtocolViolation { stream: String },
    #[error("Frame pool channel closed")]
    PoolClosed,
    #[error("Extractor returned no frames for keyframe at {0} us")]
    CacheUnderrun(i64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
