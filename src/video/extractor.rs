//! Keyframe-anchored frame range extraction.
//!
//! Seeks the sample cursor to the keyframe at or before a target timestamp,
//! then pumps the decoder (feed input, drain output) until a bounded run of
//! consecutive frames has been copied into pool buffers.

use std::time::{Duration, Instant};

use crate::error::PlayerError;
use crate::video::decoder::{DrainStatus, FrameDecoder, IMAGE_WAIT_TIMEOUT};
use crate::video::frame_pool::{FrameBuffer, FramePool};
use crate::video::stream::{SampleCursor, SeekPolicy};

/// How long the pump loop tolerates zero progress on both the input and the
/// output side before declaring the decoder stalled.
const DECODE_PROGRESS_TIMEOUT: Duration = Duration::from_millis(2500);

/// Pause between polls while the decoder is catching up.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Extracts bounded runs of decoded frames starting at arbitrary keyframes.
pub struct FrameRangeExtractor {
    cursor: SampleCursor,
    decoder: Box<dyn FrameDecoder>,
    pool: FramePool,
    range: usize,
}

impl FrameRangeExtractor {
    pub fn new(
        cursor: SampleCursor,
        decoder: Box<dyn FrameDecoder>,
        pool: FramePool,
        range: usize,
    ) -> Self {
        Self {
            cursor,
            decoder,
            pool,
            range,
        }
    }

    /// Decode up to `range` consecutive frames starting at the keyframe at or
    /// before `start_us`.
    ///
    /// The decoder is flushed on completion: decode state is stream-global
    /// and the next extraction may resume from any keyframe, not just the
    /// forward continuation of this one.
    pub fn extract(&mut self, start_us: i64) -> Result<Vec<FrameBuffer>, PlayerError> {
        self.cursor
            .seek(start_us, SeekPolicy::NearestKeyframeAtOrBefore);

        let mut frames = Vec::with_capacity(self.range);
        let mut input_done = false;
        let mut output_done = false;
        let mut last_fed_pts_us = start_us;
        let mut last_progress = Instant::now();
        let mut copy_time = Duration::ZERO;

        while !output_done {
            let mut progressed = false;

            // Feed more data to the decoder.
            if !input_done {
                match self.cursor.current() {
                    Some(sample) => {
                        if self.decoder.feed(sample)? {
                            last_fed_pts_us = sample.timestamp_us;
                            progressed = true;
                            if !self.cursor.advance() {
                                input_done = true;
                            }
                        }
                    }
                    None => input_done = true,
                }
            }

            match self.decoder.drain()? {
                DrainStatus::Image { image, has_payload } => {
                    progressed = true;
                    // The image is forwarded to the output surface on
                    // release; it only becomes readable once the one-shot
                    // image-ready signal fires.
                    self.decoder.release_image(image, has_payload)?;
                    if has_payload {
                        self.decoder.image_signal().wait(IMAGE_WAIT_TIMEOUT)?;
                        let copy_start = Instant::now();
                        let mut buffer = self.pool.acquire(frames.len(), last_fed_pts_us)?;
                        self.decoder.read_pixels(buffer.data_mut())?;
                        copy_time += copy_start.elapsed();
                        frames.push(buffer);
                        if frames.len() >= self.range {
                            output_done = true;
                        }
                    }
                }
                DrainStatus::TryAgain => {
                    // Once input is exhausted an empty drain means the
                    // pipeline is dry.
                    if input_done {
                        output_done = true;
                    }
                }
                DrainStatus::OutputBuffersChanged | DrainStatus::OutputFormatChanged => {
                    // Irrelevant when the decoder renders to a surface.
                    progressed = true;
                }
                DrainStatus::Unexpected(code) => {
                    return Err(PlayerError::UnexpectedDecoderStatus(code));
                }
            }

            if progressed {
                last_progress = Instant::now();
            } else {
                if last_progress.elapsed() >= DECODE_PROGRESS_TIMEOUT {
                    return Err(PlayerError::DecoderTimeout(
                        DECODE_PROGRESS_TIMEOUT.as_millis() as u64,
                    ));
                }
                std::thread::sleep(DRAIN_POLL_INTERVAL);
            }
        }

        log::debug!(
            "Extracted pixels for {} frames from {} us in {} ms",
            frames.len(),
            start_us,
            copy_time.as_millis()
        );

        self.decoder.flush()?;
        self.decoder.image_signal().reset();
        Ok(frames)
    }

    /// Frames produced per extraction.
    pub fn range(&self) -> usize {
        self.range
    }
}
