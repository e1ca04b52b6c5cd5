//! Decode-service boundary and the synthetic decoder used for tests and demos.
//!
//! The hardware decoder is an external collaborator; the engine only depends
//! on the `FrameDecoder` trait. `SyntheticDecoder` implements the same
//! feed/drain/release protocol with deterministic generated pixels, so the
//! whole pipeline runs (and is tested) without any hardware service.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use bytes::Bytes;

use crate::error::PlayerError;
use crate::video::stream::{MediaAsset, Sample, SampleFlags, Track, TrackKind};

/// How long to wait for a released image to become readable before declaring
/// the decoder stalled. A dropped notification cannot be distinguished from a
/// stalled decoder, so expiry is fatal.
pub const IMAGE_WAIT_TIMEOUT: Duration = Duration::from_millis(2500);

/// Opaque handle to a decoded image still owned by the decode service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle(pub u32);

/// Result of draining the decoder's output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// A decoded image is ready. `has_payload` is false for empty
    /// end-of-stream images that must not be rendered.
    Image {
        image: ImageHandle,
        has_payload: bool,
    },
    /// No output available yet
    TryAgain,
    /// Output buffers were reconfigured; irrelevant when rendering to a surface
    OutputBuffersChanged,
    /// Output format changed; reported once at stream start
    OutputFormatChanged,
    /// Any return code outside the known set
    Unexpected(i32),
}

/// One-shot wait/notify handoff raised once per released image.
///
/// The decode service raises the signal when the image is actually readable;
/// the extractor consumes it before copying pixels out. Raising it twice
/// before a consume means a frame could be dropped and is a protocol
/// violation.
pub struct ImageReadySignal {
    available: Mutex<bool>,
    ready: Condvar,
}

impl Default for ImageReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReadySignal {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(false),
            ready: Condvar::new(),
        }
    }

    /// Raise the signal for the most recently released image.
    pub fn raise(&self) -> Result<(), PlayerError> {
        let mut available = self.available.lock().unwrap();
        if *available {
            return Err(PlayerError::ImageSignalOverrun);
        }
        *available = true;
        self.ready.notify_all();
        Ok(())
    }

    /// Block until the signal is raised, then consume it.
    pub fn wait(&self, timeout: Duration) -> Result<(), PlayerError> {
        let mut available = self.available.lock().unwrap();
        while !*available {
            let (guard, result) = self.ready.wait_timeout(available, timeout).unwrap();
            available = guard;
            if result.timed_out() && !*available {
                return Err(PlayerError::ImageWaitTimeout);
            }
        }
        *available = false;
        Ok(())
    }

    /// Drop any pending notification. Used when the decoder is flushed.
    pub fn reset(&self) {
        *self.available.lock().unwrap() = false;
    }
}

/// Decode-service contract consumed by the frame extractor.
///
/// Maps one-to-one onto a hardware codec driven through a surface: compressed
/// samples go in through `feed`, decoded images come out through `drain`,
/// and a rendered image becomes readable only after the image-ready signal
/// fires.
pub trait FrameDecoder: Send {
    /// Offer one compressed sample. Returns false when the decoder cannot
    /// accept input right now; the caller must not advance past the sample.
    fn feed(&mut self, sample: &Sample) -> Result<bool, PlayerError>;

    /// Poll the output side.
    fn drain(&mut self) -> Result<DrainStatus, PlayerError>;

    /// Hand the image back to the service. With `render` set the image is
    /// forwarded to the output surface and the image-ready signal will fire
    /// once it is readable.
    fn release_image(&mut self, image: ImageHandle, render: bool) -> Result<(), PlayerError>;

    /// Copy the pixels of the last rendered image into `dst` (RGBA8).
    /// Only valid after the image-ready signal for that image was consumed.
    fn read_pixels(&mut self, dst: &mut [u8]) -> Result<(), PlayerError>;

    /// Clear all internal decode state so the next feed starts clean.
    fn flush(&mut self) -> Result<(), PlayerError>;

    /// The signal this decoder raises for rendered images.
    fn image_signal(&self) -> Arc<ImageReadySignal>;
}

/// How many samples the synthetic decoder buffers before refusing input.
const SYNTHETIC_INPUT_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy)]
struct PendingImage {
    id: u32,
    seed: u64,
}

/// Deterministic software decoder for tests and demos.
///
/// Each synthetic sample carries a seed; "decoding" expands the seed into a
/// gradient test pattern. The feed/drain/release/signal protocol matches the
/// hardware contract, including input backpressure and the one-time
/// format-changed status.
pub struct SyntheticDecoder {
    width: u32,
    height: u32,
    pending: VecDeque<PendingImage>,
    rendered: Option<PendingImage>,
    signal: Arc<ImageReadySignal>,
    reported_format: bool,
    next_image_id: u32,
}

impl SyntheticDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pending: VecDeque::new(),
            rendered: None,
            signal: Arc::new(ImageReadySignal::new()),
            reported_format: false,
            next_image_id: 0,
        }
    }

    /// Fill `dst` with the deterministic pattern for `seed`.
    fn generate_pixels(&self, seed: u64, dst: &mut [u8]) {
        let width = self.width as usize;
        let height = self.height as usize;
        let blue = (seed.wrapping_mul(31) % 251) as u8;
        for y in 0..height {
            for x in 0..width {
                let offset = (y * width + x) * 4;
                dst[offset] = ((x * 255) / width.max(1)) as u8;
                dst[offset + 1] = ((y * 255) / height.max(1)) as u8;
                dst[offset + 2] = blue;
                dst[offset + 3] = 255;
            }
        }
    }
}

impl FrameDecoder for SyntheticDecoder {
    fn feed(&mut self, sample: &Sample) -> Result<bool, PlayerError> {
        if self.pending.len() >= SYNTHETIC_INPUT_DEPTH {
            return Ok(false);
        }
        let seed = decode_sample_seed(sample);
        let id = self.next_image_id;
        self.next_image_id = self.next_image_id.wrapping_add(1);
        self.pending.push_back(PendingImage { id, seed });
        Ok(true)
    }

    fn drain(&mut self) -> Result<DrainStatus, PlayerError> {
        if !self.reported_format {
            self.reported_format = true;
            return Ok(DrainStatus::OutputFormatChanged);
        }
        match self.pending.front() {
            Some(image) => Ok(DrainStatus::Image {
                image: ImageHandle(image.id),
                has_payload: true,
            }),
            None => Ok(DrainStatus::TryAgain),
        }
    }

    fn release_image(&mut self, image: ImageHandle, render: bool) -> Result<(), PlayerError> {
        let front = self
            .pending
            .pop_front()
            .filter(|pending| pending.id == image.0)
            .ok_or(PlayerError::UnexpectedDecoderStatus(image.0 as i32))?;
        if render {
            self.rendered = Some(front);
            self.signal.raise()?;
        }
        Ok(())
    }

    fn read_pixels(&mut self, dst: &mut [u8]) -> Result<(), PlayerError> {
        let rendered = self
            .rendered
            .ok_or(PlayerError::UnexpectedDecoderStatus(-1))?;
        self.generate_pixels(rendered.seed, dst);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PlayerError> {
        self.pending.clear();
        self.rendered = None;
        self.signal.reset();
        Ok(())
    }

    fn image_signal(&self) -> Arc<ImageReadySignal> {
        Arc::clone(&self.signal)
    }
}

/// Encode a seed into a synthetic sample payload.
fn encode_sample_seed(seed: u64) -> Bytes {
    Bytes::copy_from_slice(&seed.to_le_bytes())
}

/// Decode the seed back out of a synthetic sample payload.
fn decode_sample_seed(sample: &Sample) -> u64 {
    let mut raw = [0u8; 8];
    let len = sample.data.len().min(8);
    raw[..len].copy_from_slice(&sample.data[..len]);
    u64::from_le_bytes(raw)
}

/// Build a synthetic single-track asset for tests and demos.
///
/// Every `keyframe_interval`-th frame is a keyframe; `salt` varies the pixel
/// content between streams.
pub fn synthetic_asset(
    width: u32,
    height: u32,
    frame_count: usize,
    keyframe_interval: usize,
    frame_duration_us: i64,
    salt: u64,
) -> MediaAsset {
    let interval = keyframe_interval.max(1);
    let samples = (0..frame_count)
        .map(|index| Sample {
            data: encode_sample_seed(salt.wrapping_add(index as u64)),
            timestamp_us: index as i64 * frame_duration_us,
            flags: SampleFlags {
                sync: index % interval == 0,
            },
        })
        .collect();
    MediaAsset {
        tracks: vec![Track {
            kind: TrackKind::Video,
            format: "video/synthetic".into(),
            width,
            height,
            samples,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seed: u64) -> Sample {
        Sample {
            data: encode_sample_seed(seed),
            timestamp_us: 0,
            flags: SampleFlags::SYNC,
        }
    }

    #[test]
    fn test_feed_drain_release_cycle() {
        let mut decoder = SyntheticDecoder::new(4, 4);
        assert_eq!(decoder.drain().unwrap(), DrainStatus::OutputFormatChanged);
        assert_eq!(decoder.drain().unwrap(), DrainStatus::TryAgain);

        assert!(decoder.feed(&sample(7)).unwrap());
        let status = decoder.drain().unwrap();
        let image = match status {
            DrainStatus::Image { image, has_payload } => {
                assert!(has_payload);
                image
            }
            other => panic!("expected image, got {:?}", other),
        };

        decoder.release_image(image, true).unwrap();
        decoder.image_signal().wait(IMAGE_WAIT_TIMEOUT).unwrap();

        let mut pixels = vec![0u8; 4 * 4 * 4];
        decoder.read_pixels(&mut pixels).unwrap();
        assert_eq!(pixels[3], 255);
    }

    #[test]
    fn test_pixels_deterministic_per_seed() {
        let mut decoder = SyntheticDecoder::new(8, 8);
        let mut first = vec![0u8; 8 * 8 * 4];
        let mut second = vec![0u8; 8 * 8 * 4];
        decoder.generate_pixels(42, &mut first);
        decoder.generate_pixels(42, &mut second);
        assert_eq!(first, second);

        decoder.generate_pixels(43, &mut second);
        assert_ne!(first, second);
    }

    #[test]
    fn test_input_backpressure() {
        let mut decoder = SyntheticDecoder::new(2, 2);
        for seed in 0..SYNTHETIC_INPUT_DEPTH as u64 {
            assert!(decoder.feed(&sample(seed)).unwrap());
        }
        assert!(!decoder.feed(&sample(99)).unwrap());
    }

    #[test]
    fn test_double_raise_is_violation() {
        let signal = ImageReadySignal::new();
        signal.raise().unwrap();
        assert!(matches!(
            signal.raise(),
            Err(PlayerError::ImageSignalOverrun)
        ));
    }

    #[test]
    fn test_wait_timeout() {
        let signal = ImageReadySignal::new();
        let result = signal.wait(Duration::from_millis(10));
        assert!(matches!(result, Err(PlayerError::ImageWaitTimeout)));
    }

    #[test]
    fn test_flush_clears_state() {
        let mut decoder = SyntheticDecoder::new(2, 2);
        assert_eq!(decoder.drain().unwrap(), DrainStatus::OutputFormatChanged);
        decoder.feed(&sample(1)).unwrap();
        decoder.flush().unwrap();
        assert_eq!(decoder.drain().unwrap(), DrainStatus::TryAgain);
    }

    #[test]
    fn test_synthetic_asset_keyframe_spacing() {
        let asset = synthetic_asset(4, 4, 10, 5, 1000, 0);
        let track = asset.video_track().unwrap();
        let syncs: Vec<i64> = track
            .samples
            .iter()
            .filter(|s| s.flags.sync)
            .map(|s| s.timestamp_us)
            .collect();
        assert_eq!(syncs, vec![0, 5000]);
    }
}
