//! Keyframe index built from a one-time scan of a video track.

use crate::error::PlayerError;
use crate::video::stream::Track;

/// Ordered presentation timestamps of every keyframe in a track.
///
/// Built once per stream at startup with a single blocking pass, read-only
/// afterwards. Segment `i` spans keyframe `i` to keyframe `i + 1` and is the
/// unit of cache replenishment.
#[derive(Debug, Clone)]
pub struct KeyframeIndex {
    timestamps_us: Vec<i64>,
}

impl KeyframeIndex {
    /// Scan every sample once, recording the timestamp of each sync sample
    /// in decode order.
    pub fn scan(track: &Track) -> Result<Self, PlayerError> {
        let mut timestamps_us = Vec::new();
        for sample in &track.samples {
            if sample.flags.sync {
                timestamps_us.push(sample.timestamp_us);
            }
        }
        if timestamps_us.is_empty() {
            return Err(PlayerError::NoKeyframes);
        }
        log::debug!(
            "Keyframe scan found {} keyframes over {} samples",
            timestamps_us.len(),
            track.samples.len()
        );
        Ok(Self { timestamps_us })
    }

    /// Number of keyframes in the index.
    pub fn len(&self) -> usize {
        self.timestamps_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps_us.is_empty()
    }

    /// Timestamp of keyframe `index` in microseconds.
    pub fn timestamp_us(&self, index: usize) -> i64 {
        self.timestamps_us[index]
    }
}
