//! Demuxed media assets and sample-level access.
//!
//! A `MediaAsset` is the parsed container: tracks of compressed samples with
//! their presentation timestamps and flags. The engine only ever touches the
//! first video track; everything else is skipped at open time.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::PlayerError;

/// Kind of track inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

/// Per-sample flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleFlags {
    /// Sample is a keyframe: fully self-contained, valid as a decode start.
    pub sync: bool,
}

impl SampleFlags {
    pub const SYNC: SampleFlags = SampleFlags { sync: true };
}

/// One compressed sample from a track.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Compressed payload
    pub data: Bytes,
    /// Presentation timestamp in microseconds
    pub timestamp_us: i64,
    /// Sample flags
    pub flags: SampleFlags,
}

/// A single demuxed track.
#[derive(Debug, Clone)]
pub struct Track {
    pub kind: TrackKind,
    /// Format string, e.g. "video/avc"
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Samples in decode order
    pub samples: Vec<Sample>,
}

/// A demuxed media asset. Immutable after creation.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub tracks: Vec<Track>,
}

impl MediaAsset {
    /// Select the first video track, the only one the engine decodes.
    pub fn video_track(&self) -> Result<&Track, PlayerError> {
        for (index, track) in self.tracks.iter().enumerate() {
            log::debug!("Format for track {} is {}", index, track.format);
            if track.kind == TrackKind::Video {
                return Ok(track);
            }
        }
        Err(PlayerError::NoVideoTrack)
    }
}

/// Seek policy for positioning a sample cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekPolicy {
    /// Land on the keyframe at or before the target timestamp.
    NearestKeyframeAtOrBefore,
}

/// Read cursor over a track's samples.
///
/// Mirrors the demux half of the decode-service contract: seek to a
/// keyframe, then read and advance sample by sample.
pub struct SampleCursor {
    track: Arc<Track>,
    position: usize,
}

impl SampleCursor {
    pub fn new(track: Arc<Track>) -> Self {
        Self { track, position: 0 }
    }

    /// Position the cursor according to the seek policy.
    pub fn seek(&mut self, timestamp_us: i64, policy: SeekPolicy) {
        match policy {
            SeekPolicy::NearestKeyframeAtOrBefore => {
                let mut target = 0;
                for (index, sample) in self.track.samples.iter().enumerate() {
                    if sample.timestamp_us > timestamp_us {
                        break;
                    }
                    if sample.flags.sync {
                        target = index;
                    }
                }
                self.position = target;
            }
        }
    }

    /// The sample under the cursor, or `None` once input is exhausted.
    pub fn current(&self) -> Option<&Sample> {
        self.track.samples.get(self.position)
    }

    /// Advance past the current sample. Returns false at end of input.
    pub fn advance(&mut self) -> bool {
        if self.position < self.track.samples.len() {
            self.position += 1;
        }
        self.position < self.track.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_with_syncs(timestamps: &[(i64, bool)]) -> Track {
        Track {
            kind: TrackKind::Video,
            format: "video/avc".into(),
            width: 16,
            height: 16,
            samples: timestamps
                .iter()
                .map(|&(timestamp_us, sync)| Sample {
                    data: Bytes::new(),
                    timestamp_us,
                    flags: SampleFlags { sync },
                })
                .collect(),
        }
    }

    #[test]
    fn test_video_track_selection_skips_audio() {
        let asset = MediaAsset {
            tracks: vec![
                Track {
                    kind: TrackKind::Audio,
                    format: "audio/mp4a-latm".into(),
                    width: 0,
                    height: 0,
                    samples: vec![],
                },
                track_with_syncs(&[(0, true)]),
            ],
        };
        let track = asset.video_track().unwrap();
        assert_eq!(track.kind, TrackKind::Video);
    }

    #[test]
    fn test_no_video_track() {
        let asset = MediaAsset { tracks: vec![] };
        assert!(matches!(asset.video_track(), Err(PlayerError::NoVideoTrack)));
    }

    #[test]
    fn test_seek_lands_on_keyframe_at_or_before() {
        let track = Arc::new(track_with_syncs(&[
            (0, true),
            (1000, false),
            (2000, true),
            (3000, false),
            (4000, true),
        ]));
        let mut cursor = SampleCursor::new(track);

        cursor.seek(3000, SeekPolicy::NearestKeyframeAtOrBefore);
        assert_eq!(cursor.current().unwrap().timestamp_us, 2000);

        cursor.seek(4000, SeekPolicy::NearestKeyframeAtOrBefore);
        assert_eq!(cursor.current().unwrap().timestamp_us, 4000);

        cursor.seek(500, SeekPolicy::NearestKeyframeAtOrBefore);
        assert_eq!(cursor.current().unwrap().timestamp_us, 0);
    }

    #[test]
    fn test_advance_to_exhaustion() {
        let track = Arc::new(track_with_syncs(&[(0, true), (1000, false)]));
        let mut cursor = SampleCursor::new(track);
        assert!(cursor.advance());
        assert!(!cursor.advance());
        assert!(cursor.current().is_none());
    }
}
