//! Session configuration types.

use serde::{Deserialize, Serialize};

use crate::error::PlayerError;

/// Configuration for one playback stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Layer name the compositor resolves this stream under
    pub name: String,
    /// Frames decoded per cache replenishment; 1 if every frame is a
    /// keyframe, 5 if every fifth frame is one, etc.
    pub cache_range: usize,
    /// Buffers owned by this stream's pool. Must cover one full cache range
    /// plus the frames still in flight towards the compositor.
    pub history_size: usize,
}

impl StreamConfig {
    /// Create a stream config with a pool sized for the given cache range.
    pub fn new(name: impl Into<String>, cache_range: usize) -> Self {
        Self {
            name: name.into(),
            cache_range,
            // One extra in the barrier, one with the compositor.
            history_size: cache_range + 2,
        }
    }
}

/// Configuration for a playback session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Decoded frame width in pixels
    pub width: u32,
    /// Decoded frame height in pixels
    pub height: u32,
    /// Streams to decode and composite, one producer each
    pub streams: Vec<StreamConfig>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: 350,
            height: 350,
            streams: vec![
                StreamConfig::new("background", 5),
                StreamConfig::new("effect", 1),
                StreamConfig::new("alpha", 1),
            ],
        }
    }
}

impl PlayerConfig {
    /// Validate the configuration before a session is built.
    pub fn validate(&self) -> Result<(), PlayerError> {
        if self.width == 0 || self.height == 0 {
            return Err(PlayerError::InvalidConfig(
                "frame dimensions must be non-zero".into(),
            ));
        }
        if self.streams.is_empty() {
            return Err(PlayerError::InvalidConfig("no streams configured".into()));
        }
        for stream in &self.streams {
            if stream.cache_range == 0 {
                return Err(PlayerError::InvalidConfig(format!(
                    "stream '{}': cache_range must be at least 1",
                    stream.name
                )));
            }
            if stream.history_size < stream.cache_range {
                return Err(PlayerError::InvalidConfig(format!(
                    "stream '{}': history_size {} is smaller than cache_range {}",
                    stream.name, stream.history_size, stream.cache_range
                )));
            }
        }
        let mut names: Vec<&str> = self.streams.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.streams.len() {
            return Err(PlayerError::InvalidConfig(
                "stream names must be unique".into(),
            ));
        }
        Ok(())
    }

    /// Bytes per decoded RGBA8 frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}
