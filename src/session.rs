//! Session wiring: producers, barrier, and gate assembled into one playback
//! engine driven by an external clock and drained by a compositor.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::playback::{BoomerangCursor, FrameProducer, ProducerControl, ProducerHandle};
use crate::sync::{FrameSet, FrameSetBarrier, ReleaseGate};
use crate::video::{
    FrameDecoder, FramePool, FrameRangeExtractor, KeyframeIndex, MediaAsset, SampleCursor,
};

/// Input for one stream: its demuxed asset and the decode service handling it.
pub struct StreamSource {
    pub asset: MediaAsset,
    pub decoder: Box<dyn FrameDecoder>,
}

/// A running playback session.
///
/// One producer thread per stream decodes boomerang-ordered frames; the
/// barrier assembles complete frame sets; the gate paces the producers to
/// the compositor's consumption. The session lives until the process exits;
/// there is no cancellation.
pub struct PlayerSession {
    producers: Vec<ProducerHandle>,
    gate: Arc<ReleaseGate>,
    barrier: Arc<FrameSetBarrier>,
    intake_rx: Receiver<FrameSet>,
}

impl PlayerSession {
    /// Build the per-stream pipelines and spawn the producers. `sources`
    /// must line up one-to-one with `config.streams`.
    pub fn start(config: &PlayerConfig, sources: Vec<StreamSource>) -> Result<Self, PlayerError> {
        config.validate()?;
        if sources.len() != config.streams.len() {
            return Err(PlayerError::InvalidConfig(format!(
                "{} sources provided for {} configured streams",
                sources.len(),
                config.streams.len()
            )));
        }

        let names: Vec<String> = config.streams.iter().map(|s| s.name.clone()).collect();
        let (barrier, intake_rx) = FrameSetBarrier::new(names);
        let barrier = Arc::new(barrier);
        let gate = Arc::new(ReleaseGate::new());

        let mut producers = Vec::with_capacity(sources.len());
        for (stream_config, source) in config.streams.iter().zip(sources) {
            let track = source.asset.video_track()?.clone();
            if track.width != config.width || track.height != config.height {
                return Err(PlayerError::InvalidConfig(format!(
                    "stream '{}' is {}x{}, session expects {}x{}",
                    stream_config.name, track.width, track.height, config.width, config.height
                )));
            }
            let track = Arc::new(track);

            let keyframes = KeyframeIndex::scan(&track)?;
            log::info!(
                "Stream '{}': {} keyframes, cache range {}",
                stream_config.name,
                keyframes.len(),
                stream_config.cache_range
            );

            let extractor = FrameRangeExtractor::new(
                SampleCursor::new(Arc::clone(&track)),
                source.decoder,
                FramePool::new(config.width, config.height, stream_config.history_size),
                stream_config.cache_range,
            );
            let cursor = BoomerangCursor::new(keyframes, extractor);

            let control = Arc::new(ProducerControl::new());
            gate.register(Arc::clone(&control));
            producers.push(FrameProducer::spawn(
                stream_config.name.clone(),
                cursor,
                control,
                Arc::clone(&barrier),
            ));
        }

        Ok(Self {
            producers,
            gate,
            barrier,
            intake_rx,
        })
    }

    /// External clock callback: broadcast this cycle's release permission.
    /// Returns the permission for instrumentation.
    pub fn tick(&self) -> bool {
        self.gate.tick()
    }

    /// Non-blocking compositor intake.
    pub fn try_take_frame_set(&self) -> Option<FrameSet> {
        self.intake_rx.try_recv().ok()
    }

    /// Compositor intake with a bounded wait for the next complete set.
    pub fn take_frame_set(&self, timeout: Duration) -> Option<FrameSet> {
        self.intake_rx.recv_timeout(timeout).ok()
    }

    /// Consumption callback: the compositor is done reading `set`. Returns
    /// every buffer to its pool and feeds the gate's backpressure signal.
    pub fn frame_consumed(&self, set: FrameSet) {
        set.recycle();
        self.gate.frame_consumed();
    }

    /// Detach every producer from (or reattach it to) the external clock.
    pub fn set_detached(&self, detached: bool) {
        log::info!("Playback detached from clock: {}", detached);
        for producer in &self.producers {
            producer.control.set_detached(detached);
        }
    }

    /// Frames dispatched per stream since the session started.
    pub fn dispatched(&self) -> Vec<(String, u64)> {
        self.producers
            .iter()
            .map(|producer| (producer.name.clone(), producer.dispatched()))
            .collect()
    }

    /// Frame sets completed by the barrier.
    pub fn completed_sets(&self) -> u64 {
        self.barrier.completed_sets()
    }

    /// False once any producer has died of a fatal decode error.
    pub fn is_healthy(&self) -> bool {
        self.producers.iter().all(|producer| !producer.is_finished())
    }
}
