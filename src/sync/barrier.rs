//! Synchronization barrier collecting one frame per stream.
//!
//! Producers publish independently; the barrier becomes complete only when
//! every configured stream has contributed a fresh frame, then hands the
//! full set to the compositor intake in one atomic step and resets.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::PlayerError;
use crate::video::FrameBuffer;

/// A complete set of frames, one per stream, ready for compositing.
#[derive(Debug)]
pub struct FrameSet {
    frames: HashMap<String, FrameBuffer>,
}

impl FrameSet {
    /// Frame published under `name`.
    pub fn get(&self, name: &str) -> Option<&FrameBuffer> {
        self.frames.get(name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Return every buffer in the set to its pool.
    pub fn recycle(self) {
        for (_, frame) in self.frames {
            frame.recycle();
        }
    }
}

#[derive(Default)]
struct BarrierState {
    pending: HashSet<String>,
    frames: HashMap<String, FrameBuffer>,
}

/// Multi-producer barrier with an atomic publish-check-drain transition.
pub struct FrameSetBarrier {
    expected: HashSet<String>,
    state: Mutex<BarrierState>,
    intake_tx: Sender<FrameSet>,
    completed_sets: AtomicU64,
    on_complete: Option<Box<dyn Fn() + Send + Sync>>,
}

impl FrameSetBarrier {
    /// Create a barrier for the given stream names and the intake channel
    /// the compositor drains.
    pub fn new(names: impl IntoIterator<Item = String>) -> (Self, Receiver<FrameSet>) {
        let (intake_tx, intake_rx) = unbounded();
        let barrier = Self {
            expected: names.into_iter().collect(),
            state: Mutex::new(BarrierState::default()),
            intake_tx,
            completed_sets: AtomicU64::new(0),
            on_complete: None,
        };
        (barrier, intake_rx)
    }

    /// Install a callback invoked once per completed frame set.
    pub fn with_completion_callback(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Record `frame` as the latest for `name`. Publishing a name already
    /// pending (or one the barrier does not know) is a protocol violation:
    /// the frame is rejected and recycled, never silently merged.
    pub fn publish(&self, name: &str, frame: FrameBuffer) -> Result<(), PlayerError> {
        let mut state = self.state.lock().unwrap();

        if !self.expected.contains(name) || state.pending.contains(name) {
            drop(state);
            log::warn!("Rejecting duplicate or unknown publish for '{}'", name);
            frame.recycle();
            return Err(PlayerError::BarrierProtocolViolation {
                stream: name.to_string(),
            });
        }

        log::debug!(
            "Frame published for '{}' at {} us ({}/{})",
            name,
            frame.timestamp_us,
            state.pending.len() + 1,
            self.expected.len()
        );
        state.frames.insert(name.to_string(), frame);
        state.pending.insert(name.to_string());

        if state.pending.len() == self.expected.len() {
            // All streams released a frame. Take and reset under the lock so
            // a racing publish cannot double-trigger completion or get lost;
            // the send itself never blocks.
            let frames = std::mem::take(&mut state.frames);
            state.pending.clear();
            drop(state);

            self.intake_tx
                .send(FrameSet { frames })
                .map_err(|_| PlayerError::PoolClosed)?;
            self.completed_sets.fetch_add(1, Ordering::Relaxed);
            if let Some(callback) = &self.on_complete {
                callback();
            }
        }
        Ok(())
    }

    /// Frame sets completed since construction.
    pub fn completed_sets(&self) -> u64 {
        self.completed_sets.load(Ordering::Relaxed)
    }

    /// Stream names this barrier waits for.
    pub fn stream_count(&self) -> usize {
        self.expected.len()
    }
}
