//! Per-stream frame producer threads and their release control.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::PlayerError;
use crate::playback::boomerang::BoomerangCursor;
use crate::sync::FrameSetBarrier;

#[derive(Debug, Default)]
struct ControlState {
    permitted: bool,
    detached: bool,
}

/// Release flags for one producer.
///
/// `permitted` is written by the release gate, `detached` by the user
/// control surface; both are read by the owning producer thread, which
/// parks on the condvar instead of polling.
#[derive(Default)]
pub struct ProducerControl {
    state: Mutex<ControlState>,
    wake: Condvar,
}

impl ProducerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant or revoke permission to publish one frame.
    pub fn set_permitted(&self, permitted: bool) {
        let mut state = self.state.lock().unwrap();
        state.permitted = permitted;
        if permitted {
            self.wake.notify_all();
        }
    }

    /// Attach to or detach from the external clock. Detached producers
    /// free-run, paced only by buffer availability.
    pub fn set_detached(&self, detached: bool) {
        let mut state = self.state.lock().unwrap();
        state.detached = detached;
        if detached {
            self.wake.notify_all();
        }
    }

    pub fn is_permitted(&self) -> bool {
        self.state.lock().unwrap().permitted
    }

    pub fn is_detached(&self) -> bool {
        self.state.lock().unwrap().detached
    }

    /// Block until a dispatch is allowed, consuming the permission. Each
    /// grant releases at most one frame; detached mode releases freely.
    pub fn await_release(&self) {
        let mut state = self.state.lock().unwrap();
        while !(state.detached || state.permitted) {
            state = self.wake.wait(state).unwrap();
        }
        state.permitted = false;
    }
}

/// Handle to a running producer thread.
pub struct ProducerHandle {
    /// Stream name this producer publishes under
    pub name: String,
    /// Release flags shared with the gate and the user control surface
    pub control: Arc<ProducerControl>,
    dispatched: Arc<AtomicU64>,
    join: JoinHandle<Result<(), PlayerError>>,
}

impl ProducerHandle {
    /// Frames published so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Whether the producer thread has terminated (only fatal decode errors
    /// do that).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Join the thread and surface its fatal error, if any.
    pub fn join(self) -> Result<(), PlayerError> {
        match self.join.join() {
            Ok(result) => result,
            Err(_) => Err(PlayerError::PoolClosed),
        }
    }
}

/// Spawns and runs one producer loop per stream.
pub struct FrameProducer;

impl FrameProducer {
    /// Spawn the producer thread for `name`. The loop runs for the session
    /// lifetime; there is no cancellation.
    pub fn spawn(
        name: String,
        mut cursor: BoomerangCursor,
        control: Arc<ProducerControl>,
        barrier: Arc<FrameSetBarrier>,
    ) -> ProducerHandle {
        let dispatched = Arc::new(AtomicU64::new(0));
        let thread_control = Arc::clone(&control);
        let thread_dispatched = Arc::clone(&dispatched);
        let thread_name = name.clone();

        let join = thread::spawn(move || {
            Self::run(
                &thread_name,
                &mut cursor,
                &thread_control,
                &barrier,
                &thread_dispatched,
            )
        });

        ProducerHandle {
            name,
            control,
            dispatched,
            join,
        }
    }

    fn run(
        name: &str,
        cursor: &mut BoomerangCursor,
        control: &ProducerControl,
        barrier: &FrameSetBarrier,
        dispatched: &AtomicU64,
    ) -> Result<(), PlayerError> {
        log::info!("Producer '{}' started", name);
        loop {
            control.await_release();
            let frame = match cursor.next() {
                Ok(frame) => frame,
                Err(error) => {
                    log::error!("Producer '{}' decode failed: {}", name, error);
                    return Err(error);
                }
            };
            match barrier.publish(name, frame) {
                Ok(()) => {
                    dispatched.fetch_add(1, Ordering::Relaxed);
                }
                Err(PlayerError::BarrierProtocolViolation { .. }) => {
                    // The late frame was rejected and recycled; this stream
                    // is outrunning its peers.
                    log::warn!("Producer '{}' published before the barrier drained", name);
                }
                Err(error) => {
                    log::error!("Producer '{}' publish failed: {}", name, error);
                    return Err(error);
                }
            }
        }
    }
}
