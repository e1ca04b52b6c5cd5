//! Vsync-driven release gate pacing producers to the compositor's drain rate.

use std::sync::{Arc, Mutex};

use crate::playback::ProducerControl;

#[derive(Debug)]
struct GateState {
    /// True until the compositor has received its first complete frame set.
    /// The first cycle must fire unconditionally to prime the pipeline.
    first_set_pending: bool,
    /// Set by the consumption callback, cleared once per tick. The sole
    /// backpressure signal keeping producers behind the compositor.
    consumed_since_tick: bool,
}

/// Computes, once per external clock tick, whether producers may publish
/// again, based on whether the previous cycle's output was actually
/// consumed. Robust to irregular tick intervals: each tick is an
/// independent snapshot-and-clear of the consumption flag.
pub struct ReleaseGate {
    state: Mutex<GateState>,
    producers: Mutex<Vec<Arc<ProducerControl>>>,
}

impl Default for ReleaseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                first_set_pending: true,
                consumed_since_tick: false,
            }),
            producers: Mutex::new(Vec::new()),
        }
    }

    /// Register a producer to receive permission broadcasts.
    pub fn register(&self, control: Arc<ProducerControl>) {
        self.producers.lock().unwrap().push(control);
    }

    /// External clock callback. Broadcasts the permission for this cycle to
    /// every registered producer and returns it.
    pub fn tick(&self) -> bool {
        let permitted = {
            let mut state = self.state.lock().unwrap();
            let permitted = state.first_set_pending || state.consumed_since_tick;
            state.consumed_since_tick = false;
            permitted
        };
        for control in self.producers.lock().unwrap().iter() {
            control.set_permitted(permitted);
        }
        permitted
    }

    /// Consumption callback, invoked exactly once per frame set the
    /// compositor has read.
    pub fn frame_consumed(&self) {
        let mut state = self.state.lock().unwrap();
        state.first_set_pending = false;
        state.consumed_since_tick = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_always_permits() {
        let gate = ReleaseGate::new();
        let control = Arc::new(ProducerControl::new());
        gate.register(Arc::clone(&control));

        assert!(gate.tick());
        assert!(control.is_permitted());
    }

    #[test]
    fn test_unconsumed_cycle_blocks_next_tick() {
        let gate = ReleaseGate::new();
        gate.frame_consumed(); // first set arrived, priming over
        assert!(gate.tick()); // consumption pending from above
        assert!(!gate.tick()); // nothing consumed since
    }

    #[test]
    fn test_consumption_between_ticks_permits() {
        let gate = ReleaseGate::new();
        gate.frame_consumed();
        gate.tick();
        gate.tick(); // blocked

        gate.frame_consumed();
        assert!(gate.tick());
        assert!(!gate.tick());
    }

    #[test]
    fn test_priming_survives_unconsumed_ticks() {
        let gate = ReleaseGate::new();
        // Until the first set is consumed, every tick keeps permitting so a
        // slow startup cannot wedge the pipeline.
        assert!(gate.tick());
        assert!(gate.tick());
        gate.frame_consumed();
        assert!(gate.tick());
        assert!(!gate.tick());
    }

    #[test]
    fn test_broadcast_reaches_all_producers() {
        let gate = ReleaseGate::new();
        let controls: Vec<_> = (0..3).map(|_| Arc::new(ProducerControl::new())).collect();
        for control in &controls {
            gate.register(Arc::clone(control));
        }
        gate.tick();
        for control in &controls {
            assert!(control.is_permitted());
        }
    }
}
