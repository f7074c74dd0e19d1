use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;

pub const STALL_NOTICE: &str = "Unable to load stream. Check your connection or the video forwarder. Close this message to reload the stream.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BufferState {
    Dormant,
    Armed,
    Counting,
    Tripped,
}

/// Stall detection for one player.
///
/// The watchdog never retries on its own. Once tripped it stays tripped until
/// the user acknowledges the notice, so an unreachable forwarder cannot turn
/// into a tight reload loop.
#[derive(Debug, Clone)]
pub struct BufferWatchdog {
    state: BufferState,

    /// Wait window granted to a stall
    budget: f64,

    /// Amount removed from the remaining budget per countdown tick
    tick_delta: f64,

    /// Budget left in the current countdown
    remaining: f64,

    /// Times the watchdog has tripped (statistics)
    trips: u64,
}

impl Default for BufferWatchdog {
    fn default() -> Self {
        Self::new(15.0, 0.5)
    }
}

impl BufferWatchdog {
    pub fn new(budget: f64, tick_delta: f64) -> Self {
        Self {
            state: BufferState::Dormant,
            budget,
            tick_delta,
            remaining: budget,
            trips: 0,
        }
    }

    pub fn from_config(cfg: &SyncConfig) -> Self {
        Self::new(cfg.stall_budget, cfg.stall_tick)
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn trips(&self) -> u64 {
        self.trips
    }

    /// Playback counts as active while armed or counting.
    pub fn is_active(&self) -> bool {
        matches!(self.state, BufferState::Armed | BufferState::Counting)
    }

    /// Arms the watchdog when playback runs on an acquired stream clock.
    /// Returns `true` on the `Dormant -> Armed` transition.
    pub fn arm(&mut self, playing: bool, baseline_acquired: bool) -> bool {
        if self.state == BufferState::Dormant && playing && baseline_acquired {
            debug!("watchdog armed");
            self.state = BufferState::Armed;
            return true;
        }
        false
    }

    /// Returns `true` when a countdown starts. Repeated stall signals do not
    /// restart it.
    pub fn on_stall(&mut self) -> bool {
        if self.state != BufferState::Armed {
            return false;
        }
        self.state = BufferState::Counting;
        self.remaining = self.budget;
        debug!("playback stalled, waiting {}", self.budget);
        true
    }

    /// Returns `true` when a running countdown was cancelled.
    pub fn on_resume(&mut self) -> bool {
        if self.state != BufferState::Counting {
            return false;
        }
        debug!(
            "playback resumed with {} of {} left",
            self.remaining, self.budget
        );
        self.state = BufferState::Armed;
        self.remaining = self.budget;
        true
    }

    /// A user pause disarms. Returns `true` when a countdown was cancelled.
    pub fn on_pause(&mut self) -> bool {
        match self.state {
            BufferState::Armed => {
                self.state = BufferState::Dormant;
                false
            }
            BufferState::Counting => {
                self.state = BufferState::Dormant;
                self.remaining = self.budget;
                true
            }
            BufferState::Dormant | BufferState::Tripped => false,
        }
    }

    /// One countdown step. Returns `true` exactly on the tick that trips.
    pub fn tick(&mut self) -> bool {
        if self.state != BufferState::Counting {
            return false;
        }
        self.remaining -= self.tick_delta;
        if self.remaining <= 0.0 {
            self.state = BufferState::Tripped;
            self.trips += 1;
            warn!("stall exceeded {}, giving up on the stream", self.budget);
            return true;
        }
        false
    }

    /// User closed the notice. Returns `true` on the `Tripped -> Dormant`
    /// transition, after which the stream has to be reloaded.
    pub fn acknowledge(&mut self) -> bool {
        if self.state != BufferState::Tripped {
            return false;
        }
        info!("stall notice acknowledged");
        self.reset();
        true
    }

    pub fn reset(&mut self) {
        self.state = BufferState::Dormant;
        self.remaining = self.budget;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed() -> BufferWatchdog {
        let mut watchdog = BufferWatchdog::default();
        assert!(watchdog.arm(true, true));
        watchdog
    }

    #[test]
    fn test_arm_requires_baseline() {
        let mut watchdog = BufferWatchdog::default();
        assert!(!watchdog.arm(true, false));
        assert!(!watchdog.arm(false, true));
        assert_eq!(watchdog.state(), BufferState::Dormant);
        assert!(!watchdog.on_stall());
        assert!(watchdog.arm(true, true));
        assert!(!watchdog.arm(true, true));
        assert_eq!(watchdog.state(), BufferState::Armed);
    }

    #[test]
    fn test_stall_is_idempotent() {
        let mut watchdog = armed();
        assert!(watchdog.on_stall());
        watchdog.tick();
        let remaining = watchdog.remaining();
        assert!(!watchdog.on_stall());
        assert_eq!(watchdog.remaining(), remaining);
        assert_eq!(watchdog.state(), BufferState::Counting);
    }

    #[test]
    fn test_resume_discards_elapsed() {
        let mut watchdog = armed();
        watchdog.on_stall();
        for _ in 0..10 {
            watchdog.tick();
        }
        assert_eq!(watchdog.remaining(), 10.0);
        assert!(watchdog.on_resume());
        assert_eq!(watchdog.state(), BufferState::Armed);
        assert_eq!(watchdog.remaining(), 15.0);
        assert!(!watchdog.on_resume());
    }

    #[test]
    fn test_trips_after_budget() {
        let mut watchdog = armed();
        watchdog.on_stall();
        let mut tripped = 0;
        for i in 1..=30 {
            if watchdog.tick() {
                tripped += 1;
                assert_eq!(i, 30);
            }
        }
        assert_eq!(tripped, 1);
        assert_eq!(watchdog.state(), BufferState::Tripped);
        assert!(!watchdog.is_active());

        // ticks after tripping do nothing
        assert!(!watchdog.tick());
        assert_eq!(watchdog.trips(), 1);
    }

    #[test]
    fn test_tripped_needs_acknowledgment() {
        let mut watchdog = armed();
        watchdog.on_stall();
        while !watchdog.tick() {}

        assert!(!watchdog.on_resume());
        assert!(!watchdog.on_pause());
        assert!(!watchdog.arm(true, true));
        assert_eq!(watchdog.state(), BufferState::Tripped);

        assert!(watchdog.acknowledge());
        assert_eq!(watchdog.state(), BufferState::Dormant);
        assert!(!watchdog.acknowledge());
    }

    #[test]
    fn test_pause_disarms() {
        let mut watchdog = armed();
        assert!(!watchdog.on_pause());
        assert_eq!(watchdog.state(), BufferState::Dormant);

        let mut watchdog = armed();
        watchdog.on_stall();
        assert!(watchdog.on_pause());
        assert_eq!(watchdog.state(), BufferState::Dormant);
        assert_eq!(watchdog.remaining(), 15.0);
    }
}
