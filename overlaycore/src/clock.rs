use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SegmentError;
use crate::segment::{format_timestamp, Segment};

/// Stream time of the last observed segment switch, paired with the player's
/// elapsed time at the moment the switch was seen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamBaseline {
    pub start_time: f64,
    pub anchor_elapsed: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockPhase {
    /// No segment seen yet
    Searching,
    /// First segment recorded, waiting for it to switch
    Watching,
    /// Baseline acquired
    Tracking,
}

#[derive(Clone, Debug, PartialEq)]
enum ClockState {
    Searching,
    Watching {
        candidate: String,
    },
    Tracking {
        current: String,
        baseline: StreamBaseline,
    },
}

/// Derives absolute stream time from the names of the segments the player
/// is fetching.
///
/// The first segment seen is only a candidate: the player may have joined
/// anywhere inside it, so its start time says nothing about the current
/// position. The baseline is taken at the first switch away from it, when
/// the player is known to sit on a segment boundary.
#[derive(Debug)]
pub struct StreamClock {
    segment_duration: f64,
    segment_suffix: String,
    version_marker: String,
    latency_offset: f64,
    state: ClockState,
}

impl StreamClock {
    pub fn new(cfg: &SyncConfig) -> Self {
        Self {
            segment_duration: cfg.segment_duration,
            segment_suffix: cfg.segment_suffix.clone(),
            version_marker: cfg.version_marker.clone(),
            latency_offset: cfg.latency_offset,
            state: ClockState::Searching,
        }
    }

    pub fn start_time(&self, id: &str) -> Result<f64, SegmentError> {
        Segment::parse(id, &self.segment_suffix, &self.version_marker)
            .map(|seg| seg.start_time(self.segment_duration))
    }

    /// Feeds the segment id currently reported by the player.
    ///
    /// Returns the stream time at which that segment starts, or `None` when
    /// the id is malformed, in which case the clock state is left untouched.
    pub fn observe_segment_id(&mut self, id: &str, player_elapsed: f64) -> Option<f64> {
        let start_time = match self.start_time(id) {
            Ok(t) => t,
            Err(e) => {
                warn!("segment ignored: {}", e);
                return None;
            }
        };

        // (segment switched, first switch)
        let switch = match &self.state {
            ClockState::Searching => None,
            ClockState::Watching { candidate } => Some((candidate != id, true)),
            ClockState::Tracking { current, .. } => Some((current != id, false)),
        };

        match switch {
            None => {
                debug!(segment = id, "initial segment");
                self.state = ClockState::Watching {
                    candidate: id.to_string(),
                };
            }
            Some((true, acquired)) => {
                let baseline = StreamBaseline {
                    start_time,
                    anchor_elapsed: player_elapsed,
                };
                self.state = ClockState::Tracking {
                    current: id.to_string(),
                    baseline,
                };
                if acquired {
                    info!(
                        segment = id,
                        "stream clock acquired, start time {}",
                        format_timestamp(start_time)
                    );
                } else {
                    debug!(
                        segment = id,
                        "stream clock re-anchored at {}",
                        format_timestamp(start_time)
                    );
                }
            }
            Some((false, _)) => {}
        }
        Some(start_time)
    }

    /// Current stream time, `None` until a baseline has been acquired.
    pub fn compute_timestamp(&self, player_elapsed: f64) -> Option<f64> {
        self.baseline().map(|b| {
            b.start_time + (player_elapsed - b.anchor_elapsed) + self.latency_offset
        })
    }

    pub fn baseline(&self) -> Option<StreamBaseline> {
        match self.state {
            ClockState::Tracking { baseline, .. } => Some(baseline),
            _ => None,
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.baseline().is_some()
    }

    pub fn phase(&self) -> ClockPhase {
        match self.state {
            ClockState::Searching => ClockPhase::Searching,
            ClockState::Watching { .. } => ClockPhase::Watching,
            ClockState::Tracking { .. } => ClockPhase::Tracking,
        }
    }

    /// Forgets both the candidate and the baseline.
    pub fn reset(&mut self) {
        if self.state != ClockState::Searching {
            debug!("stream clock reset");
        }
        self.state = ClockState::Searching;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> StreamClock {
        StreamClock::new(&SyncConfig::default())
    }

    #[test]
    fn test_acquisition() {
        let mut clock = clock();
        assert_eq!(clock.phase(), ClockPhase::Searching);

        assert_eq!(clock.observe_segment_id("cam1_V1001.ts", 0.3), Some(0.0));
        assert_eq!(clock.phase(), ClockPhase::Watching);
        assert_eq!(clock.compute_timestamp(0.3), None);

        assert_eq!(clock.observe_segment_id("cam1_V1001.ts", 1.0), Some(0.0));
        assert_eq!(clock.phase(), ClockPhase::Watching);

        assert_eq!(clock.observe_segment_id("cam1_V1002.ts", 1.7), Some(2.0));
        assert_eq!(clock.phase(), ClockPhase::Tracking);
        assert_eq!(
            clock.baseline(),
            Some(StreamBaseline {
                start_time: 2.0,
                anchor_elapsed: 1.7,
            })
        );
    }

    #[test]
    fn test_timestamp_formula() {
        let mut clock = clock();
        clock.observe_segment_id("cam1_V1010.ts", 5.0);
        clock.observe_segment_id("cam1_V1011.ts", 6.0);
        // 20 + (9.5 - 6.0) + 0.2
        let ts = clock.compute_timestamp(9.5).unwrap();
        assert!((ts - 23.7).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_never_acquires() {
        for id in ["cam1_V1001.mp4", "cam1_1001.ts", "cam1_V.ts", "", "cam1_V1000.ts"] {
            let mut clock = clock();
            assert_eq!(clock.compute_timestamp(1.0), None);
            assert_eq!(clock.observe_segment_id(id, 0.0), None);
            assert_eq!(clock.observe_segment_id(id, 1.0), None);
            assert_eq!(clock.phase(), ClockPhase::Searching);
            assert_eq!(clock.compute_timestamp(1.0), None);
        }
    }

    #[test]
    fn test_malformed_switch_keeps_watching() {
        let mut clock = clock();
        clock.observe_segment_id("cam1_V1001.ts", 0.0);
        assert_eq!(clock.observe_segment_id("cam1_V1002.m4s", 0.5), None);
        assert_eq!(clock.phase(), ClockPhase::Watching);
        assert!(!clock.is_acquired());
    }

    #[test]
    fn test_re_anchor_on_later_switch() {
        let mut clock = clock();
        clock.observe_segment_id("cam1_V1001.ts", 0.0);
        clock.observe_segment_id("cam1_V1002.ts", 1.0);
        clock.observe_segment_id("cam1_V1002.ts", 2.0);
        assert_eq!(clock.baseline().unwrap().anchor_elapsed, 1.0);

        clock.observe_segment_id("cam1_V1003.ts", 3.1);
        assert_eq!(
            clock.baseline(),
            Some(StreamBaseline {
                start_time: 4.0,
                anchor_elapsed: 3.1,
            })
        );
    }

    #[test]
    fn test_reset() {
        let mut clock = clock();
        clock.observe_segment_id("cam1_V1001.ts", 0.0);
        clock.observe_segment_id("cam1_V1002.ts", 1.0);
        clock.reset();
        assert_eq!(clock.phase(), ClockPhase::Searching);
        assert_eq!(clock.compute_timestamp(2.0), None);

        // the next id is a candidate again, not a switch
        clock.observe_segment_id("cam1_V1002.ts", 2.0);
        assert_eq!(clock.phase(), ClockPhase::Watching);
    }
}
