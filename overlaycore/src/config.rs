use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::overlay::FilterMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Length of one stream segment in stream time-units
    #[serde(default = "default_segment_duration")]
    pub segment_duration: f64,
    #[serde(default = "default_segment_suffix")]
    pub segment_suffix: String,
    #[serde(default = "default_version_marker")]
    pub version_marker: String,
    /// Compensation for the end-to-end detection pipeline delay
    #[serde(default = "default_latency_offset")]
    pub latency_offset: f64,
    /// Detection frame ids per stream time-unit. The camera processor stamps
    /// frames with their stream time, so the default 1 compares ids to the
    /// stream timestamp directly.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    #[serde(default = "default_search_poll_ms")]
    pub search_poll_ms: u64,
    #[serde(default = "default_track_poll_ms")]
    pub track_poll_ms: u64,
    #[serde(default = "default_release_tick_ms")]
    pub release_tick_ms: u64,
    #[serde(default = "default_timestamp_tick_ms")]
    pub timestamp_tick_ms: u64,

    /// How long a stall may last before the stream is given up on
    #[serde(default = "default_stall_budget")]
    pub stall_budget: f64,
    /// Countdown step, also the countdown timer period in seconds
    #[serde(default = "default_stall_tick")]
    pub stall_tick: f64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_flush_on_reload")]
    pub flush_on_reload: bool,
    #[serde(default)]
    pub filter: FilterMode,
}

fn default_segment_duration() -> f64 {
    2.0
}

fn default_segment_suffix() -> String {
    ".ts".to_string()
}

fn default_version_marker() -> String {
    "_V".to_string()
}

fn default_latency_offset() -> f64 {
    0.2
}

fn default_frame_rate() -> f64 {
    1.0
}

fn default_search_poll_ms() -> u64 {
    1000 / 24
}

fn default_track_poll_ms() -> u64 {
    1000
}

fn default_release_tick_ms() -> u64 {
    1000 / 24
}

fn default_timestamp_tick_ms() -> u64 {
    100
}

fn default_stall_budget() -> f64 {
    15.0
}

fn default_stall_tick() -> f64 {
    0.5
}

fn default_queue_capacity() -> usize {
    240
}

fn default_flush_on_reload() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            segment_duration: default_segment_duration(),
            segment_suffix: default_segment_suffix(),
            version_marker: default_version_marker(),
            latency_offset: default_latency_offset(),
            frame_rate: default_frame_rate(),
            search_poll_ms: default_search_poll_ms(),
            track_poll_ms: default_track_poll_ms(),
            release_tick_ms: default_release_tick_ms(),
            timestamp_tick_ms: default_timestamp_tick_ms(),
            stall_budget: default_stall_budget(),
            stall_tick: default_stall_tick(),
            queue_capacity: default_queue_capacity(),
            flush_on_reload: default_flush_on_reload(),
            filter: FilterMode::default(),
        }
    }
}

impl SyncConfig {
    pub fn search_poll(&self) -> Duration {
        Duration::from_millis(self.search_poll_ms)
    }

    pub fn track_poll(&self) -> Duration {
        Duration::from_millis(self.track_poll_ms)
    }

    pub fn release_tick(&self) -> Duration {
        Duration::from_millis(self.release_tick_ms)
    }

    pub fn timestamp_tick(&self) -> Duration {
        Duration::from_millis(self.timestamp_tick_ms)
    }

    pub fn stall_tick_period(&self) -> Duration {
        Duration::from_secs_f64(self.stall_tick)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        let positive = [
            ("segment_duration", self.segment_duration),
            ("frame_rate", self.frame_rate),
            ("stall_budget", self.stall_budget),
            ("stall_tick", self.stall_tick),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SyncError::invalid_config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !self.latency_offset.is_finite() {
            return Err(SyncError::invalid_config("latency_offset must be finite"));
        }

        let ticks = [
            ("search_poll_ms", self.search_poll_ms),
            ("track_poll_ms", self.track_poll_ms),
            ("release_tick_ms", self.release_tick_ms),
            ("timestamp_tick_ms", self.timestamp_tick_ms),
        ];
        for (name, value) in ticks {
            if value == 0 {
                return Err(SyncError::invalid_config(format!("{name} must not be 0")));
            }
        }

        if self.queue_capacity == 0 {
            return Err(SyncError::invalid_config("queue_capacity must not be 0"));
        }
        if self.segment_suffix.is_empty() || self.version_marker.is_empty() {
            return Err(SyncError::invalid_config(
                "segment_suffix and version_marker must not be empty",
            ));
        }
        Ok(())
    }
}
