use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::message::{DetectionFrame, FrameId};

/// Holds detection frames until playback reaches them.
///
/// Frames are kept in arrival order. A release tick moves forward through
/// every frame the player has caught up to and shows the last of them, so a
/// backlog is skipped over instead of replayed.
#[derive(Debug)]
pub struct FrameSyncQueue {
    frames: VecDeque<DetectionFrame>,
    current: Option<DetectionFrame>,
    capacity: usize,

    /// Frames dropped because the queue was full (statistics)
    dropped: u64,

    /// Frames discarded because they arrived behind the displayed one (statistics)
    stale: u64,
}

impl FrameSyncQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity.min(256)),
            current: None,
            capacity: capacity.max(1),
            dropped: 0,
            stale: 0,
        }
    }

    /// Appends a frame, dropping the oldest queued one when full.
    /// Returns the dropped frame, if any.
    pub fn enqueue(&mut self, frame: DetectionFrame) -> Option<DetectionFrame> {
        let evicted = if self.frames.len() >= self.capacity {
            self.dropped += 1;
            self.frames.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            warn!(
                frame_id = old.frame_id,
                dropped = self.dropped,
                "frame queue full, dropping oldest"
            );
        }
        self.frames.push_back(frame);
        evicted
    }

    /// Releases every head frame with `frame_id <= target`. Returns `true`
    /// when the displayed frame changed.
    pub fn tick(&mut self, target: FrameId) -> bool {
        let mut changed = false;
        while self
            .frames
            .front()
            .is_some_and(|head| head.frame_id <= target)
        {
            let Some(frame) = self.frames.pop_front() else {
                break;
            };
            if self
                .current
                .as_ref()
                .is_some_and(|cur| frame.frame_id < cur.frame_id)
            {
                self.stale += 1;
                debug!(frame_id = frame.frame_id, "discarding out of order frame");
                continue;
            }
            self.current = Some(frame);
            changed = true;
        }
        changed
    }

    pub fn current(&self) -> Option<&DetectionFrame> {
        self.current.as_ref()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn stale(&self) -> u64 {
        self.stale
    }

    /// Drops queued frames and the displayed one.
    pub fn flush(&mut self) {
        if !self.frames.is_empty() || self.current.is_some() {
            debug!(queued = self.frames.len(), "frame queue flushed");
        }
        self.frames.clear();
        self.current = None;
    }
}
