use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

/// Shortest period a timer runs at.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    SegmentPoll,
    FrameRelease,
    TimestampPublish,
    WatchdogCountdown,
}

#[derive(Clone, Copy, Debug)]
struct Timer {
    period: Duration,
    deadline: Instant,
}

/// Fixed-rate timers of one session, addressed by kind.
///
/// Each kind runs at most once at a time. Scheduling a kind that is already
/// running replaces it.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: BTreeMap<TimerKind, Timer>,
}

impl Scheduler {
    /// Starts `kind` firing every `period` from `now`. Periods below
    /// [`MIN_PERIOD`] are raised to it, so a timer fires at most once per
    /// instant.
    pub fn schedule(&mut self, kind: TimerKind, period: Duration, now: Instant) {
        let period = period.max(MIN_PERIOD);
        self.timers.insert(
            kind,
            Timer {
                period,
                deadline: now + period,
            },
        );
    }

    /// Changes the period of a running timer, or starts it.
    pub fn reschedule(&mut self, kind: TimerKind, period: Duration, now: Instant) {
        if self.period(kind) != Some(period.max(MIN_PERIOD)) {
            self.schedule(kind, period, now);
        }
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.timers.remove(&kind).is_some()
    }

    /// Returns how many timers were running.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    pub fn period(&self, kind: TimerKind) -> Option<Duration> {
        self.timers.get(&kind).map(|t| t.period)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Takes the earliest timer due at `now` and schedules its next firing.
    /// A timer that fell behind skips the missed firings.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        let (kind, timer) = self
            .timers
            .iter_mut()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| t.deadline)?;
        let mut next = timer.deadline + timer.period;
        if next <= now {
            next = now + timer.period;
        }
        timer.deadline = next;
        Some(*kind)
    }
}
