use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub const DEFAULT_GAP_MS: u64 = 3000;

/// `2024/03/01 | 13:05:09`
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d | %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    InvalidTimestamp(String),
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineError::InvalidTimestamp(s) => write!(f, "invalid log timestamp: {:?}", s),
        }
    }
}

impl std::error::Error for TimelineError {}

/// One "object seen" record from a processor's tracking log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingLog {
    #[serde(rename = "timeStamp")]
    pub timestamp: String,
    pub processor_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    #[serde(with = "log_time")]
    pub from: NaiveDateTime,
    #[serde(with = "log_time")]
    pub to: NaiveDateTime,
}

impl Interval {
    fn at(t: NaiveDateTime) -> Self {
        Self { from: t, to: t }
    }
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TimelineError> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| TimelineError::InvalidTimestamp(s.to_string()))
}

pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Merges log entries into the intervals during which each processor kept
/// seeing an object. Entries of one processor closer together than `gap`
/// extend the same interval.
pub fn presence_intervals<'a, I>(
    entries: I,
    gap: Duration,
) -> Result<BTreeMap<String, Vec<Interval>>, TimelineError>
where
    I: IntoIterator<Item = &'a TrackingLog>,
{
    let mut open: BTreeMap<&str, Interval> = BTreeMap::new();
    let mut closed: BTreeMap<String, Vec<Interval>> = BTreeMap::new();

    for entry in entries {
        let t = parse_timestamp(&entry.timestamp)?;
        match open.get_mut(entry.processor_id.as_str()) {
            None => {
                open.insert(&entry.processor_id, Interval::at(t));
            }
            Some(interval) if t - interval.to > gap => {
                trace!(
                    processor = %entry.processor_id,
                    "lost sight after {}",
                    format_timestamp(&interval.to)
                );
                closed
                    .entry(entry.processor_id.clone())
                    .or_default()
                    .push(*interval);
                *interval = Interval::at(t);
            }
            Some(interval) => interval.to = interval.to.max(t),
        }
    }

    for (processor, interval) in open {
        closed.entry(processor.to_string()).or_default().push(interval);
    }
    debug!(processors = closed.len(), "presence intervals merged");
    Ok(closed)
}

mod log_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(d)?;
        super::parse_timestamp(&s).map_err(serde::de::Error::custom)
    }
}
