use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    MissingSuffix(String),
    MissingMarker(String),
    MissingVersion(String),
    InvalidSequence(String),
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::MissingSuffix(id) => write!(f, "unexpected segment suffix: {id}"),
            SegmentError::MissingMarker(id) => write!(f, "segment not from forwarder: {id}"),
            SegmentError::MissingVersion(id) => write!(f, "segment version missing: {id}"),
            SegmentError::InvalidSequence(id) => write!(f, "invalid segment sequence: {id}"),
        }
    }
}

impl std::error::Error for SegmentError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    InvalidConfig(String),
}

impl SyncError {
    pub fn invalid_config<T>(t: T) -> Self
    where
        T: ToString,
    {
        SyncError::InvalidConfig(t.to_string())
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::InvalidConfig(msg) => write!(f, "invalid sync config: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}
