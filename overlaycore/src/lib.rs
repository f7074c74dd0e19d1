pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod message;
pub mod overlay;
pub mod player;
pub mod queue;
pub mod scheduler;
pub mod segment;
pub mod session;
pub mod viewport;
pub mod watchdog;

pub use clock::{ClockPhase, StreamBaseline, StreamClock};
pub use config::SyncConfig;
pub use control::{ControlBar, ControlButton};
pub use error::{SegmentError, SyncError};
pub use message::{
    DetectionBox, DetectionFrame, FrameId, OutwardEvent, OverlayFrame, Rect, TrackRequest,
};
pub use overlay::{BorderColor, Confirm, FilterMode, RenderedBox};
pub use player::{DetectionFeed, FrameCallback, Player, PlayerEvent, SubscriptionToken};
pub use queue::FrameSyncQueue;
pub use scheduler::{Scheduler, TimerKind};
pub use segment::{format_timestamp, Segment};
pub use session::{SessionHandle, SessionInput, SyncSession};
pub use viewport::{compute_transform, ViewportTransform};
pub use watchdog::{BufferState, BufferWatchdog};
