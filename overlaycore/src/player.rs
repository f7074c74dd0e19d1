use serde::{Deserialize, Serialize};

use crate::message::{DetectionBox, FrameId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Player ran out of buffered media
    Stall,
    /// Playback advanced again after a stall
    Resume,
    Play,
    Pause,
    Resize,
    FirstFrameLoaded,
}

/// Control surface of the video player a session is attached to.
pub trait Player {
    /// Seconds of media the player has played since its source was loaded.
    fn current_elapsed(&self) -> f64;

    /// Name of the segment currently being played, if the player knows it yet.
    fn current_segment_id(&self) -> Option<String>;

    /// Native size of the decoded video, `None` before metadata is loaded.
    fn native_dimensions(&self) -> Option<(f64, f64)>;

    /// Size of the element the video is displayed in.
    fn displayed_dimensions(&self) -> (f64, f64);

    fn play(&mut self);

    fn pause(&mut self);

    fn reload_source(&mut self);

    /// Shows a blocking message. The user closing it arrives as
    /// `SessionInput::Acknowledge`.
    fn show_notice(&mut self, message: &str);
}

pub type SubscriptionToken = u64;

pub type FrameCallback = Box<dyn FnMut(Vec<DetectionBox>, FrameId) + Send>;

/// Source of detection results, one subscription per camera view.
pub trait DetectionFeed {
    fn subscribe(&mut self, camera_id: &str, on_frame: FrameCallback) -> SubscriptionToken;

    fn unsubscribe(&mut self, token: SubscriptionToken);
}
