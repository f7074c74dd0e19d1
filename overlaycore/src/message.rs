use serde::{Deserialize, Serialize};

use crate::overlay::RenderedBox;
use crate::viewport::ViewportTransform;

pub type FrameId = u64;
pub type BoxId = u64;
pub type ObjectId = u64;

/// Normalized rectangle, serialized as `[x1, y1, x2, y2]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl From<[f64; 4]> for Rect {
    fn from(r: [f64; 4]) -> Self {
        Rect {
            x1: r[0],
            y1: r[1],
            x2: r[2],
            y2: r[3],
        }
    }
}

impl From<Rect> for [f64; 4] {
    fn from(r: Rect) -> Self {
        [r.x1, r.y1, r.x2, r.y2]
    }
}

impl Rect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Rect { x1, y1, x2, y2 }
    }

    /// Swaps corners so that `x1 <= x2` and `y1 <= y2`.
    pub fn rectified(self) -> Self {
        Rect {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    /// Crop region in native video pixels, used for snapshots of a box.
    pub fn to_pixel_region(self, video_width: u32, video_height: u32) -> PixelRegion {
        let r = self.rectified();
        let clamp = |v: f64| v.clamp(0.0, 1.0);
        let left = (clamp(r.x1) * video_width as f64).round() as u32;
        let top = (clamp(r.y1) * video_height as f64).round() as u32;
        let right = (clamp(r.x2) * video_width as f64).round() as u32;
        let bottom = (clamp(r.y2) * video_height as f64).round() as u32;
        PixelRegion {
            left,
            top,
            width: right - left,
            height: bottom - top,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionBox {
    pub box_id: BoxId,
    pub rect: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
}

impl DetectionBox {
    pub fn is_tracked(&self) -> bool {
        self.object_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    pub frame_id: FrameId,
    pub boxes: Vec<DetectionBox>,
}

impl DetectionFrame {
    pub fn new(frame_id: FrameId, boxes: Vec<DetectionBox>) -> Self {
        Self { frame_id, boxes }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub camera_id: String,
    pub frame_id: FrameId,
    pub box_id: BoxId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayFrame {
    pub frame_id: Option<FrameId>,
    pub boxes: Vec<RenderedBox>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutwardEvent {
    Timestamp(f64),
    Viewport(ViewportTransform),
    Playback(bool),
    Overlay(OverlayFrame),
    TrackRequest(TrackRequest),
    Notice(String),
    Control(String),
}
