use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::message::{BoxId, DetectionBox, FrameId, ObjectId, TrackRequest};
use crate::viewport::{PixelRect, ViewportTransform};

pub const TRACK_PROMPT: &str = "Start tracking this object?";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    All,
    /// Only boxes that already belong to a tracked object
    Selection,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BorderColor {
    Green,
    Red,
    Yellow,
    Blue,
    Purple,
    Brown,
    Aqua,
    Navy,
}

pub const PALETTE: [BorderColor; 8] = [
    BorderColor::Green,
    BorderColor::Red,
    BorderColor::Yellow,
    BorderColor::Blue,
    BorderColor::Purple,
    BorderColor::Brown,
    BorderColor::Aqua,
    BorderColor::Navy,
];

impl BorderColor {
    /// Untracked boxes get the first color, tracked ones cycle through the palette.
    pub fn for_object(object_id: Option<ObjectId>) -> Self {
        let index = object_id.unwrap_or(0) % PALETTE.len() as u64;
        PALETTE[index as usize]
    }

    pub fn css_name(&self) -> &'static str {
        match self {
            BorderColor::Green => "green",
            BorderColor::Red => "red",
            BorderColor::Yellow => "yellow",
            BorderColor::Blue => "blue",
            BorderColor::Purple => "purple",
            BorderColor::Brown => "brown",
            BorderColor::Aqua => "aqua",
            BorderColor::Navy => "navy",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedBox {
    pub box_id: BoxId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    pub rect: PixelRect,
    pub color: BorderColor,
    /// Untracked boxes can be clicked to start tracking them
    pub clickable: bool,
}

/// Asks the user before a track request leaves the overlay.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub fn render(
    boxes: &[DetectionBox],
    mode: FilterMode,
    transform: &ViewportTransform,
) -> Vec<RenderedBox> {
    let visible = |b: &&DetectionBox| match mode {
        FilterMode::All => true,
        FilterMode::Selection => b.is_tracked(),
        FilterMode::None => false,
    };
    boxes
        .iter()
        .filter(visible)
        .map(|b| RenderedBox {
            box_id: b.box_id,
            object_id: b.object_id,
            rect: transform.map_rect(b.rect),
            color: BorderColor::for_object(b.object_id),
            clickable: !b.is_tracked(),
        })
        .collect()
}

/// Topmost clickable box under the point. Later boxes paint over earlier ones.
pub fn hit_test(rendered: &[RenderedBox], x: f64, y: f64) -> Option<&RenderedBox> {
    rendered
        .iter()
        .rev()
        .find(|b| b.clickable && b.rect.contains(x, y))
}

/// Resolves a click into a track request once the user agreed to it.
pub fn click(
    camera_id: &str,
    frame_id: FrameId,
    rendered: &[RenderedBox],
    x: f64,
    y: f64,
    confirm: &mut dyn Confirm,
) -> Option<TrackRequest> {
    let target = hit_test(rendered, x, y)?;
    if !confirm.confirm(TRACK_PROMPT) {
        debug!(box_id = target.box_id, "track request declined");
        return None;
    }
    info!(
        camera = camera_id,
        frame_id,
        box_id = target.box_id,
        "track request"
    );
    Some(TrackRequest {
        camera_id: camera_id.to_string(),
        frame_id,
        box_id: target.box_id,
    })
}
