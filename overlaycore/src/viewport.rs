use serde::Serialize;

use crate::message::Rect;

const FALLBACK_SIZE: (f64, f64) = (16.0, 9.0);

/// Where the video picture sits inside its container, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportTransform {
    pub width: f64,
    pub height: f64,
    pub offset_left: f64,
    pub offset_top: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + self.height
    }
}

impl ViewportTransform {
    /// Maps a normalized rect onto the displayed picture. The rect is
    /// rectified first, so width and height are never negative.
    pub fn map_rect(&self, rect: Rect) -> PixelRect {
        let r = rect.rectified();
        PixelRect {
            left: r.x1 * self.width + self.offset_left,
            top: r.y1 * self.height + self.offset_top,
            width: (r.x2 - r.x1) * self.width,
            height: (r.y2 - r.y1) * self.height,
        }
    }
}

/// Fits a video of `video` native size into the container, letterboxing or
/// pillarboxing as needed. Unknown video dimensions are treated as 16:9.
pub fn compute_transform(
    container_width: f64,
    container_height: f64,
    video: Option<(f64, f64)>,
) -> ViewportTransform {
    let container_aspect = container_width / container_height;
    if !(container_aspect.is_finite() && container_aspect > 0.0) {
        return ViewportTransform::default();
    }

    let (video_width, video_height) = video
        .filter(|(w, h)| {
            let aspect = w / h;
            aspect.is_finite() && aspect > 0.0
        })
        .unwrap_or(FALLBACK_SIZE);
    let video_aspect = video_width / video_height;

    if container_aspect < video_aspect {
        // width constrains, bars top and bottom
        let height = container_width / video_width * video_height;
        ViewportTransform {
            width: container_width,
            height,
            offset_left: 0.0,
            offset_top: (container_height - height) / 2.0,
        }
    } else {
        let width = container_height / video_height * video_width;
        ViewportTransform {
            width,
            height: container_height,
            offset_left: (container_width - width) / 2.0,
            offset_top: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(t: ViewportTransform, expected: [f64; 4]) {
        let got = [t.width, t.height, t.offset_left, t.offset_top];
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() < 1e-9, "{got:?} != {expected:?}");
        }
    }

    #[test]
    fn test_fallback_without_native_size() {
        assert_close(
            compute_transform(800.0, 450.0, None),
            [800.0, 450.0, 0.0, 0.0],
        );
        assert_close(
            compute_transform(800.0, 450.0, Some((0.0, 0.0))),
            [800.0, 450.0, 0.0, 0.0],
        );
    }

    #[test]
    fn test_letterbox() {
        // 16:9 video in a 4:3 container
        assert_close(
            compute_transform(800.0, 600.0, Some((1920.0, 1080.0))),
            [800.0, 450.0, 0.0, 75.0],
        );
    }

    #[test]
    fn test_pillarbox() {
        // 4:3 video in a 16:9 container
        assert_close(
            compute_transform(1600.0, 900.0, Some((640.0, 480.0))),
            [1200.0, 900.0, 200.0, 0.0],
        );
    }

    #[test]
    fn test_degenerate_container() {
        assert_eq!(
            compute_transform(0.0, 0.0, Some((1920.0, 1080.0))),
            ViewportTransform::default()
        );
        assert_eq!(
            compute_transform(800.0, 0.0, None),
            ViewportTransform::default()
        );
    }

    #[test]
    fn test_map_rect() {
        let t = ViewportTransform {
            width: 800.0,
            height: 450.0,
            offset_left: 0.0,
            offset_top: 75.0,
        };
        let r = t.map_rect(Rect::new(0.75, 0.5, 0.25, 0.0));
        assert_eq!(
            r,
            PixelRect {
                left: 200.0,
                top: 75.0,
                width: 400.0,
                height: 225.0,
            }
        );
        assert!(r.contains(300.0, 100.0));
        assert!(!r.contains(100.0, 100.0));
    }
}
