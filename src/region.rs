//! Rectangular image regions and the fixed corner probes.

use serde::{Deserialize, Serialize};

/// Width of each corner probe in pixels.
pub const PROBE_WIDTH: u32 = 80;
/// Height of each corner probe in pixels.
pub const PROBE_HEIGHT: u32 = 60;

/// A region must start before this fraction of the width to count as left.
const CORNER_ZONE_NEAR: f64 = 0.2;
/// A region must extend past this fraction of width/height to count as right/bottom.
const CORNER_ZONE_FAR: f64 = 0.8;

/// An axis-aligned rectangle with a watermark confidence score.
///
/// Regions returned by detection always lie inside the image they were
/// computed from. Caller-supplied regions may not; every consumer clips
/// them with [`Region::clip`] before touching pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Heuristic score in `[0, 1]`.
    pub confidence: f64,
}

impl Region {
    /// Create a region with zero confidence.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: 0.0,
        }
    }

    /// Return a copy with the given confidence, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Exclusive right edge, saturating at `u32::MAX`.
    #[must_use]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`.
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Whether the pixel `(x, y)` lies inside the region.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersect the region with a `img_w` x `img_h` image.
    ///
    /// Returns `None` when nothing of the region remains inside the image.
    #[must_use]
    pub fn clip(&self, img_w: u32, img_h: u32) -> Option<Self> {
        let x2 = self.right().min(img_w);
        let y2 = self.bottom().min(img_h);
        if self.x >= x2 || self.y >= y2 {
            return None;
        }
        Some(Self {
            x: self.x,
            y: self.y,
            width: x2 - self.x,
            height: y2 - self.y,
            confidence: self.confidence,
        })
    }

    /// Whether the region reaches into the bottom corner zones.
    ///
    /// True when the region extends past 80% of both width and height
    /// (bottom-right), or starts within the left 20% and extends past 80%
    /// of the height (bottom-left). There is no top-corner test.
    #[must_use]
    pub fn in_corner_zone(&self, img_w: u32, img_h: u32) -> bool {
        let w = f64::from(img_w);
        let h = f64::from(img_h);
        let right = f64::from(self.x) + f64::from(self.width);
        let bottom = f64::from(self.y) + f64::from(self.height);
        let low = bottom > h * CORNER_ZONE_FAR;

        (right > w * CORNER_ZONE_FAR && low) || (f64::from(self.x) < w * CORNER_ZONE_NEAR && low)
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}+{}+{} ({:.0}%)",
            self.width,
            self.height,
            self.x,
            self.y,
            self.confidence * 100.0
        )
    }
}

/// Corner a probe rectangle is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeCorner {
    /// Bottom-right corner.
    BottomRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Top-right corner.
    TopRight,
    /// Top-left corner.
    TopLeft,
}

impl ProbeCorner {
    /// All corners in scan order.
    pub const ALL: [Self; 4] = [
        Self::BottomRight,
        Self::BottomLeft,
        Self::TopRight,
        Self::TopLeft,
    ];

    /// The 80x60 probe anchored at this corner, clipped to the image.
    #[must_use]
    pub fn rect(self, img_w: u32, img_h: u32) -> Region {
        let width = PROBE_WIDTH.min(img_w);
        let height = PROBE_HEIGHT.min(img_h);
        let right_x = img_w.saturating_sub(PROBE_WIDTH);
        let bottom_y = img_h.saturating_sub(PROBE_HEIGHT);

        let (x, y) = match self {
            Self::BottomRight => (right_x, bottom_y),
            Self::BottomLeft => (0, bottom_y),
            Self::TopRight => (right_x, 0),
            Self::TopLeft => (0, 0),
        };
        Region::new(x, y, width, height)
    }

    /// Short human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        }
    }
}
