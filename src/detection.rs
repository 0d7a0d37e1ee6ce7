//! Corner-probe watermark detection.
//!
//! Each of the four fixed 80x60 corner probes is scored from three pixel
//! statistics:
//! 1. **Transparency** (30%): share of pixels with alpha below 255
//! 2. **Grayscale** (40%): share of pixels whose channels lie within 10 units
//! 3. **Edges** (30%): share of pixels with a strong red-channel step to the
//!    right and below neighbours
//!
//! Probes in the bottom corner zones receive a fixed bonus. Probes scoring
//! above the threshold are reported as [`Region`]s in scan order.

use image::RgbaImage;
use tracing::debug;

use crate::region::{ProbeCorner, Region};

/// Confidence weight: transparency ratio.
const TRANSPARENCY_WEIGHT: f64 = 0.3;
/// Confidence weight: grayscale ratio.
const GRAYSCALE_WEIGHT: f64 = 0.4;
/// Confidence weight: edge ratio.
const EDGE_WEIGHT: f64 = 0.3;
/// Bonus for probes in a bottom corner zone.
const CORNER_BONUS: f64 = 0.2;
/// Channels closer than this count as gray.
const GRAY_TOLERANCE: u8 = 10;
/// Red-channel step (right + below) above which a pixel counts as an edge.
const EDGE_STRENGTH: u16 = 100;

/// Default confidence a probe must exceed to be reported.
pub const DETECTION_THRESHOLD: f64 = 0.7;

/// Pixel counts gathered over one rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionStats {
    /// Pixels scanned.
    pub total: u64,
    /// Pixels with alpha below 255.
    pub transparent: u64,
    /// Pixels whose RGB channels are mutually within tolerance.
    pub grayscale: u64,
    /// Pixels with a strong step to their right and below neighbours.
    pub edge: u64,
}

impl RegionStats {
    fn ratio(&self, count: u64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            count as f64 / self.total as f64
        }
    }

    /// Share of transparent pixels.
    #[must_use]
    pub fn transparency_ratio(&self) -> f64 {
        self.ratio(self.transparent)
    }

    /// Share of grayscale pixels.
    #[must_use]
    pub fn grayscale_ratio(&self) -> f64 {
        self.ratio(self.grayscale)
    }

    /// Share of edge-like pixels.
    #[must_use]
    pub fn edge_ratio(&self) -> f64 {
        self.ratio(self.edge)
    }

    /// Weighted score, plus the corner bonus if requested, capped at 1.0.
    #[must_use]
    pub fn confidence(&self, corner_bonus: bool) -> f64 {
        let mut confidence = 0.0;
        confidence += self.transparency_ratio() * TRANSPARENCY_WEIGHT;
        confidence += self.grayscale_ratio() * GRAYSCALE_WEIGHT;
        confidence += self.edge_ratio() * EDGE_WEIGHT;
        if corner_bonus {
            confidence += CORNER_BONUS;
        }
        confidence.clamp(0.0, 1.0)
    }
}

fn is_gray(r: u8, g: u8, b: u8) -> bool {
    r.abs_diff(g) < GRAY_TOLERANCE && g.abs_diff(b) < GRAY_TOLERANCE && r.abs_diff(b) < GRAY_TOLERANCE
}

/// Gather transparency, grayscale and edge counts for a rectangle.
///
/// The rectangle is clipped to the image first. The edge test compares each
/// pixel's red channel with its right and below neighbours and is skipped on
/// the rectangle's last column and last row; those pixels still count toward
/// the total.
#[must_use]
pub fn analyze_region(image: &RgbaImage, rect: &Region) -> RegionStats {
    let mut stats = RegionStats::default();
    let Some(rect) = rect.clip(image.width(), image.height()) else {
        return stats;
    };

    let last_x = rect.right() - 1;
    let last_y = rect.bottom() - 1;

    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            stats.total += 1;

            if a < u8::MAX {
                stats.transparent += 1;
            }
            if is_gray(r, g, b) {
                stats.grayscale += 1;
            }
            if x < last_x && y < last_y {
                let right = image.get_pixel(x + 1, y)[0];
                let below = image.get_pixel(x, y + 1)[0];
                let strength = u16::from(r.abs_diff(right)) + u16::from(r.abs_diff(below));
                if strength > EDGE_STRENGTH {
                    stats.edge += 1;
                }
            }
        }
    }

    stats
}

/// Score every corner probe, regardless of threshold.
///
/// Returns the probes in scan order (bottom-right, bottom-left, top-right,
/// top-left) with their clipped rectangle, confidence and raw counts. A
/// zero-area image yields an empty vector.
#[must_use]
pub fn analyze_probes(image: &RgbaImage) -> Vec<(ProbeCorner, Region, RegionStats)> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }

    ProbeCorner::ALL
        .iter()
        .map(|&corner| {
            let rect = corner.rect(w, h);
            let stats = analyze_region(image, &rect);
            let confidence = stats.confidence(rect.in_corner_zone(w, h));
            debug!(
                corner = corner.label(),
                transparency = stats.transparency_ratio(),
                grayscale = stats.grayscale_ratio(),
                edge = stats.edge_ratio(),
                confidence,
                "scored probe"
            );
            (corner, rect.with_confidence(confidence), stats)
        })
        .collect()
}

/// Detect probable watermark regions using the default threshold.
///
/// Returns zero to four regions in scan order; see [`detect_with_threshold`].
#[must_use]
pub fn detect(image: &RgbaImage) -> Vec<Region> {
    detect_with_threshold(image, DETECTION_THRESHOLD)
}

/// Detect probable watermark regions whose confidence exceeds `threshold`.
///
/// Deterministic for a given pixel buffer. Regions are returned in probe
/// scan order with no further sorting.
#[must_use]
pub fn detect_with_threshold(image: &RgbaImage, threshold: f64) -> Vec<Region> {
    analyze_probes(image)
        .into_iter()
        .filter(|(_, region, _)| region.confidence > threshold)
        .map(|(_, region, _)| region)
        .collect()
}
