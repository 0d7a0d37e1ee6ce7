//! Highlight rendering for detected regions.

use image::{Rgba, RgbaImage};

use crate::region::Region;

/// Outline and tint colour (`#f87171`).
pub const HIGHLIGHT: Rgba<u8> = Rgba([248, 113, 113, 255]);
/// Outline thickness in pixels.
const BORDER: u32 = 2;

/// Blend `px` 20% toward the highlight colour, keeping its alpha.
fn tint(px: Rgba<u8>) -> Rgba<u8> {
    let mix = |c: u8, h: u8| {
        let v = (4 * u16::from(c) + u16::from(h) + 2) / 5;
        u8::try_from(v).unwrap_or(u8::MAX)
    };
    Rgba([
        mix(px[0], HIGHLIGHT[0]),
        mix(px[1], HIGHLIGHT[1]),
        mix(px[2], HIGHLIGHT[2]),
        px[3],
    ])
}

/// Return a copy of `image` with each region tinted and outlined.
///
/// Regions are clipped to the image. Overlapping regions are tinted once
/// per region.
#[must_use]
pub fn highlight_regions(image: &RgbaImage, regions: &[Region]) -> RgbaImage {
    let mut out = image.clone();
    for region in regions {
        let Some(rect) = region.clip(out.width(), out.height()) else {
            continue;
        };
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                let on_border = x - rect.x < BORDER
                    || rect.right() - x <= BORDER
                    || y - rect.y < BORDER
                    || rect.bottom() - y <= BORDER;
                let px = if on_border {
                    HIGHLIGHT
                } else {
                    tint(*out.get_pixel(x, y))
                };
                out.put_pixel(x, y, px);
            }
        }
    }
    out
}
