//! Local-average inpainting for watermark removal.
//!
//! Every pixel inside a region is replaced by the mean colour of the square
//! neighbourhood around it and made fully opaque. Regions are filled in list
//! order, pixels in raster order.

use image::{Rgba, RgbaImage};

use crate::region::Region;

/// Radius of the square sampling window (an 11x11 window).
pub const NEIGHBORHOOD_RADIUS: u32 = 5;

/// Where the neighbourhood average reads its samples from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillMode {
    /// Read from the image as it is being written. Pixels later in raster
    /// order, and later regions, see values already filled in.
    #[default]
    InPlace,
    /// Read from a copy taken before each region is filled. Pixels within a
    /// region do not influence each other; later regions still see earlier
    /// regions' output.
    Snapshot,
}

/// Mean RGB over the `(2 * radius + 1)`-square window centred on `(x, y)`.
///
/// The window is clipped to the image. Channels are rounded half up.
/// Returns `None` if no sample falls inside the image.
#[must_use]
pub fn neighborhood_average(image: &RgbaImage, x: u32, y: u32, radius: u32) -> Option<[u8; 3]> {
    let (w, h) = image.dimensions();
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    let x1 = x.saturating_add(radius).min(w.checked_sub(1)?);
    let y1 = y.saturating_add(radius).min(h.checked_sub(1)?);
    if x0 > x1 || y0 > y1 {
        return None;
    }

    let mut sum = [0_u64; 3];
    let mut count = 0_u64;
    for sy in y0..=y1 {
        for sx in x0..=x1 {
            let px = image.get_pixel(sx, sy);
            for (acc, &v) in sum.iter_mut().zip(&px.0[..3]) {
                *acc += u64::from(v);
            }
            count += 1;
        }
    }

    // round(sum / count) with halves rounded up
    Some(sum.map(|s| u8::try_from((2 * s + count) / (2 * count)).unwrap_or(u8::MAX)))
}

/// Fill one region of `image` with neighbourhood averages.
///
/// The region is clipped to the image; a region with nothing inside the
/// image leaves it untouched.
pub fn fill_region(image: &mut RgbaImage, region: &Region, mode: FillMode) {
    let Some(rect) = region.clip(image.width(), image.height()) else {
        return;
    };

    let snapshot = match mode {
        FillMode::InPlace => None,
        FillMode::Snapshot => Some(image.clone()),
    };

    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let source = snapshot.as_ref().unwrap_or(&*image);
            if let Some([r, g, b]) = neighborhood_average(source, x, y, NEIGHBORHOOD_RADIUS) {
                image.put_pixel(x, y, Rgba([r, g, b, u8::MAX]));
            }
        }
    }
}

/// Return a copy of `image` with every region filled in place, in order.
///
/// An empty region list returns a pixel-identical copy.
#[must_use]
pub fn remove(image: &RgbaImage, regions: &[Region]) -> RgbaImage {
    remove_with_mode(image, regions, FillMode::InPlace)
}

/// Return a copy of `image` with every region filled using `mode`.
#[must_use]
pub fn remove_with_mode(image: &RgbaImage, regions: &[Region], mode: FillMode) -> RgbaImage {
    let mut out = image.clone();
    for region in regions {
        fill_region(&mut out, region, mode);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);

    #[test]
    fn average_of_uniform_window_is_the_color() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([10, 200, 77, 255]));
        assert_eq!(neighborhood_average(&img, 10, 10, 5), Some([10, 200, 77]));
        assert_eq!(neighborhood_average(&img, 0, 0, 5), Some([10, 200, 77]));
    }

    #[test]
    fn average_clips_window_at_borders() {
        // 2x1 image: corner window only sees the two pixels
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        // 127.5 rounds up
        assert_eq!(neighborhood_average(&img, 0, 0, 5), Some([128, 128, 128]));
    }

    #[test]
    fn average_of_empty_image_is_none() {
        assert_eq!(neighborhood_average(&RgbaImage::new(0, 0), 0, 0, 5), None);
        assert_eq!(neighborhood_average(&RgbaImage::new(5, 5), 50, 50, 5), None);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn empty_region_list_is_identity() {
        let img = RgbaImage::from_fn(30, 20, |x, y| Rgba([x as u8, y as u8, (x * y) as u8, 100]));
        assert_eq!(remove(&img, &[]), img);
    }

    #[test]
    fn uniform_region_is_unchanged() {
        let img = RgbaImage::from_pixel(100, 80, GRAY);
        let out = remove(&img, &[Region::new(20, 10, 40, 30)]);
        assert_eq!(out, img);
    }

    #[test]
    fn fill_forces_opaque_alpha() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([50, 60, 70, 0]));
        let out = remove(&img, &[Region::new(2, 2, 3, 3)]);
        assert_eq!(*out.get_pixel(3, 3), Rgba([50, 60, 70, 255]));
        // outside the region alpha is untouched
        assert_eq!(out.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn single_pixel_image_fills_from_itself() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([9, 8, 7, 3]));
        let out = remove(&img, &[Region::new(0, 0, 1, 1)]);
        assert_eq!(*out.get_pixel(0, 0), Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn out_of_bounds_regions_are_clipped_or_ignored() {
        let img = RgbaImage::from_pixel(50, 40, GRAY);
        let out = remove(
            &img,
            &[
                Region::new(45, 35, 100, 100),
                Region::new(500, 500, 10, 10),
                Region::new(0, 0, 0, 0),
            ],
        );
        assert_eq!(out, img);
    }

    #[test]
    fn isolated_dot_takes_surrounding_color() {
        let mut img = RgbaImage::from_pixel(60, 60, GRAY);
        img.put_pixel(30, 30, Rgba([0, 0, 0, 255]));

        let snapshot = remove_with_mode(&img, &[Region::new(25, 25, 11, 11)], FillMode::Snapshot);
        // 120 gray samples and one black: 15360 / 121 = 126.9
        assert_eq!(*snapshot.get_pixel(30, 30), Rgba([127, 127, 127, 255]));

        let in_place = remove(&img, &[Region::new(25, 25, 11, 11)]);
        assert!(in_place.get_pixel(30, 30)[0] > 120);
    }

    #[test]
    fn in_place_and_snapshot_differ_inside_a_region() {
        let mut img = RgbaImage::from_pixel(40, 40, GRAY);
        for y in 10..30 {
            for x in 10..30 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let region = [Region::new(10, 10, 20, 20)];
        let in_place = remove_with_mode(&img, &region, FillMode::InPlace);
        let snapshot = remove_with_mode(&img, &region, FillMode::Snapshot);

        // first pixel sees identical input in both modes
        assert_eq!(in_place.get_pixel(10, 10), snapshot.get_pixel(10, 10));
        assert_ne!(in_place, snapshot);
    }

    #[test]
    fn later_regions_see_earlier_fills() {
        let mut img = RgbaImage::from_pixel(40, 40, GRAY);
        for y in 16..19 {
            for x in 16..19 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }

        let a = Region::new(15, 15, 5, 5);
        let b = Region::new(21, 21, 5, 5);
        let ab = remove(&img, &[a, b]);
        let ba = remove(&img, &[b, a]);

        // filled first, `b` still sees the dark block; filled second, it does not
        assert!(ab.get_pixel(21, 21)[0] > ba.get_pixel(21, 21)[0]);
    }
}
