//! Overlay a mask asset onto a face photo at its placement rectangle.

use image::{Rgb, RgbImage};

use crate::asset::MaskAsset;
use crate::geometry::MaskPlacement;

/// A composited photo together with the placement that produced it,
/// so the caller can persist the exact coordinates it is looking at.
#[derive(Debug, Clone)]
pub struct Composite {
    pub image: RgbImage,
    pub placement: MaskPlacement,
}

/// Composite `asset` onto a copy of `face` at `placement`.
///
/// Binary alpha cut: any asset pixel with non-zero alpha overwrites the
/// destination with the asset's color channels, zero-alpha pixels leave
/// it untouched. The caller's buffer is never mutated, and pixels
/// outside the placement rectangle are untouched in the copy.
///
/// Deterministic in its inputs; destination writes that would fall off
/// the photo (possible only with a face box that already overflowed it)
/// are skipped.
pub fn composite(face: &RgbImage, placement: MaskPlacement, asset: &MaskAsset) -> Composite {
    let mut out = face.clone();
    let (width, height) = out.dimensions();

    for (x, y, pixel) in asset.image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        let dx = placement.xmin + x;
        let dy = placement.ymin + y;
        if dx < width && dy < height {
            out.put_pixel(dx, dy, Rgb([pixel[0], pixel[1], pixel[2]]));
        }
    }

    Composite {
        image: out,
        placement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MaskVariant;
    use crate::geometry::BBox;
    use image::{Rgba, RgbaImage};

    fn checker_asset(width: u32, height: u32) -> MaskAsset {
        // Alternating opaque-blue / fully-transparent pixels
        let mut img = RgbaImage::new(width, height);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = if (x + y) % 2 == 0 {
                Rgba([0, 0, 200, 255])
            } else {
                Rgba([9, 9, 9, 0])
            };
        }
        MaskAsset {
            image: img,
            variant: MaskVariant::default(),
        }
    }

    #[test]
    fn source_buffer_is_never_mutated() {
        let face = RgbImage::from_pixel(20, 20, Rgb([50, 60, 70]));
        let before = face.clone();
        let placement = MaskPlacement::from_face(&BBox::new(4, 12, 4, 12), 2);
        let _ = composite(&face, placement, &checker_asset(8, 4));
        assert_eq!(face, before);
    }

    #[test]
    fn pixels_outside_placement_are_unchanged() {
        let face = RgbImage::from_pixel(20, 20, Rgb([50, 60, 70]));
        let placement = MaskPlacement::from_face(&BBox::new(4, 12, 4, 12), 2);
        let out = composite(&face, placement, &checker_asset(8, 4)).image;

        for (x, y, p) in out.enumerate_pixels() {
            let inside = x >= placement.xmin
                && x < placement.xmax
                && y >= placement.ymin
                && y < placement.ymax;
            if !inside {
                assert_eq!(*p, Rgb([50, 60, 70]), "pixel ({x},{y}) changed");
            }
        }
    }

    #[test]
    fn alpha_cut_is_binary() {
        let face = RgbImage::from_pixel(20, 20, Rgb([50, 60, 70]));
        let placement = MaskPlacement::from_face(&BBox::new(4, 12, 4, 12), 2);
        let asset = checker_asset(8, 4);
        let out = composite(&face, placement, &asset).image;

        for (x, y, p) in asset.image.enumerate_pixels() {
            let dst = out.get_pixel(placement.xmin + x, placement.ymin + y);
            if p[3] == 0 {
                assert_eq!(*dst, Rgb([50, 60, 70]));
            } else {
                assert_eq!(*dst, Rgb([p[0], p[1], p[2]]));
            }
        }
    }

    #[test]
    fn overflowing_placement_does_not_panic() {
        let face = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        // Face box wider than the photo itself
        let placement = MaskPlacement::from_face(&BBox::new(6, 20, 0, 10), 2);
        let out = composite(&face, placement, &checker_asset(14, 5));
        assert_eq!(out.image.dimensions(), (10, 10));
    }
}
