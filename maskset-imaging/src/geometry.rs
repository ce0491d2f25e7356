//! Bounding-box and placement math shared by the compositor and the
//! resize pipeline. Coordinates are absolute pixels in the image they
//! were measured on; rescaling goes through [`CanvasTransform`].

/// Axis-aligned box in integer pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub xmin: u32,
    pub xmax: u32,
    pub ymin: u32,
    pub ymax: u32,
}

impl BBox {
    pub fn new(xmin: u32, xmax: u32, ymin: u32, ymax: u32) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    pub fn width(&self) -> u32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> u32 {
        self.ymax - self.ymin
    }
}

/// Where a mask overlay lands on a face photo.
///
/// Derived from a face box: full face width, bottom `1/vertical_scale`
/// of the face height (the default scale of 2 covers the lower half).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskPlacement {
    pub xmin: u32,
    pub xmax: u32,
    pub ymin: u32,
    pub ymax: u32,
}

impl MaskPlacement {
    /// Compute the placement rectangle for a face box.
    ///
    /// Floor division on the height keeps the rectangle inside the face
    /// box, so a placement is in-bounds whenever the face box was.
    pub fn from_face(face: &BBox, vertical_scale: u32) -> Self {
        Self {
            xmin: face.xmin,
            xmax: face.xmax,
            ymin: face.ymax - face.height() / vertical_scale,
            ymax: face.ymax,
        }
    }

    pub fn width(&self) -> u32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> u32 {
        self.ymax - self.ymin
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.xmin, self.xmax, self.ymin, self.ymax)
    }
}

/// Eight-corner mask outline as annotated on the photo: top/bottom ×
/// left/mid/right, minus the two mid rows' unused corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskPolygon {
    pub xtl: u32,
    pub ytl: u32,
    pub xtm: u32,
    pub ytm: u32,
    pub xtr: u32,
    pub ytr: u32,
    pub xbr: u32,
    pub ybr: u32,
    pub xbm: u32,
    pub ybm: u32,
    pub xbl: u32,
    pub ybl: u32,
}

/// A detected mask region in one of its two annotated shapes.
///
/// Downstream resize/split code only ever looks at [`tight_bbox`],
/// so it never needs to know which shape a row carried.
///
/// [`tight_bbox`]: MaskRegion::tight_bbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskRegion {
    Rect(BBox),
    Polygon(MaskPolygon),
}

impl MaskRegion {
    /// Minimal axis-aligned box enclosing the region.
    ///
    /// The polygon is not a rectangle; each edge of the envelope is
    /// taken over exactly the corners that can push it outward.
    pub fn tight_bbox(&self) -> BBox {
        match self {
            MaskRegion::Rect(b) => *b,
            MaskRegion::Polygon(p) => BBox {
                xmin: p.xtl.min(p.xbl).min(p.xtm).min(p.xbm),
                xmax: p.xbr.max(p.xtr),
                ymin: p.ytl.min(p.ytr).min(p.ytm),
                ymax: p.ybl.max(p.ybm).max(p.ybr),
            },
        }
    }
}

/// How a source image and its boxes map into the fixed output canvas.
///
/// Content is anchored top-left; the offsets exist so the record is
/// self-describing but are always zero in the current layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    pub scale: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub target_width: u32,
    pub target_height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
}

impl CanvasTransform {
    /// Map a box from source coordinates into canvas coordinates.
    pub fn apply(&self, b: &BBox) -> BBox {
        BBox {
            xmin: (b.xmin as f64 * self.scale) as u32 + self.x_offset,
            xmax: (b.xmax as f64 * self.scale) as u32 + self.x_offset,
            ymin: (b.ymin as f64 * self.scale) as u32 + self.y_offset,
            ymax: (b.ymax as f64 * self.scale) as u32 + self.y_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_covers_bottom_half_by_default() {
        let face = BBox::new(100, 300, 50, 250);
        let p = MaskPlacement::from_face(&face, 2);
        assert_eq!(p.xmin, 100);
        assert_eq!(p.xmax, 300);
        assert_eq!(p.ymin, 150);
        assert_eq!(p.ymax, 250);
        assert_eq!(p.height(), face.height() / 2);
    }

    #[test]
    fn placement_floor_division_stays_inside_face() {
        // 99 / 3 floors to 33
        let face = BBox::new(10, 20, 0, 99);
        let p = MaskPlacement::from_face(&face, 3);
        assert_eq!(p.ymin, 99 - 33);
        assert_eq!(p.ymax, 99);
        assert!(p.ymin >= face.ymin);
        assert_eq!(p.height(), face.height() / 3);
    }

    #[test]
    fn rect_region_tight_bbox_is_itself() {
        let b = BBox::new(1, 9, 2, 8);
        assert_eq!(MaskRegion::Rect(b).tight_bbox(), b);
    }

    #[test]
    fn polygon_tight_bbox_takes_extreme_corners() {
        let p = MaskPolygon {
            xtl: 10,
            ytl: 20,
            xtm: 15,
            ytm: 18,
            xtr: 88,
            ytr: 22,
            xbr: 90,
            ybr: 82,
            xbm: 14,
            ybm: 85,
            xbl: 12,
            ybl: 80,
        };
        let b = MaskRegion::Polygon(p).tight_bbox();
        assert_eq!(b, BBox::new(10, 90, 18, 85));
    }

    #[test]
    fn transform_keeps_boxes_inside_scaled_content() {
        let t = CanvasTransform {
            scale: 800.0 / 1200.0,
            scaled_width: 800,
            scaled_height: 400,
            target_width: 800,
            target_height: 800,
            x_offset: 0,
            y_offset: 0,
        };
        let b = t.apply(&BBox::new(0, 1200, 0, 600));
        assert!(b.xmax <= t.scaled_width);
        assert!(b.ymax <= t.scaled_height);
        assert_eq!(b.xmin, 0);
        assert_eq!(b.ymin, 0);
    }
}
