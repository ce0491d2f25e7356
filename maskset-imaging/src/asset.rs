//! Mask overlay graphics: one RGBA file per (orientation, color)
//! variant, resized to the placement footprint before compositing.

use std::fmt;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::Error;

/// Which way the mask graphic faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Mid,
    Left,
    Right,
    MidLeft,
    MidRight,
}

impl Orientation {
    pub const ALL: [Orientation; 5] = [
        Orientation::Mid,
        Orientation::Left,
        Orientation::Right,
        Orientation::MidLeft,
        Orientation::MidRight,
    ];

    /// Next orientation in the cycle, wrapping back to the first.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|o| *o == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Mid => "mid",
            Orientation::Left => "left",
            Orientation::Right => "right",
            Orientation::MidLeft => "mid_left",
            Orientation::MidRight => "mid_right",
        }
    }
}

/// Color of the mask graphic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    Black,
    White,
    #[default]
    Blue,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Black, Color::White, Color::Blue];

    /// Next color in the cycle, wrapping back to the first.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
            Color::Blue => "blue",
        }
    }
}

/// One of the 15 (orientation, color) overlay choices. The two axes
/// advance independently during a labeling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskVariant {
    pub orientation: Orientation,
    pub color: Color,
}

impl MaskVariant {
    pub fn next_orientation(&mut self) {
        self.orientation = self.orientation.next();
    }

    pub fn next_color(&mut self) {
        self.color = self.color.next();
    }

    /// Name of the backing graphic, e.g. `mid_blue.png`.
    pub fn file_name(&self) -> String {
        format!("{}_{}.png", self.orientation.as_str(), self.color.as_str())
    }
}

impl fmt::Display for MaskVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.orientation.as_str(), self.color.as_str())
    }
}

/// An overlay graphic loaded and scaled to a placement footprint.
#[derive(Debug, Clone)]
pub struct MaskAsset {
    pub image: RgbaImage,
    pub variant: MaskVariant,
}

impl MaskAsset {
    /// Load the graphic for `variant` from `dir` and resize it to
    /// `width` × `height`, keeping the alpha channel.
    pub fn load(dir: &Path, variant: MaskVariant, width: u32, height: u32) -> Result<Self, Error> {
        let path = dir.join(variant.file_name());
        if !path.exists() {
            return Err(Error::AssetNotFound { variant, path });
        }
        if width == 0 || height == 0 {
            return Err(Error::ZeroDimensions);
        }
        let graphic = image::open(&path)?.to_rgba8();
        let image = imageops::resize(&graphic, width, height, FilterType::Triangle);
        Ok(Self { image, variant })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn orientation_cycle_wraps() {
        let mut o = Orientation::Mid;
        for _ in 0..Orientation::ALL.len() {
            o = o.next();
        }
        assert_eq!(o, Orientation::Mid);
    }

    #[test]
    fn color_cycle_wraps() {
        assert_eq!(Color::Blue.next(), Color::Black);
        assert_eq!(Color::Black.next(), Color::White);
        assert_eq!(Color::White.next(), Color::Blue);
    }

    #[test]
    fn variant_axes_are_independent() {
        let mut v = MaskVariant::default();
        v.next_orientation();
        assert_eq!(v.orientation, Orientation::Left);
        assert_eq!(v.color, Color::Blue);
        v.next_color();
        assert_eq!(v.orientation, Orientation::Left);
        assert_eq!(v.color, Color::Black);
    }

    #[test]
    fn file_name_format() {
        let v = MaskVariant {
            orientation: Orientation::MidLeft,
            color: Color::White,
        };
        assert_eq!(v.file_name(), "mid_left_white.png");
    }

    #[test]
    fn missing_asset_is_not_found() {
        let dir = std::env::temp_dir().join("maskset-no-such-assets");
        let err = MaskAsset::load(&dir, MaskVariant::default(), 10, 10).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound { .. }));
    }

    #[test]
    fn load_resizes_to_requested_footprint() {
        let dir = std::env::temp_dir().join(format!("maskset-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let graphic = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        graphic.save(dir.join("mid_blue.png")).unwrap();

        let asset = MaskAsset::load(&dir, MaskVariant::default(), 20, 10).unwrap();
        assert_eq!(asset.image.dimensions(), (20, 10));
        assert_eq!(asset.image.get_pixel(0, 0)[3], 255);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
