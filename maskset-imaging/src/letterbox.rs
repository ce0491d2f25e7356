//! Aspect-preserving resize into a fixed canvas, anchored top-left.
//!
//! One scale factor per image: the longer source dimension picks which
//! target edge constrains the scale, then both dimensions use it. The
//! unused canvas area keeps the fill color, padding growing right/bottom
//! only, so boxes co-transform with a bare multiply and no offset.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use log::debug;

use crate::error::Error;
use crate::geometry::CanvasTransform;

/// Scale-and-pad transform into a fixed canvas.
#[derive(Debug, Clone, Copy)]
pub struct Letterboxer {
    target_width: u32,
    target_height: u32,
    fill: Rgb<u8>,
}

impl Letterboxer {
    /// Letterbox into a `width` × `height` canvas with black padding.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target_width: width,
            target_height: height,
            fill: Rgb([0, 0, 0]),
        }
    }

    /// Change the padding fill color.
    pub fn with_fill(mut self, fill: Rgb<u8>) -> Self {
        self.fill = fill;
        self
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Fit `image` into the canvas, returning it together with the
    /// transform that maps source boxes into canvas coordinates.
    ///
    /// Pure in its inputs: the same image always yields the same canvas.
    pub fn fit(&self, image: &RgbImage) -> Result<(RgbImage, CanvasTransform), Error> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || self.target_width == 0 || self.target_height == 0 {
            return Err(Error::ZeroDimensions);
        }

        let scale = if height > width {
            self.target_height as f64 / height as f64
        } else {
            self.target_width as f64 / width as f64
        };
        let scaled_width = (width as f64 * scale) as u32;
        let scaled_height = (height as f64 * scale) as u32;
        debug!(
            "letterbox {width}x{height} -> {scaled_width}x{scaled_height} in {}x{}",
            self.target_width, self.target_height
        );

        // Triangle does the area-style averaging we want when shrinking;
        // skipping the no-op resize keeps refitting a canvas bit-identical.
        let scaled = if (scaled_width, scaled_height) == (width, height) {
            image.clone()
        } else {
            imageops::resize(image, scaled_width, scaled_height, FilterType::Triangle)
        };

        let mut canvas = RgbImage::from_pixel(self.target_width, self.target_height, self.fill);
        imageops::replace(&mut canvas, &scaled, 0, 0);

        let transform = CanvasTransform {
            scale,
            scaled_width,
            scaled_height,
            target_width: self.target_width,
            target_height: self.target_height,
            x_offset: 0,
            y_offset: 0,
        };
        Ok((canvas, transform))
    }
}
