//! Pixel and geometry primitives for the maskset dataset builder:
//! mask overlay assets, face-relative compositing, and the letterbox
//! resize that keeps bounding boxes aligned with the rescaled pixels.

pub mod asset;
pub mod compositor;
pub mod error;
pub mod geometry;
pub mod letterbox;

pub use asset::{Color, MaskAsset, MaskVariant, Orientation};
pub use compositor::{composite, Composite};
pub use error::Error;
pub use geometry::{BBox, CanvasTransform, MaskPlacement, MaskPolygon, MaskRegion};
pub use letterbox::Letterboxer;
