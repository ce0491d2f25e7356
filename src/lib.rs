pub mod config;
pub mod labels;
pub mod pipeline;
pub mod session;
pub mod splitter;
pub mod stream;

// Re-export imaging types for convenience
pub use maskset_imaging::{
    composite, BBox, CanvasTransform, Letterboxer, MaskAsset, MaskPlacement, MaskRegion,
    MaskVariant,
};
