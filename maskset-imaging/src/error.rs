use std::path::PathBuf;

use thiserror::Error;

use crate::asset::MaskVariant;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no mask asset for variant {variant} at {path}")]
    AssetNotFound { variant: MaskVariant, path: PathBuf },

    #[error("image has a zero dimension")]
    ZeroDimensions,

    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
}
