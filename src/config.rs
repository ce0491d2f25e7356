use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::splitter::Split;

pub static CONFIG_PATH: Lazy<&'static Path> =
    Lazy::new(|| Path::new(option_env!("MASKSET_CONFIG_PATH").unwrap_or("maskset.toml")));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the dataset tree (labels/ and images/ live under it).
    pub data_dir: PathBuf,
    /// Output canvas size for the resize stage.
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Fraction of samples routed to the training split.
    pub train_ratio: f64,
    /// The mask covers the bottom 1/vertical_scale of each face box.
    pub vertical_scale: u32,
    /// Inserted before the extension of masked photo filenames.
    pub masked_suffix: String,
    /// Port the MJPEG preview server listens on during labeling.
    pub stream_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            canvas_width: 800,
            canvas_height: 800,
            train_ratio: 0.75,
            vertical_scale: 2,
            masked_suffix: "_masked".to_string(),
            stream_port: 4000,
        }
    }
}

impl Config {
    pub fn labels_dir(&self) -> PathBuf {
        self.data_dir.join("labels")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Unmasked source photos.
    pub fn normal_dir(&self) -> PathBuf {
        self.images_dir().join("normal_faces")
    }

    /// Overlay graphics, one PNG per mask variant.
    pub fn mask_assets_dir(&self) -> PathBuf {
        self.images_dir().join("masks")
    }

    /// Photos with composited masks.
    pub fn masked_dir(&self) -> PathBuf {
        self.images_dir().join("masked_faces")
    }

    pub fn face_labels_path(&self) -> PathBuf {
        self.labels_dir().join("normal_faces.csv")
    }

    pub fn mask_labels_path(&self) -> PathBuf {
        self.labels_dir().join("masked_faces.csv")
    }

    /// Letterboxed ground-truth photos for one split.
    pub fn resized_truth_dir(&self, split: Split) -> PathBuf {
        self.images_dir().join("rs_truth").join(split.as_str())
    }

    /// Letterboxed masked photos for one split.
    pub fn resized_masked_dir(&self, split: Split) -> PathBuf {
        self.images_dir().join("rs_masked").join(split.as_str())
    }

    /// Letterboxed binary mask channels for one split.
    pub fn resized_masks_dir(&self, split: Split) -> PathBuf {
        self.images_dir().join("rs_masks").join(split.as_str())
    }

    /// Final per-mask label rows for one split.
    pub fn dataset_csv_path(&self, split: Split) -> PathBuf {
        self.labels_dir()
            .join(format!("dataset_{}.csv", split.as_str()))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_follows_the_data_tree() {
        let cfg = Config::default();
        assert_eq!(
            cfg.face_labels_path(),
            PathBuf::from("./data/labels/normal_faces.csv")
        );
        assert_eq!(
            cfg.resized_masks_dir(Split::Test),
            PathBuf::from("./data/images/rs_masks/test")
        );
        assert_eq!(
            cfg.dataset_csv_path(Split::Training),
            PathBuf::from("./data/labels/dataset_training.csv")
        );
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let cfg = load_config(Some(Path::new("/no/such/maskset.toml"))).unwrap();
        assert_eq!(cfg.canvas_width, 800);
        assert_eq!(cfg.vertical_scale, 2);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.train_ratio = 0.8;
        cfg.stream_port = 8190;
        let raw = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&raw).unwrap();
        assert_eq!(back.train_ratio, 0.8);
        assert_eq!(back.stream_port, 8190);
    }
}
