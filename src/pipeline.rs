//! Batch resize-and-split stage: letterbox every labeled sample's
//! channels into the fixed canvas and route them to their partition.
//!
//! Per-sample failures (missing photo, undecodable file, malformed
//! rows) are warned and skipped; a multi-hundred-image run survives a
//! handful of bad samples. Only structural failures — unreadable label
//! table, uncreatable output directory — abort the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use log::{info, warn};
use thiserror::Error;

use maskset_imaging::{BBox, Letterboxer};

use crate::config::Config;
use crate::labels::{LabelError, LabelTable, LabelWriter, DATASET_HEADER};
use crate::splitter::{DatasetSplitter, Split};

#[derive(Debug, Error)]
enum SampleError {
    #[error("image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("failed to decode {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Insert a suffix before the filename's extension:
/// `abc.jpg` + `_masked` → `abc_masked.jpg`.
pub fn suffixed_name(key: &str, suffix: &str) -> String {
    let path = Path::new(key);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}{}.{}",
            stem.to_string_lossy(),
            suffix,
            ext.to_string_lossy()
        ),
        _ => format!("{key}{suffix}"),
    }
}

fn open_rgb(path: &Path) -> Result<RgbImage, SampleError> {
    if !path.exists() {
        return Err(SampleError::ImageNotFound(path.to_path_buf()));
    }
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| SampleError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })
}

/// Fill a box with white on a black source-sized canvas, clamped to
/// the canvas edges. Box edges are inclusive, matching the annotation
/// convention the labels were drawn with.
fn render_mask_channel(width: u32, height: u32, bbox: &BBox) -> RgbImage {
    let mut channel = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    let xmax = bbox.xmax.min(width.saturating_sub(1));
    let ymax = bbox.ymax.min(height.saturating_sub(1));
    for y in bbox.ymin..=ymax {
        for x in bbox.xmin..=xmax {
            channel.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    channel
}

struct SplitWriters {
    training: LabelWriter,
    test: LabelWriter,
}

impl SplitWriters {
    fn get(&mut self, split: Split) -> &mut LabelWriter {
        match split {
            Split::Training => &mut self.training,
            Split::Test => &mut self.test,
        }
    }
}

/// Run the full resize/split pass over the accepted-mask table.
pub fn run(cfg: &Config) -> Result<()> {
    let table = LabelTable::open(&cfg.mask_labels_path())?;
    let letterboxer = Letterboxer::new(cfg.canvas_width, cfg.canvas_height);
    let mut splitter = DatasetSplitter::new(cfg.train_ratio);

    for split in [Split::Training, Split::Test] {
        for dir in [
            cfg.resized_truth_dir(split),
            cfg.resized_masked_dir(split),
            cfg.resized_masks_dir(split),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating output dir {}", dir.display()))?;
        }
    }
    // Each run regenerates the dataset tables from scratch
    let mut writers = SplitWriters {
        training: LabelWriter::reinit(&cfg.dataset_csv_path(Split::Training), DATASET_HEADER)?,
        test: LabelWriter::reinit(&cfg.dataset_csv_path(Split::Test), DATASET_HEADER)?,
    };

    let keys = table.unique_keys();
    info!("resizing {} samples into {}x{}", keys.len(), cfg.canvas_width, cfg.canvas_height);

    let mut done = 0usize;
    let mut skipped = 0usize;
    for key in &keys {
        let split = splitter.assign(key);
        match process_sample(cfg, &letterboxer, &table, key, split, &mut writers) {
            Ok(()) => done += 1,
            Err(e) => {
                skipped += 1;
                warn!("skipping {key}: {e:#}");
            }
        }
    }
    info!("resize complete: {done} samples written, {skipped} skipped");
    Ok(())
}

/// Fan one sample's artifacts out to its partition: letterboxed ground
/// truth, letterboxed masked photo, one letterboxed mask channel per
/// mask instance, and one dataset row per instance in canvas space.
fn process_sample(
    cfg: &Config,
    letterboxer: &Letterboxer,
    table: &LabelTable,
    key: &str,
    split: Split,
    writers: &mut SplitWriters,
) -> Result<()> {
    let masks = table.mask_rows(key)?;

    let truth_path = cfg.normal_dir().join(key);
    let truth = open_rgb(&truth_path)?;

    let masked_name = suffixed_name(key, &cfg.masked_suffix);
    let masked = open_rgb(&cfg.masked_dir().join(&masked_name))?;

    let (truth_canvas, transform) = letterboxer.fit(&truth)?;
    let (masked_canvas, _) = letterboxer.fit(&masked)?;

    let truth_out = cfg.resized_truth_dir(split).join(key);
    truth_canvas
        .save(&truth_out)
        .with_context(|| format!("writing {}", truth_out.display()))?;

    let masked_out = cfg.resized_masked_dir(split).join(&masked_name);
    masked_canvas
        .save(&masked_out)
        .with_context(|| format!("writing {}", masked_out.display()))?;

    let (width, height) = truth.dimensions();
    for (index, mask) in masks.iter().enumerate() {
        let mask_num = index + 1;
        let bbox = mask.region.tight_bbox();

        let channel = render_mask_channel(width, height, &bbox);
        let (channel_canvas, _) = letterboxer.fit(&channel)?;
        let channel_out = cfg
            .resized_masks_dir(split)
            .join(suffixed_name(key, &format!("_{mask_num}")));
        channel_canvas
            .save(&channel_out)
            .with_context(|| format!("writing {}", channel_out.display()))?;

        let scaled = transform.apply(&bbox);
        writers.get(split).append_line(&format!(
            "{key},{mask_num},{},{},{},{}",
            scaled.xmin, scaled.ymin, scaled.xmax, scaled.ymax
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_lands_before_the_extension() {
        assert_eq!(suffixed_name("abc.jpg", "_masked"), "abc_masked.jpg");
        assert_eq!(suffixed_name("abc.jpg", "_2"), "abc_2.jpg");
        assert_eq!(suffixed_name("noext", "_masked"), "noext_masked");
    }

    #[test]
    fn mask_channel_is_binary_and_clamped() {
        let channel = render_mask_channel(20, 10, &BBox::new(5, 30, 2, 30));
        assert_eq!(*channel.get_pixel(5, 2), Rgb([255, 255, 255]));
        assert_eq!(*channel.get_pixel(19, 9), Rgb([255, 255, 255]));
        assert_eq!(*channel.get_pixel(4, 2), Rgb([0, 0, 0]));
        assert_eq!(*channel.get_pixel(5, 1), Rgb([0, 0, 0]));
    }
}
