//! Accept/retry/skip decision loop over one face record.
//!
//! The loop is an explicit state machine with an injected decision
//! source, so the same logic runs against a terminal during labeling
//! and against a scripted source in tests. The only durable effects
//! are frame pushes to the sink and appends to the label store.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::warn;
use thiserror::Error;

use image::RgbImage;
use maskset_imaging::{composite, BBox, Error as ImagingError, MaskAsset, MaskPlacement, MaskVariant};

use crate::labels::{LabelRow, LabelWriter};
use crate::stream::FrameSink;

/// Operator verdict on the current proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Persist the placement and keep the composite (`s`).
    Accept,
    /// Abandon this face record without a row (`a` or `i`).
    Reject,
    /// Try the next mask orientation (`d`).
    RetryOrientation,
    /// Try the next mask color (`w`).
    RetryColor,
}

#[derive(Debug, Error)]
#[error("invalid decision {0:?} (expected s, a, i, d or w)")]
pub struct InvalidDecision(pub String);

impl Decision {
    /// Parse a single-character command. Anything outside the command
    /// set is an error, never a silent state change.
    pub fn parse(input: &str) -> Result<Self, InvalidDecision> {
        match input.trim() {
            "s" => Ok(Decision::Accept),
            "a" | "i" => Ok(Decision::Reject),
            "d" => Ok(Decision::RetryOrientation),
            "w" => Ok(Decision::RetryColor),
            other => Err(InvalidDecision(other.to_string())),
        }
    }
}

/// Where decisions come from. Implementations hand back only valid
/// decisions; re-prompting on bad input happens behind this seam.
pub trait DecisionSource {
    fn next_decision(&mut self) -> Result<Decision>;
}

/// Terminal decision source: prompts on stdout, reads stdin, reports
/// invalid commands and asks again.
#[derive(Debug, Default)]
pub struct StdinDecisions;

impl DecisionSource for StdinDecisions {
    fn next_decision(&mut self) -> Result<Decision> {
        let stdin = io::stdin();
        loop {
            print!("[s]ave  [a/i] skip  [d] next orientation  [w] next color > ");
            io::stdout().flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                anyhow::bail!("decision input closed");
            }
            match Decision::parse(&line) {
                Ok(decision) => return Ok(decision),
                Err(e) => warn!("{e}"),
            }
        }
    }
}

/// How one face record left the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A placement was persisted and the working image now carries it.
    Accepted(LabelRow),
    /// No row was persisted for this record.
    Rejected,
}

/// Drives the proposal loop for face records on one photo.
pub struct LabelingSession<'a> {
    assets_dir: PathBuf,
    vertical_scale: u32,
    writer: &'a mut LabelWriter,
    sink: &'a dyn FrameSink,
    decisions: &'a mut dyn DecisionSource,
}

impl<'a> LabelingSession<'a> {
    pub fn new(
        assets_dir: PathBuf,
        vertical_scale: u32,
        writer: &'a mut LabelWriter,
        sink: &'a dyn FrameSink,
        decisions: &'a mut dyn DecisionSource,
    ) -> Self {
        Self {
            assets_dir,
            vertical_scale,
            writer,
            sink,
            decisions,
        }
    }

    /// Run the loop for one face box on `image`.
    ///
    /// On accept the composite replaces `image`, so a later face on the
    /// same photo composites onto the already-masked result, and the
    /// appended row is returned. Exactly zero or one row is persisted
    /// per call.
    pub fn run_face(&mut self, key: &str, image: &mut RgbImage, face: &BBox) -> Result<Outcome> {
        let mut variant = MaskVariant::default();
        loop {
            let placement = MaskPlacement::from_face(face, self.vertical_scale);
            let proposal =
                match MaskAsset::load(&self.assets_dir, variant, placement.width(), placement.height())
                {
                    Ok(asset) => {
                        let result = composite(image, placement, &asset);
                        self.sink.push(&result.image);
                        Some(result)
                    }
                    Err(e @ ImagingError::AssetNotFound { .. }) => {
                        // Missing variant graphic fails this attempt only;
                        // the operator can cycle to another one.
                        warn!("{e}; pick another variant");
                        None
                    }
                    Err(e) => return Err(e).context("loading mask asset"),
                };

            match self.decisions.next_decision()? {
                Decision::Accept => match proposal {
                    Some(result) => {
                        let row = LabelRow {
                            key: key.to_string(),
                            bbox: result.placement.bbox(),
                        };
                        self.writer.append(&row).context("persisting label row")?;
                        *image = result.image;
                        return Ok(Outcome::Accepted(row));
                    }
                    None => warn!("nothing to accept for variant {variant}"),
                },
                Decision::Reject => return Ok(Outcome::Rejected),
                Decision::RetryOrientation => variant.next_orientation(),
                Decision::RetryColor => variant.next_color(),
            }
        }
    }
}
