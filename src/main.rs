use std::env;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use maskset::labels::{LabelTable, LabelWriter, RECT_HEADER};
use maskset::session::{LabelingSession, Outcome, StdinDecisions};
use maskset::stream::MjpegServer;
use maskset::{config, pipeline};

#[derive(Parser)]
#[command(name = "maskset")]
#[command(
    version,
    about = "Face-mask dataset builder - composite mask overlays, letterbox, split"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively composite mask overlays onto face photos
    Label {
        /// Index of the first image to label (prompted for when omitted)
        #[arg(short, long)]
        start: Option<usize>,
        /// Truncate the accepted-mask table and start from zero
        #[arg(long)]
        fresh: bool,
    },
    /// Letterbox all labeled samples and split into training/test sets
    Resize,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Label { start, fresh } => label(&cfg, start, fresh),
        Commands::Resize => pipeline::run(&cfg),
        Commands::Config => open_config(),
    }
}

fn label(cfg: &config::Config, start: Option<usize>, fresh: bool) -> Result<()> {
    let faces = LabelTable::open(&cfg.face_labels_path()).context("opening face label table")?;
    let keys = faces.unique_keys();
    if keys.is_empty() {
        anyhow::bail!("face label table has no rows; run the downloader first");
    }

    let start = match start {
        Some(s) => s,
        None => prompt_start_index(keys.len())?,
    };

    let mut writer = if fresh {
        LabelWriter::reinit(&cfg.mask_labels_path(), RECT_HEADER)?
    } else {
        LabelWriter::open_append(&cfg.mask_labels_path(), RECT_HEADER)?
    };

    let mut server =
        MjpegServer::start(cfg.stream_port).context("starting preview stream")?;
    let mut decisions = StdinDecisions;

    std::fs::create_dir_all(cfg.masked_dir())
        .with_context(|| format!("creating {}", cfg.masked_dir().display()))?;

    for (index, key) in keys.iter().enumerate().skip(start) {
        info!("[{}/{}] {}", index + 1, keys.len(), key);

        let path = cfg.normal_dir().join(key);
        let photo = match image::open(&path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                warn!("skipping {key}: {e}");
                continue;
            }
        };
        let records = match faces.face_rows(key) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("skipping {key}: {e}");
                continue;
            }
        };

        let mut working = photo;
        let mut accepted = 0usize;
        {
            let mut session = LabelingSession::new(
                cfg.mask_assets_dir(),
                cfg.vertical_scale,
                &mut writer,
                &server,
                &mut decisions,
            );
            for record in &records {
                match session.run_face(key, &mut working, &record.bbox)? {
                    Outcome::Accepted(_) => accepted += 1,
                    Outcome::Rejected => {}
                }
            }
        }

        if accepted > 0 {
            let out = cfg
                .masked_dir()
                .join(pipeline::suffixed_name(key, &cfg.masked_suffix));
            working
                .save(&out)
                .with_context(|| format!("writing {}", out.display()))?;
            info!("saved {} ({accepted} mask(s))", out.display());
        }
    }

    server.shutdown();
    Ok(())
}

/// Ask where to resume. Invalid input re-prompts, like the decision loop.
fn prompt_start_index(total: usize) -> Result<usize> {
    let stdin = io::stdin();
    loop {
        print!("start index (0..{total}) > ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            anyhow::bail!("start index input closed");
        }
        match line.trim().parse::<usize>() {
            Ok(index) if index < total => return Ok(index),
            Ok(index) => warn!("index {index} out of range"),
            Err(_) => warn!("not a number: {:?}", line.trim()),
        }
    }
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
