//! Command-line surface.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::media::processor::{prepare_media_folder, process_folder};
use crate::media::timestamp::parse_manual_date;
use crate::media::set_media_time;
use crate::ocr::setup::check_prerequisites;
use crate::ocr::{DateRecognizer, EngineVerdict, Recognition};

#[derive(Parser, Debug)]
#[command(name = "dashcam-stamp")]
#[command(
    version,
    about = "Dates dash-cam media by reading the on-screen watermark",
    long_about = None
)]
pub struct Cli {
    /// Config file (default: config.json next to the executable)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Date and rename every picture and video in the media folder
    Run {
        /// Media folder (overrides the config)
        #[arg(short, long)]
        folder: Option<PathBuf>,
    },

    /// Show what each engine reads from one image
    Recognize {
        /// Screenshot or frame to read
        image: PathBuf,
    },

    /// Set a file's capture time by hand
    SetTime {
        file: PathBuf,

        /// Date as YYYY-MM-DD
        date: String,
    },

    /// Check engine models and Tesseract data
    Setup {
        /// Report only, do not download missing tessdata
        #[arg(long)]
        no_download: bool,
    },
}

pub fn execute(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Run { folder } => run(folder.as_deref(), config),
        Commands::Recognize { image } => recognize(&image, config),
        Commands::SetTime { file, date } => set_time(&file, &date),
        Commands::Setup { no_download } => setup(config, !no_download),
    }
}

fn run(folder: Option<&Path>, config: &AppConfig) -> Result<()> {
    let folder = folder.unwrap_or(&config.media.media_folder);

    if !prepare_media_folder(folder)? {
        println!(
            "Created media folder {}. Put pictures and videos in it and run again.",
            folder.display()
        );
        return Ok(());
    }

    let recognizer = DateRecognizer::from_config(config)?;
    info!("Engines: {}", recognizer.engine_names().join(", "));

    let summary = process_folder(folder, &recognizer, &config.media)?;
    println!(
        "{} processed, {} skipped, {} failed",
        summary.processed, summary.skipped, summary.failed
    );
    Ok(())
}

fn recognize(path: &Path, config: &AppConfig) -> Result<()> {
    let img = image::open(path).with_context(|| format!("Failed to decode {}", path.display()))?;
    let recognizer = DateRecognizer::from_config(config)?;
    let recognition = recognizer.recognize(&img)?;
    print!("{}", describe(&recognition));
    Ok(())
}

/// Per-engine breakdown followed by the final answer.
pub fn describe(recognition: &Recognition) -> String {
    let mut out = String::new();
    for report in &recognition.reports {
        let verdict = match &report.verdict {
            EngineVerdict::Accepted(date) => format!("accepted {}", date),
            EngineVerdict::EngineFailed(reason) => format!("failed: {}", reason),
            EngineVerdict::NoCandidate => "no candidate".to_string(),
            EngineVerdict::OutOfWindow(date) => format!("implausible {}", date),
        };
        out.push_str(&format!(
            "{:<16} raw={:?} canonical={:?} -> {}\n",
            report.engine,
            report.raw.as_deref().unwrap_or(""),
            report.canonical.as_deref().unwrap_or(""),
            verdict
        ));
    }
    match &recognition.resolution {
        Some(resolution) => out.push_str(&format!(
            "date: {} ({:?})\n",
            resolution.date.format("%Y-%m-%d"),
            resolution.agreement
        )),
        None => out.push_str("date: no result\n"),
    }
    out
}

fn set_time(path: &Path, date: &str) -> Result<()> {
    if !path.is_file() {
        bail!("No such file {}", path.display());
    }
    let date = parse_manual_date(date, Local::now().date_naive())?;

    if !set_media_time(path, date).succeeded() {
        bail!("Could not set the time of {}", path.display());
    }
    println!("{} set to {}", path.display(), date.format("%Y-%m-%d"));
    Ok(())
}

fn setup(config: &AppConfig, download: bool) -> Result<()> {
    let report = check_prerequisites(config, download);
    let mut missing = 0;

    for item in &report {
        match &item.status {
            Ok(path) => println!("[ok]      {} {}: {}", item.engine, item.item, path.display()),
            Err(reason) => {
                missing += 1;
                println!("[missing] {} {}: {}", item.engine, item.item, reason);
            }
        }
    }

    if missing > 0 {
        warn!("{} prerequisite(s) missing; those engines will be skipped", missing);
    }
    Ok(())
}
