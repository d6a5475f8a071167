//! Sequential batch over the media folder.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{error, info, warn};

use super::discover::discover;
use super::frame::extract_first_frame;
use super::rename::rename_with_date;
use super::timestamp::set_media_time;
use super::{MediaFile, MediaKind};
use crate::config::MediaConfig;
use crate::ocr::DateRecognizer;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Dated { date: NaiveDate, target: PathBuf },
    NoResult,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Creates the media folder when it is missing. Returns `false` if it had to
/// be created, meaning there is nothing to process yet.
pub fn prepare_media_folder(folder: &Path) -> Result<bool> {
    if folder.is_dir() {
        return Ok(true);
    }
    fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create media folder {}", folder.display()))?;
    Ok(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string())
}

/// Decodes a picture, or pulls the first frame out of a video.
fn load_image(file: &MediaFile, config: &MediaConfig) -> Result<image::DynamicImage> {
    match file.kind {
        MediaKind::Picture => image::open(&file.path)
            .with_context(|| format!("Failed to decode {}", file.path.display())),
        MediaKind::Video => {
            // Frames only outlive the run when crops are kept
            let scratch;
            let dir = if config.keep_crops {
                fs::create_dir_all(&config.crops_folder)?;
                config.crops_folder.as_path()
            } else {
                scratch = TempDir::new()?;
                scratch.path()
            };
            let frame = dir.join(format!("{}.jpg", file_stem(&file.path)));
            extract_first_frame(&config.ffmpeg, &file.path, &frame)?;
            image::open(&frame)
                .with_context(|| format!("Failed to decode frame {}", frame.display()))
        }
    }
}

/// Runs one file through recognition, time stamping and renaming.
pub fn process_file(
    file: &MediaFile,
    recognizer: &DateRecognizer,
    config: &MediaConfig,
) -> Result<FileOutcome> {
    let img = load_image(file, config)?;
    let recognition = recognizer.recognize(&img)?;

    if config.keep_crops {
        fs::create_dir_all(&config.crops_folder)?;
        // Keyed by the full name so clip.jpg and clip.mp4 keep separate crops
        let crop_path = config
            .crops_folder
            .join(format!("{}_crop.png", file.file_name()));
        fs::write(&crop_path, &recognition.region.png)
            .with_context(|| format!("Failed to save crop {}", crop_path.display()))?;
    }

    let Some(date) = recognition.date() else {
        return Ok(FileOutcome::NoResult);
    };

    if !set_media_time(&file.path, date).succeeded() {
        bail!("Could not set any timestamp on {}", file.path.display());
    }

    let prefix = match file.kind {
        MediaKind::Picture => &config.picture_prefix,
        MediaKind::Video => &config.video_prefix,
    };
    let target = rename_with_date(&file.path, date, prefix)?;

    Ok(FileOutcome::Dated { date, target })
}

/// Processes every media file in `folder`, one at a time. Per-file failures
/// are logged and counted; only an unreadable folder fails the batch.
pub fn process_folder(
    folder: &Path,
    recognizer: &DateRecognizer,
    config: &MediaConfig,
) -> Result<BatchSummary> {
    let files = discover(folder, config)?;
    info!("Found {} media file(s) in {}", files.len(), folder.display());

    let mut summary = BatchSummary::default();
    for (i, file) in files.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, files.len(), file.file_name());
        match process_file(file, recognizer, config) {
            Ok(FileOutcome::Dated { date, target }) => {
                summary.processed += 1;
                info!(
                    "{} -> {} ({})",
                    file.file_name(),
                    target.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
                    date
                );
            }
            Ok(FileOutcome::NoResult) => {
                summary.skipped += 1;
                warn!("No date recognized for {}, skipping", file.file_name());
            }
            Err(e) => {
                summary.failed += 1;
                error!("Failed to process {}: {:#}", file.file_name(), e);
            }
        }
    }

    info!(
        "Done: {} processed, {} skipped, {} failed",
        summary.processed, summary.skipped, summary.failed
    );
    Ok(summary)
}
