//! OCR engine abstraction and the multi-engine recognizer.
//!
//! Every engine sees the same watermark crop. Each one is isolated: an
//! engine that errors or reads garbage simply contributes no candidate.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::canonical::canonicalize;
use super::classifier::ClassifierEngine;
use super::date::{check_date, DateCheck, DateWindow};
use super::geometry::CroppedRegion;
use super::scene::SceneTextEngine;
use super::tesseract::TesseractEngine;
use crate::config::EngineConfig;

/// A recognizer that turns the watermark crop into raw text.
///
/// Engines are built once at startup and only read afterwards.
pub trait OcrEngine {
    fn name(&self) -> &str;

    fn recognize(&self, region: &CroppedRegion) -> Result<String>;
}

/// What a single engine contributed for one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineVerdict {
    Accepted(NaiveDate),
    /// The engine itself errored
    EngineFailed(String),
    /// Text did not reduce to a calendar date
    NoCandidate,
    /// A real date, but implausible for this device
    OutOfWindow(NaiveDate),
}

#[derive(Clone, Debug)]
pub struct EngineReport {
    pub engine: String,
    pub raw: Option<String>,
    pub canonical: Option<String>,
    pub verdict: EngineVerdict,
}

impl EngineReport {
    pub fn candidate(&self) -> Option<NaiveDate> {
        match self.verdict {
            EngineVerdict::Accepted(date) => Some(date),
            _ => None,
        }
    }
}

/// Runs one engine and judges its text. Never fails: errors become a verdict.
pub fn run_engine(
    engine: &dyn OcrEngine,
    region: &CroppedRegion,
    window: &DateWindow,
) -> EngineReport {
    let name = engine.name().to_string();

    let raw = match engine.recognize(region) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("{} failed: {:#}", name, e);
            return EngineReport {
                engine: name,
                raw: None,
                canonical: None,
                verdict: EngineVerdict::EngineFailed(format!("{:#}", e)),
            };
        }
    };

    let canonical = canonicalize(&raw);
    let verdict = match check_date(&canonical, window) {
        DateCheck::Valid(date) => EngineVerdict::Accepted(date),
        DateCheck::Unparseable => EngineVerdict::NoCandidate,
        DateCheck::OutOfWindow(date) => {
            warn!("{} implausible date ignored: {}", name, date);
            EngineVerdict::OutOfWindow(date)
        }
    };

    debug!("{}: raw={:?} canonical={:?} -> {:?}", name, raw.trim(), canonical, verdict);

    EngineReport {
        engine: name,
        raw: Some(raw),
        canonical: Some(canonical),
        verdict,
    }
}

/// Runs every engine in order and returns their reports.
pub fn recognize_region(
    engines: &[Box<dyn OcrEngine>],
    region: &CroppedRegion,
    window: &DateWindow,
) -> Vec<EngineReport> {
    engines
        .iter()
        .map(|engine| run_engine(engine.as_ref(), region, window))
        .collect()
}

/// Candidate dates in engine order.
pub fn collect_candidates(reports: &[EngineReport]) -> Vec<NaiveDate> {
    reports.iter().filter_map(EngineReport::candidate).collect()
}

/// Builds one engine from its configuration.
pub fn build_engine(config: &EngineConfig) -> Result<Box<dyn OcrEngine>> {
    let engine: Box<dyn OcrEngine> = match config {
        EngineConfig::SceneText {
            name,
            model,
            dictionary,
            allowlist,
        } => Box::new(SceneTextEngine::new(name, model, dictionary, allowlist)?),
        EngineConfig::Tesseract {
            name,
            executable,
            tessdata,
            language,
            whitelist,
            psm,
            timeout_secs,
        } => Box::new(TesseractEngine::new(
            name,
            executable.as_deref(),
            tessdata.as_deref(),
            language,
            whitelist,
            *psm,
            *timeout_secs,
        )?),
        EngineConfig::Classifier {
            name,
            model,
            charset,
        } => Box::new(ClassifierEngine::new(name, model, charset)?),
    };
    Ok(engine)
}

/// Builds the engine line-up, leaving out engines that fail to load.
pub fn build_engines(configs: &[EngineConfig]) -> Result<Vec<Box<dyn OcrEngine>>> {
    let mut engines = Vec::with_capacity(configs.len());

    for config in configs {
        match build_engine(config) {
            Ok(engine) => {
                info!("OCR engine ready: {}", config.name());
                engines.push(engine);
            }
            Err(e) => {
                warn!("OCR engine {} unavailable: {:#}", config.name(), e);
            }
        }
    }

    if engines.is_empty() {
        bail!("No OCR engine could be loaded. Run `dashcam-stamp setup` to check prerequisites.");
    }

    Ok(engines)
}
