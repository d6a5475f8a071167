pub mod canonical;
pub mod classifier;
pub mod consensus;
pub mod ctc;
pub mod date;
pub mod engine;
pub mod geometry;
pub mod scene;
pub mod setup;
pub mod tesseract;

pub use canonical::canonicalize;
pub use consensus::{resolve, Agreement, Resolution};
pub use date::{validate_date, DateWindow};
pub use engine::{build_engines, EngineReport, EngineVerdict, OcrEngine};
pub use geometry::{crop_watermark, scale_crop_box, CroppedRegion};

use anyhow::Result;
use chrono::NaiveDate;
use image::DynamicImage;
use tracing::info;

use crate::config::{AppConfig, WatermarkConfig};
use engine::{collect_candidates, recognize_region};

/// Everything learned about one image.
pub struct Recognition {
    pub region: CroppedRegion,
    pub reports: Vec<EngineReport>,
    pub resolution: Option<Resolution>,
}

impl Recognition {
    pub fn date(&self) -> Option<NaiveDate> {
        self.resolution.as_ref().map(|r| r.date)
    }

    /// `YYYY-MM-DD`, or `None` when no engine produced a plausible date.
    pub fn date_string(&self) -> Option<String> {
        self.date().map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// Long-lived engine line-up plus the watermark calibration.
///
/// Engines are built once and reused for every file.
pub struct DateRecognizer {
    engines: Vec<Box<dyn OcrEngine>>,
    watermark: WatermarkConfig,
}

impl DateRecognizer {
    pub fn new(engines: Vec<Box<dyn OcrEngine>>, watermark: WatermarkConfig) -> Self {
        Self { engines, watermark }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let engines = build_engines(&config.engines)?;
        Ok(Self::new(engines, config.watermark.clone()))
    }

    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Crops the watermark and runs every engine on it. The date window is
    /// fixed once here, before any engine runs.
    pub fn recognize(&self, img: &DynamicImage) -> Result<Recognition> {
        let region = crop_watermark(img, &self.watermark)?;
        let window = DateWindow::ending_today(self.watermark.window_start);
        Ok(self.recognize_region(region, &window))
    }

    pub fn recognize_region(&self, region: CroppedRegion, window: &DateWindow) -> Recognition {
        let reports = recognize_region(&self.engines, &region, window);
        let candidates = collect_candidates(&reports);
        let resolution = resolve(&candidates);

        if resolution.is_none() {
            info!("No engine produced a plausible date");
        }

        Recognition {
            region,
            reports,
            resolution,
        }
    }

    /// The single date for an image, or `None` for "no confident date".
    pub fn recognize_date(&self, img: &DynamicImage) -> Result<Option<NaiveDate>> {
        Ok(self.recognize(img)?.date())
    }
}
