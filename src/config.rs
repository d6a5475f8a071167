//! Configuration types.
//!
//! Loads settings from config.json at startup. Provides the watermark
//! calibration, the OCR engine line-up and the media folder layout.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::paths;

/// Characters a constrained-vocabulary engine may emit.
pub const DIGIT_WHITELIST: &str = "-0123456789";

/// A crop rectangle in pixels, defined against `reference_width`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Where the watermark sits and when the device went into service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Image width the crop box was measured on
    #[serde(default = "default_reference_width")]
    pub reference_width: u32,
    /// Crop box around the date text at `reference_width`
    #[serde(default = "default_crop_box")]
    pub crop_box: CropBox,
    /// Dates on or before this day are rejected as misreads
    #[serde(default = "default_window_start")]
    pub window_start: NaiveDate,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            reference_width: default_reference_width(),
            crop_box: default_crop_box(),
            window_start: default_window_start(),
        }
    }
}

fn default_reference_width() -> u32 {
    2560
}

fn default_crop_box() -> CropBox {
    // Measured on 2560x1440 frames
    CropBox::new(16, 38, 349, 89)
}

fn default_window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 9, 17).unwrap_or_default()
}

/// One OCR engine in the recognition line-up.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    /// CTC text-recognition model restricted to an allowlist
    SceneText {
        name: String,
        model: PathBuf,
        dictionary: PathBuf,
        #[serde(default = "default_whitelist")]
        allowlist: String,
    },
    /// External tesseract executable
    Tesseract {
        name: String,
        /// Explicit executable; searched for when absent
        #[serde(default)]
        executable: Option<PathBuf>,
        /// Explicit tessdata dir; searched for when absent
        #[serde(default)]
        tessdata: Option<PathBuf>,
        #[serde(default = "default_language")]
        language: String,
        #[serde(default = "default_whitelist")]
        whitelist: String,
        /// Page segmentation mode; 7 treats the crop as a single text line
        #[serde(default = "default_psm")]
        psm: u8,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Captcha-style digit classifier model
    Classifier {
        name: String,
        model: PathBuf,
        charset: PathBuf,
    },
}

impl EngineConfig {
    pub fn name(&self) -> &str {
        match self {
            EngineConfig::SceneText { name, .. }
            | EngineConfig::Tesseract { name, .. }
            | EngineConfig::Classifier { name, .. } => name,
        }
    }
}

fn default_whitelist() -> String {
    DIGIT_WHITELIST.to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_psm() -> u8 {
    7
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_engines() -> Vec<EngineConfig> {
    let models = paths::get_models_dir();
    vec![
        EngineConfig::SceneText {
            name: "scene-text".to_string(),
            model: models.join("scene_text").join("rec_model.onnx"),
            dictionary: models.join("scene_text").join("dict.txt"),
            allowlist: default_whitelist(),
        },
        EngineConfig::Tesseract {
            name: "tesseract".to_string(),
            executable: None,
            tessdata: None,
            language: default_language(),
            whitelist: default_whitelist(),
            psm: default_psm(),
            timeout_secs: default_timeout_secs(),
        },
        EngineConfig::Classifier {
            name: "classifier".to_string(),
            model: models.join("classifier").join("common_old.onnx"),
            charset: models.join("classifier").join("charset_old.json"),
        },
        EngineConfig::Classifier {
            name: "classifier-beta".to_string(),
            model: models.join("classifier").join("common.onnx"),
            charset: models.join("classifier").join("charset.json"),
        },
    ]
}

/// Media folder layout and naming.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Folder holding the photos and videos to fix up
    #[serde(default = "default_media_folder")]
    pub media_folder: PathBuf,
    /// Folder receiving crops and extracted video frames
    #[serde(default = "default_crops_folder")]
    pub crops_folder: PathBuf,
    /// Keep the watermark crops on disk for inspection
    #[serde(default = "default_keep_crops")]
    pub keep_crops: bool,
    #[serde(default = "default_picture_prefix")]
    pub picture_prefix: String,
    #[serde(default = "default_video_prefix")]
    pub video_prefix: String,
    /// ffmpeg used to pull the first frame out of videos
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            media_folder: default_media_folder(),
            crops_folder: default_crops_folder(),
            keep_crops: default_keep_crops(),
            picture_prefix: default_picture_prefix(),
            video_prefix: default_video_prefix(),
            ffmpeg: default_ffmpeg(),
        }
    }
}

fn default_media_folder() -> PathBuf {
    PathBuf::from("./media")
}

fn default_crops_folder() -> PathBuf {
    PathBuf::from("./crops")
}

fn default_keep_crops() -> bool {
    true
}

fn default_picture_prefix() -> String {
    "IMG_HM_".to_string()
}

fn default_video_prefix() -> String {
    "V_HM_".to_string()
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub watermark: WatermarkConfig,
    /// Engines in invocation order
    #[serde(default = "default_engines")]
    pub engines: Vec<EngineConfig>,
    #[serde(default)]
    pub media: MediaConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watermark: WatermarkConfig::default(),
            engines: default_engines(),
            media: MediaConfig::default(),
        }
    }
}

/// Loads configuration from `path` (or config.json next to the executable)
/// and falls back to defaults when the file is missing or broken.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(paths::get_default_config_path);

    info!("Looking for config at: {}", config_path.display());

    if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("Config loaded from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", config_path.display(), e);
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}. Using defaults.", config_path.display(), e);
            }
        }
    } else {
        info!("{} not found. Using default config.", config_path.display());
    }

    AppConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_reference_calibration() {
        let config = AppConfig::default();
        assert_eq!(config.watermark.reference_width, 2560);
        assert_eq!(config.watermark.crop_box, CropBox::new(16, 38, 349, 89));
        assert_eq!(
            config.watermark.window_start,
            NaiveDate::from_ymd_opt(2023, 9, 17).unwrap()
        );
    }

    #[test]
    fn test_default_engine_order() {
        let config = AppConfig::default();
        let names: Vec<&str> = config.engines.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["scene-text", "tesseract", "classifier", "classifier-beta"]);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "watermark": { "reference_width": 1920 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.watermark.reference_width, 1920);
        assert_eq!(config.watermark.crop_box.right, 349);
        assert_eq!(config.engines.len(), 4);
        assert_eq!(config.media.picture_prefix, "IMG_HM_");
    }

    #[test]
    fn test_engine_config_tagged_by_kind() {
        let json = r#"{ "engines": [ { "kind": "tesseract", "name": "tess" } ] }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        match &config.engines[0] {
            EngineConfig::Tesseract { name, psm, whitelist, timeout_secs, .. } => {
                assert_eq!(name, "tess");
                assert_eq!(*psm, 7);
                assert_eq!(whitelist, DIGIT_WHITELIST);
                assert_eq!(*timeout_secs, 30);
            }
            other => panic!("unexpected engine: {:?}", other),
        }
    }

    #[test]
    fn test_load_config_falls_back_on_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_config(Some(&path));
        assert_eq!(config.watermark.reference_width, 2560);
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "media": { "media_folder": "/tmp/dashcam", "keep_crops": false } }"#)
            .unwrap();

        let config = load_config(Some(&path));
        assert_eq!(config.media.media_folder, PathBuf::from("/tmp/dashcam"));
        assert!(!config.media.keep_crops);
        assert_eq!(config.media.video_prefix, "V_HM_");
    }
}
