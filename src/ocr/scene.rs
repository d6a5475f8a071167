//! General-purpose text recognition model restricted to an allowlist.
//!
//! Runs a PaddleOCR-style recognition network over the whole crop. The crop
//! already isolates the watermark, so no detection stage is needed.

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::ctc::{allowlist_mask, greedy_decode, normalize, CtcModel};
use super::engine::OcrEngine;
use super::geometry::CroppedRegion;

/// Model input height
pub const INPUT_HEIGHT: u32 = 48;

/// Widest input fed to the model
pub const MAX_WIDTH: u32 = 320;

pub struct SceneTextEngine {
    name: String,
    model: CtcModel,
    allowed: Vec<bool>,
}

impl SceneTextEngine {
    pub fn new(name: &str, model_path: &Path, dict_path: &Path, allowlist: &str) -> Result<Self> {
        let labels = load_dictionary(dict_path)?;
        let allowed = allowlist_mask(&labels, allowlist);
        let model = CtcModel::load(model_path, labels)?;

        Ok(Self {
            name: name.to_string(),
            model,
            allowed,
        })
    }
}

impl OcrEngine for SceneTextEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, region: &CroppedRegion) -> Result<String> {
        let input = preprocess(&region.image);
        let (scores, classes) = self.model.infer(input)?;
        Ok(greedy_decode(&scores, classes, self.model.labels(), Some(&self.allowed)))
    }
}

/// Reads a one-character-per-line dictionary. Index 0 is the CTC blank and a
/// trailing space class is appended when missing.
fn load_dictionary(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("OCR dictionary not found: {}", path.display()))?;

    let mut labels = vec![String::new()];
    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read dictionary line")?;
        if let Some(ch) = line.chars().next() {
            labels.push(ch.to_string());
        }
    }

    if !labels.iter().any(|l| l == " ") {
        labels.push(" ".to_string());
    }

    Ok(labels)
}

/// Resizes to the model height keeping aspect ratio and builds an NCHW RGB
/// tensor.
fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let scale = INPUT_HEIGHT as f32 / h.max(1) as f32;
    let width = ((w as f32 * scale).round() as u32).clamp(4, MAX_WIDTH);

    let rgb = image
        .resize_exact(width, INPUT_HEIGHT, image::imageops::FilterType::Lanczos3)
        .to_rgb8();

    let mut tensor = Array4::zeros((1, 3, INPUT_HEIGHT as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = normalize(pixel[c]);
        }
    }

    tensor
}
