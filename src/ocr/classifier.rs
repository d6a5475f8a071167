//! Captcha-style character classifier.
//!
//! Works from the encoded crop bytes, the same way the model's reference
//! tooling consumes files. Standard and beta models share this code and
//! differ only in the model and charset they load.

use anyhow::{Context, Result};
use image::GenericImageView;
use ndarray::Array4;
use std::fs;
use std::path::Path;

use super::ctc::{greedy_decode, normalize, CtcModel};
use super::engine::OcrEngine;
use super::geometry::CroppedRegion;

/// Model input height
pub const INPUT_HEIGHT: u32 = 64;

pub struct ClassifierEngine {
    name: String,
    model: CtcModel,
}

impl ClassifierEngine {
    pub fn new(name: &str, model_path: &Path, charset_path: &Path) -> Result<Self> {
        let charset = load_charset(charset_path)?;
        let model = CtcModel::load(model_path, charset)?;
        Ok(Self {
            name: name.to_string(),
            model,
        })
    }
}

impl OcrEngine for ClassifierEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, region: &CroppedRegion) -> Result<String> {
        let input = preprocess(&region.png)?;
        let (scores, classes) = self.model.infer(input)?;
        Ok(greedy_decode(&scores, classes, self.model.labels(), None))
    }
}

/// Charset file: a JSON array of strings whose first entry is the blank.
fn load_charset(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("OCR charset not found: {}", path.display()))?;
    let charset: Vec<String> = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid charset file: {}", path.display()))?;
    Ok(charset)
}

/// Decodes the bytes, scales to the model height (width truncated), converts
/// to grayscale and builds a `[1, 1, 64, W]` tensor.
fn preprocess(encoded: &[u8]) -> Result<Array4<f32>> {
    let image = image::load_from_memory(encoded).context("Failed to decode crop bytes")?;
    let (w, h) = image.dimensions();
    let width = ((w as f32 * (INPUT_HEIGHT as f32 / h.max(1) as f32)) as u32).max(1);

    let gray = image
        .resize_exact(width, INPUT_HEIGHT, image::imageops::FilterType::Lanczos3)
        .to_luma8();

    let mut tensor = Array4::zeros((1, 1, INPUT_HEIGHT as usize, width as usize));
    for (x, y, pixel) in gray.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = normalize(pixel[0]);
    }

    Ok(tensor)
}
