//! ONNX Runtime session wrapper and CTC greedy decoding shared by the
//! model-based engines.

use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// A loaded CTC recognition model plus its label table.
///
/// Label 0 is the CTC blank.
pub struct CtcModel {
    session: Mutex<Session>,
    input_name: String,
    labels: Vec<String>,
}

impl std::fmt::Debug for CtcModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtcModel")
            .field("labels", &self.labels.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl CtcModel {
    /// Loads the model on CPU.
    pub fn load(model_path: &Path, labels: Vec<String>) -> Result<Self> {
        if !model_path.exists() {
            bail!("OCR model not found: {}", model_path.display());
        }
        if labels.len() < 2 {
            bail!("Label table for {} is empty", model_path.display());
        }

        info!("Loading OCR model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(1)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load OCR model from {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| anyhow!("Model {} declares no inputs", model_path.display()))?;

        debug!("Model input: {}, {} labels", input_name, labels.len());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            labels,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Runs the model and returns per-timestep class scores, flattened,
    /// together with the class count.
    pub fn infer(&self, input: Array4<f32>) -> Result<(Vec<f32>, usize)> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("OCR model session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Recognition inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let classes = match output.shape().last() {
            Some(&c) if c > 0 => c,
            _ => bail!("Unexpected output shape: {:?}", output.shape()),
        };

        Ok((output.iter().copied().collect(), classes))
    }
}

/// Greedy CTC decode over row-major `[.., T, C]` scores with batch size 1.
///
/// Repeats collapse unless a blank separates them; blanks are dropped. When
/// `allowed` is given, classes it marks `false` are never chosen, so the
/// output only contains allowed labels.
pub fn greedy_decode(
    scores: &[f32],
    classes: usize,
    labels: &[String],
    allowed: Option<&[bool]>,
) -> String {
    let mut text = String::new();
    let mut prev: usize = 0;

    if classes == 0 {
        return text;
    }

    for step in scores.chunks_exact(classes) {
        let mut best_score = f32::NEG_INFINITY;
        let mut best = 0usize;

        for (class, &score) in step.iter().enumerate() {
            let permitted = class == 0
                || allowed.map_or(class < labels.len(), |mask| {
                    mask.get(class).copied().unwrap_or(false)
                });
            if permitted && score > best_score {
                best_score = score;
                best = class;
            }
        }

        if best != 0 && best != prev {
            if let Some(label) = labels.get(best) {
                text.push_str(label);
            }
        }
        prev = best;
    }

    text
}

/// Marks which labels consist only of characters in `allowlist`.
pub fn allowlist_mask(labels: &[String], allowlist: &str) -> Vec<bool> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            i != 0 && !label.is_empty() && label.chars().all(|c| allowlist.contains(c))
        })
        .collect()
}

/// Normalises a byte channel to `[-1, 1]`.
pub fn normalize(p: u8) -> f32 {
    (p as f32 / 255.0 - 0.5) / 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(chars: &str) -> Vec<String> {
        std::iter::once(String::new())
            .chain(chars.chars().map(|c| c.to_string()))
            .collect()
    }

    /// One-hot score rows for the given class indices.
    fn one_hot(indices: &[usize], classes: usize) -> Vec<f32> {
        indices
            .iter()
            .flat_map(|&i| (0..classes).map(move |c| if c == i { 1.0 } else { 0.0 }))
            .collect()
    }

    #[test]
    fn test_collapses_repeats_and_blanks() {
        let labels = labels("012");
        // "1 1 _ 1 2 2" -> "112"
        let scores = one_hot(&[2, 2, 0, 2, 3, 3], labels.len());
        assert_eq!(greedy_decode(&scores, labels.len(), &labels, None), "112");
    }

    #[test]
    fn test_all_blank_is_empty() {
        let labels = labels("0123");
        let scores = one_hot(&[0, 0, 0], labels.len());
        assert_eq!(greedy_decode(&scores, labels.len(), &labels, None), "");
    }

    #[test]
    fn test_mask_forces_next_best_allowed() {
        let labels = labels("2z");
        let classes = labels.len();
        // 'z' scores highest, '2' second
        let scores = vec![0.1, 0.3, 0.6];
        let mask = allowlist_mask(&labels, "-0123456789");
        assert_eq!(mask, vec![false, true, false]);

        assert_eq!(greedy_decode(&scores, classes, &labels, None), "z");
        assert_eq!(greedy_decode(&scores, classes, &labels, Some(&mask)), "2");
    }

    #[test]
    fn test_ignores_classes_beyond_labels() {
        let labels = labels("01");
        // class 3 has no label
        let scores = vec![0.0, 0.2, 0.1, 0.9];
        assert_eq!(greedy_decode(&scores, 4, &labels, None), "0");
    }

    #[test]
    fn test_normalize_range() {
        assert_eq!(normalize(0), -1.0);
        assert_eq!(normalize(255), 1.0);
    }

    #[test]
    fn test_load_missing_model() {
        let err = CtcModel::load(Path::new("/nonexistent/model.onnx"), labels("0123")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
