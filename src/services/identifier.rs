// Language Identifier Service
// Black-box top-k language prediction behind a single trait

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Prediction;

#[derive(Error, Debug)]
pub enum IdentifierError {
    #[error("Failed to load model from {}: {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("Prediction failed: {0}")]
    Prediction(String),
    #[error("Backend '{0}' is not compiled into this build")]
    BackendUnavailable(ModelBackend),
    #[error("Unknown backend '{0}' (expected whatlang or fasttext)")]
    UnknownBackend(String),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    #[default]
    Whatlang,
    Fasttext,
}

impl FromStr for ModelBackend {
    type Err = IdentifierError;

    fn from_str(val: &str) -> Result<Self, Self::Err> {
        match val.trim().to_lowercase().as_str() {
            "whatlang" => Ok(Self::Whatlang),
            "fasttext" => Ok(Self::Fasttext),
            _ => Err(IdentifierError::UnknownBackend(val.to_string())),
        }
    }
}

impl ModelBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whatlang => "whatlang",
            Self::Fasttext => "fasttext",
        }
    }
}

impl fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pretrained language-identification model.
pub trait LanguageModel {
    /// Up to `k` predictions, sorted by confidence descending.
    fn predict(&self, text: &str, k: usize) -> Result<Vec<Prediction>, IdentifierError>;
}

impl<M: LanguageModel + ?Sized> LanguageModel for Box<M> {
    fn predict(&self, text: &str, k: usize) -> Result<Vec<Prediction>, IdentifierError> {
        (**self).predict(text, k)
    }
}

/// Identify the language of `text` (top-1 only).
pub fn language_identifier<M: LanguageModel + ?Sized>(
    model: &M,
    text: &str,
) -> Result<Prediction, IdentifierError> {
    let predictions = model.predict(text, 1)?;
    Ok(predictions.into_iter().next().unwrap_or_else(Prediction::unknown))
}

/// Models predict per line, so embedded line breaks are flattened first.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

// ============ whatlang ============

/// Trigram-based detector; needs no model file.
pub struct WhatlangModel {
    detector: whatlang::Detector,
}

impl Default for WhatlangModel {
    fn default() -> Self {
        Self::new()
    }
}

impl WhatlangModel {
    pub fn new() -> Self {
        tracing::info!("Initializing whatlang language detector");
        Self {
            detector: whatlang::Detector::new(),
        }
    }
}

impl LanguageModel for WhatlangModel {
    fn predict(&self, text: &str, k: usize) -> Result<Vec<Prediction>, IdentifierError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let info = self.detector.detect(&single_line(text));
        Ok(info
            .map(|info| Prediction::new(format!("__label__{}", info.lang().code()), info.confidence()))
            .into_iter()
            .collect())
    }
}

// ============ fastText ============

#[cfg(feature = "fasttext")]
pub struct FastTextModel {
    model: fasttext::FastText,
}

#[cfg(feature = "fasttext")]
impl FastTextModel {
    pub fn load(path: &Path) -> Result<Self, IdentifierError> {
        tracing::info!(path = %path.display(), "Loading fastText language identification model");
        let path_str = path.to_str().ok_or_else(|| IdentifierError::ModelLoad {
            path: path.to_path_buf(),
            reason: "path is not valid UTF-8".to_string(),
        })?;

        let mut model = fasttext::FastText::new();
        model
            .load_model(path_str)
            .map_err(|reason| IdentifierError::ModelLoad {
                path: path.to_path_buf(),
                reason,
            })?;

        Ok(Self { model })
    }
}

#[cfg(feature = "fasttext")]
impl LanguageModel for FastTextModel {
    fn predict(&self, text: &str, k: usize) -> Result<Vec<Prediction>, IdentifierError> {
        let k = i32::try_from(k).unwrap_or(i32::MAX);
        let predictions = self
            .model
            .predict(&single_line(text), k, 0.0)
            .map_err(IdentifierError::Prediction)?;

        let mut out: Vec<Prediction> = predictions
            .into_iter()
            .map(|p| Prediction::new(p.label, f64::from(p.prob)))
            .collect();
        out.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(out)
    }
}

/// whatlang has no model file and no `sme` label, so results are not
/// comparable with a fastText run. Returns whether a warning was logged.
fn warn_ignored_model_path(path: &Path) -> bool {
    if path.exists() {
        tracing::warn!(
            path = %path.display(),
            "Model file present but the whatlang backend ignores it; use --backend fasttext to evaluate with it"
        );
        true
    } else {
        tracing::debug!(path = %path.display(), "whatlang backend ignores the model path");
        false
    }
}

/// Load the configured backend.
pub fn load_model(
    backend: ModelBackend,
    path: &Path,
) -> Result<Box<dyn LanguageModel>, IdentifierError> {
    match backend {
        ModelBackend::Whatlang => {
            warn_ignored_model_path(path);
            Ok(Box::new(WhatlangModel::new()))
        }
        #[cfg(feature = "fasttext")]
        ModelBackend::Fasttext => Ok(Box::new(FastTextModel::load(path)?)),
        #[cfg(not(feature = "fasttext"))]
        ModelBackend::Fasttext => Err(IdentifierError::BackendUnavailable(backend)),
    }
}
