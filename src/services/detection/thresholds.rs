// Threshold Classifier
// Confidence thresholds decide between target language, model guess, or no decision.

use thiserror::Error;

use crate::models::{ClassificationResult, Prediction};
use crate::services::identifier::{language_identifier, IdentifierError, LanguageModel};

pub const DEFAULT_LOWER_THRESHOLD: f64 = 0.4;
pub const DEFAULT_UPPER_THRESHOLD: f64 = 0.6;

#[derive(Error, Debug, PartialEq)]
pub enum ThresholdError {
    #[error("Invalid thresholds: lower={lower}, upper={upper} (need 0 <= lower <= upper <= 1)")]
    InvalidThresholds { lower: f64, upper: f64 },
}

/// Below `lower` the text is taken to be the target language, above `upper`
/// the model's own guess is trusted. Both bounds are exclusive, so a
/// confidence equal to either threshold stays unclassified.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ThresholdClassifier {
    lower: f64,
    upper: f64,
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        Self {
            lower: DEFAULT_LOWER_THRESHOLD,
            upper: DEFAULT_UPPER_THRESHOLD,
        }
    }
}

impl ThresholdClassifier {
    pub fn new(lower: f64, upper: f64) -> Result<Self, ThresholdError> {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(lower) || !in_range(upper) || lower > upper {
            return Err(ThresholdError::InvalidThresholds { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn decide(&self, prediction: &Prediction) -> ClassificationResult {
        if prediction.confidence < self.lower {
            ClassificationResult::TargetLanguage
        } else if prediction.confidence > self.upper {
            ClassificationResult::OtherLanguage(prediction.label.clone())
        } else {
            ClassificationResult::Unclassified
        }
    }

    /// Identify `text` with `model` and apply the decision rule.
    pub fn classify<M: LanguageModel + ?Sized>(
        &self,
        model: &M,
        text: &str,
    ) -> Result<ClassificationResult, IdentifierError> {
        let prediction = language_identifier(model, text)?;
        let outcome = self.decide(&prediction);
        tracing::trace!(
            label = %prediction.label,
            confidence = prediction.confidence,
            outcome = ?outcome,
            "classify"
        );
        Ok(outcome)
    }
}
