// sme-classifier Data Models
// Plain values passed between identifier, classifier and evaluator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::services::corpus::LABEL_WIDTH;

pub const TARGET_LABEL: &str = "__label__sme";
pub const NON_TARGET_LABEL: &str = "__label__nos";
pub const UNCLASSIFIED_LABEL: &str = "__label__unclassified";
pub const UNKNOWN_LABEL: &str = "__label__unknown";

// ============ Identifier Output ============

/// Top-k entry returned by a language-identification model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Probability-like score in [0, 1].
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Stand-in for a model that produced no guess at all.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_LABEL, 0.0)
    }
}

// ============ Classification ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "camelCase")]
pub enum ClassificationResult {
    TargetLanguage,
    OtherLanguage(String),
    Unclassified,
}

impl ClassificationResult {
    /// Render the outcome the way corpus files spell labels.
    pub fn label<'a>(&'a self, labels: &'a LabelSet) -> &'a str {
        match self {
            Self::TargetLanguage => &labels.target,
            Self::OtherLanguage(label) => label,
            Self::Unclassified => &labels.unclassified,
        }
    }
}

/// Label tokens the evaluator scores against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSet {
    pub target: String,
    pub non_target: String,
    pub unclassified: String,
}

impl LabelSet {
    /// Map a fixed-width corpus token back to the full label it was cut from,
    /// e.g. `__label__unc` to `__label__unclassified`. Other tokens pass through.
    pub fn canonical<'a>(&'a self, token: &'a str) -> &'a str {
        [&self.target, &self.non_target, &self.unclassified]
            .into_iter()
            .find(|label| {
                label.as_str() == token
                    || (token.chars().count() == LABEL_WIDTH
                        && label.chars().count() > LABEL_WIDTH
                        && label.chars().take(LABEL_WIDTH).eq(token.chars()))
            })
            .map(String::as_str)
            .unwrap_or(token)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            target: TARGET_LABEL.to_string(),
            non_target: NON_TARGET_LABEL.to_string(),
            unclassified: UNCLASSIFIED_LABEL.to_string(),
        }
    }
}

// ============ Corpus ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledLine {
    /// 1-based position in the corpus file.
    pub line_no: usize,
    pub expected_label: String,
    pub text: String,
}

// ============ Evaluation ============

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelBreakdown {
    pub total: u64,
    pub target: u64,
    pub other: u64,
    pub unclassified: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationTally {
    pub hits: u64,
    pub misses: u64,
    pub unclassified: u64,
    pub total: u64,
    /// Lines whose rendered outcome label equals the expected label exactly.
    pub strict_hits: u64,
    pub by_label: BTreeMap<String, LabelBreakdown>,
}

impl EvaluationTally {
    /// Score one line. Returns whether it counted as a hit.
    ///
    /// Any non-target outcome is a hit when the expected label is the
    /// non-target label, whatever language the model actually named.
    pub fn record(
        &mut self,
        expected_label: &str,
        outcome: &ClassificationResult,
        labels: &LabelSet,
    ) -> bool {
        let expected_label = labels.canonical(expected_label);
        let entry = self.by_label.entry(expected_label.to_string()).or_default();
        entry.total += 1;

        let hit = match outcome {
            ClassificationResult::TargetLanguage => {
                entry.target += 1;
                Some(expected_label == labels.target)
            }
            ClassificationResult::Unclassified => {
                entry.unclassified += 1;
                None
            }
            ClassificationResult::OtherLanguage(_) => {
                entry.other += 1;
                Some(expected_label == labels.non_target)
            }
        };

        match hit {
            Some(true) => self.hits += 1,
            Some(false) => self.misses += 1,
            None => self.unclassified += 1,
        }
        if outcome.label(labels) == expected_label {
            self.strict_hits += 1;
        }
        self.total += 1;

        hit.unwrap_or(false)
    }

    /// hits / total, or `None` for an empty tally.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.hits as f64 / self.total as f64)
    }

    pub fn strict_accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.strict_hits as f64 / self.total as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub corpus: String,
    pub backend: String,
    pub accuracy: f64,
    pub strict_accuracy: f64,
    pub skipped_lines: u64,
    pub lower_threshold: f64,
    pub upper_threshold: f64,
    pub tally: EvaluationTally,
    pub generated_at: String,
}
