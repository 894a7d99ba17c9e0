// Detection Module
// Sami detection logic organized into specialized submodules:
// - thresholds: Confidence-threshold decision rule on top of the identifier
// - evaluator: Scores a labeled corpus and computes accuracy

pub mod thresholds;
pub mod evaluator;

pub use thresholds::{
    ThresholdClassifier,
    ThresholdError,
    DEFAULT_LOWER_THRESHOLD,
    DEFAULT_UPPER_THRESHOLD,
};
pub use evaluator::{Evaluation, EvaluationError, Evaluator};
