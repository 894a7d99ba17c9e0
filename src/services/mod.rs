// sme-classifier Core Services

pub mod config_store;
pub mod corpus;
pub mod detection;
pub mod identifier;

pub use config_store::*;
pub use corpus::{parse_labeled_line, CorpusError, CorpusReader, MalformedLinePolicy, LABEL_WIDTH};
pub use identifier::{language_identifier, load_model, IdentifierError, LanguageModel, ModelBackend, WhatlangModel};

// Re-export detection module items
pub use detection::{
    Evaluation,
    EvaluationError,
    Evaluator,
    ThresholdClassifier,
    ThresholdError,
    DEFAULT_LOWER_THRESHOLD,
    DEFAULT_UPPER_THRESHOLD,
};
