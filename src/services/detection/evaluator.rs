// Accuracy Evaluator
// Scores a labeled corpus against the threshold classifier in a single pass.

use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

use crate::models::{EvaluationReport, EvaluationTally, LabelSet, LabeledLine};
use crate::services::corpus::{CorpusError, CorpusReader, MalformedLinePolicy};
use crate::services::identifier::{IdentifierError, LanguageModel};

use super::thresholds::ThresholdClassifier;

const PROGRESS_EVERY: u64 = 10_000;

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    #[error("Corpus has no scorable lines, accuracy is undefined")]
    EmptyCorpus,
}

/// Result of one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub tally: EvaluationTally,
    pub skipped_lines: u64,
}

impl Evaluation {
    pub fn accuracy(&self) -> Result<f64, EvaluationError> {
        self.tally.accuracy().ok_or(EvaluationError::EmptyCorpus)
    }

    pub fn strict_accuracy(&self) -> Result<f64, EvaluationError> {
        self.tally.strict_accuracy().ok_or(EvaluationError::EmptyCorpus)
    }

    pub fn into_report(
        self,
        corpus: &str,
        backend: &str,
        classifier: &ThresholdClassifier,
    ) -> Result<EvaluationReport, EvaluationError> {
        Ok(EvaluationReport {
            corpus: corpus.to_string(),
            backend: backend.to_string(),
            accuracy: self.accuracy()?,
            strict_accuracy: self.strict_accuracy()?,
            skipped_lines: self.skipped_lines,
            lower_threshold: classifier.lower(),
            upper_threshold: classifier.upper(),
            tally: self.tally,
            generated_at: chrono::Local::now().to_rfc3339(),
        })
    }
}

pub struct Evaluator<'a, M: ?Sized> {
    model: &'a M,
    classifier: ThresholdClassifier,
    labels: LabelSet,
}

impl<'a, M: LanguageModel + ?Sized> Evaluator<'a, M> {
    pub fn new(model: &'a M, classifier: ThresholdClassifier, labels: LabelSet) -> Self {
        Self {
            model,
            classifier,
            labels,
        }
    }

    fn score(&self, tally: &mut EvaluationTally, line: &LabeledLine) -> Result<(), EvaluationError> {
        let outcome = self.classifier.classify(self.model, &line.text)?;
        let hit = tally.record(&line.expected_label, &outcome, &self.labels);
        tracing::trace!(
            line_no = line.line_no,
            expected = %line.expected_label,
            outcome = outcome.label(&self.labels),
            hit,
            "scored"
        );
        if tally.total % PROGRESS_EVERY == 0 {
            tracing::debug!(total = tally.total, hits = tally.hits, "evaluation.progress");
        }
        Ok(())
    }

    /// Score already-parsed lines.
    pub fn evaluate_lines<I>(&self, lines: I) -> Result<Evaluation, EvaluationError>
    where
        I: IntoIterator<Item = LabeledLine>,
    {
        let mut tally = EvaluationTally::default();
        for line in lines {
            self.score(&mut tally, &line)?;
        }
        Ok(Evaluation {
            tally,
            skipped_lines: 0,
        })
    }

    pub fn evaluate_reader<R: BufRead>(
        &self,
        mut reader: CorpusReader<R>,
    ) -> Result<Evaluation, EvaluationError> {
        let mut tally = EvaluationTally::default();
        for line in reader.by_ref() {
            self.score(&mut tally, &line?)?;
        }

        let evaluation = Evaluation {
            tally,
            skipped_lines: reader.skipped(),
        };
        tracing::info!(
            total = evaluation.tally.total,
            hits = evaluation.tally.hits,
            unclassified = evaluation.tally.unclassified,
            skipped = evaluation.skipped_lines,
            "evaluation.finished"
        );
        Ok(evaluation)
    }

    pub fn evaluate_file(
        &self,
        path: &Path,
        policy: MalformedLinePolicy,
    ) -> Result<Evaluation, EvaluationError> {
        let reader = CorpusReader::open(path, policy)?;
        self.evaluate_reader(reader)
    }
}
