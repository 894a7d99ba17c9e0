// End-to-end evaluation over corpus files on disk

use std::fs;
use std::path::PathBuf;

use sme_classifier_lib::models::{ClassificationResult, LabelSet, Prediction};
use sme_classifier_lib::services::{
    CorpusError, EvaluationError, Evaluator, IdentifierError, LanguageModel, MalformedLinePolicy,
    ThresholdClassifier,
};
use tempfile::TempDir;

/// Deterministic stand-in: confidence is looked up by the first word of the text.
struct KeywordModel;

impl LanguageModel for KeywordModel {
    fn predict(&self, text: &str, _k: usize) -> Result<Vec<Prediction>, IdentifierError> {
        let prediction = match text.split_whitespace().next() {
            Some("Mii") | Some("Bures") => Prediction::new("__label__fi", 0.2),
            Some("Dette") => Prediction::new("__label__nno", 0.8),
            Some("Hei") => Prediction::new("__label__no", 0.95),
            _ => Prediction::new("__label__en", 0.5),
        };
        Ok(vec![prediction])
    }
}

fn write_corpus(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("shuf_sme_label.txt");
    fs::write(&path, content).unwrap();
    path
}

fn evaluator(model: &KeywordModel) -> Evaluator<'_, KeywordModel> {
    Evaluator::new(model, ThresholdClassifier::default(), LabelSet::default())
}

#[test]
fn sami_line_scores_full_accuracy() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(&dir, "__label__sme Mii lea sámi\n");
    let eval = evaluator(&KeywordModel)
        .evaluate_file(&path, MalformedLinePolicy::Skip)
        .unwrap();
    assert_eq!(eval.accuracy().unwrap(), 1.0);
    assert_eq!(eval.tally.unclassified, 0);
}

#[test]
fn norwegian_line_scores_as_non_target_hit() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(&dir, "__label__nos Dette er norsk\n");
    let eval = evaluator(&KeywordModel)
        .evaluate_file(&path, MalformedLinePolicy::Skip)
        .unwrap();
    assert_eq!(eval.accuracy().unwrap(), 1.0);
}

#[test]
fn mid_confidence_line_is_unclassified() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(&dir, "__label__sme Something else\n");
    let eval = evaluator(&KeywordModel)
        .evaluate_file(&path, MalformedLinePolicy::Skip)
        .unwrap();
    assert_eq!(eval.tally.unclassified, 1);
    assert_eq!(eval.tally.hits, 0);
    assert_eq!(eval.tally.total, 1);
    assert_eq!(eval.accuracy().unwrap(), 0.0);
}

#[test]
fn mixed_corpus_with_malformed_lines() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(
        &dir,
        "__label__sme Mii lea sámi\n\
         __label__sme Bures boahtin\n\
         oops\n\
         __label__nos Dette er norsk\n\
         __label__nos Hei på deg\n\
         __label__sme Hei\n\
         __label__nos Mii\r\n",
    );
    let eval = evaluator(&KeywordModel)
        .evaluate_file(&path, MalformedLinePolicy::Skip)
        .unwrap();

    assert_eq!(eval.skipped_lines, 1);
    assert_eq!(eval.tally.total, 6);
    assert_eq!(eval.tally.hits, 4);
    assert_eq!(eval.tally.misses, 2);
    assert_eq!(eval.tally.hits + eval.tally.misses + eval.tally.unclassified, eval.tally.total);
    let accuracy = eval.accuracy().unwrap();
    assert!((accuracy - 4.0 / 6.0).abs() < 1e-12);
}

#[test]
fn strict_policy_rejects_malformed_line() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(&dir, "__label__sme Mii lea sámi\noops\n");
    let err = evaluator(&KeywordModel)
        .evaluate_file(&path, MalformedLinePolicy::Error)
        .unwrap_err();
    assert!(matches!(
        err,
        EvaluationError::Corpus(CorpusError::MalformedLine { line_no: 2, .. })
    ));
}

#[test]
fn empty_corpus_accuracy_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(&dir, "");
    let eval = evaluator(&KeywordModel)
        .evaluate_file(&path, MalformedLinePolicy::Skip)
        .unwrap();
    assert!(matches!(eval.accuracy(), Err(EvaluationError::EmptyCorpus)));
}

#[test]
fn missing_corpus_is_fatal() {
    let dir = TempDir::new().unwrap();
    let err = evaluator(&KeywordModel)
        .evaluate_file(&dir.path().join("missing.txt"), MalformedLinePolicy::Skip)
        .unwrap_err();
    assert!(matches!(err, EvaluationError::Corpus(CorpusError::Open { .. })));
}

#[test]
fn report_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(&dir, "__label__sme Mii lea sámi\n__label__nos Hei\n");
    let classifier = ThresholdClassifier::default();
    let report = evaluator(&KeywordModel)
        .evaluate_file(&path, MalformedLinePolicy::Skip)
        .unwrap()
        .into_report("shuf_sme_label.txt", "keyword", &classifier)
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["accuracy"], 1.0);
    assert_eq!(json["tally"]["total"], 2);
    assert_eq!(json["tally"]["byLabel"]["__label__nos"]["other"], 1);
    assert_eq!(json["upperThreshold"], 0.6);
}

#[test]
fn classify_single_text() {
    let classifier = ThresholdClassifier::default();
    assert_eq!(
        classifier.classify(&KeywordModel, "Mii lea sámi").unwrap(),
        ClassificationResult::TargetLanguage
    );
    assert_eq!(
        classifier.classify(&KeywordModel, "Hei").unwrap(),
        ClassificationResult::OtherLanguage("__label__no".to_string())
    );
}
