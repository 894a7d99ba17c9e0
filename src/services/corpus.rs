// Labeled Corpus Reader
// One record per line: a 12-character label token, one separator, then the text.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::LabeledLine;

/// Width of a label token such as `__label__sme`. The text payload starts
/// one separator character later.
pub const LABEL_WIDTH: usize = 12;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Failed to open corpus {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read corpus")]
    Read(#[from] std::io::Error),
    #[error("Malformed line {line_no}: {len} characters, need at least {}", LABEL_WIDTH)]
    MalformedLine { line_no: usize, len: usize },
}

/// What to do with a line too short to hold a label token.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedLinePolicy {
    #[default]
    Skip,
    Error,
}

/// Split a line (without its newline) into label token and text payload.
///
/// Offsets count characters, not bytes. Returns `None` when the line is
/// shorter than the label token.
pub fn parse_labeled_line(line: &str, line_no: usize) -> Option<LabeledLine> {
    let mut chars = line.char_indices().map(|(i, _)| i).chain(std::iter::once(line.len()));
    let label_end = chars.nth(LABEL_WIDTH)?;
    let text_start = chars.next().unwrap_or(line.len());

    Some(LabeledLine {
        line_no,
        expected_label: line[..label_end].to_string(),
        text: line[text_start..].to_string(),
    })
}

/// Streams `LabeledLine`s from a corpus, applying the malformed-line policy.
pub struct CorpusReader<R> {
    lines: Lines<R>,
    line_no: usize,
    policy: MalformedLinePolicy,
    skipped: u64,
}

impl CorpusReader<BufReader<File>> {
    pub fn open(path: &Path, policy: MalformedLinePolicy) -> Result<Self, CorpusError> {
        let file = File::open(path).map_err(|source| CorpusError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Opened corpus");
        Ok(Self::new(BufReader::new(file), policy))
    }
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R, policy: MalformedLinePolicy) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            policy,
            skipped: 0,
        }
    }

    /// Lines dropped under `MalformedLinePolicy::Skip` so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<LabeledLine, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(CorpusError::Read(e))),
            };
            self.line_no += 1;
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if let Some(parsed) = parse_labeled_line(line, self.line_no) {
                return Some(Ok(parsed));
            }

            let len = line.chars().count();
            match self.policy {
                MalformedLinePolicy::Skip => {
                    tracing::warn!(line_no = self.line_no, len, "Skipping malformed corpus line");
                    self.skipped += 1;
                }
                MalformedLinePolicy::Error => {
                    return Some(Err(CorpusError::MalformedLine {
                        line_no: self.line_no,
                        len,
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_fixed_width_line() {
        let line = parse_labeled_line("__label__sme Mii lea sámi", 1).unwrap();
        assert_eq!(line.expected_label, "__label__sme");
        assert_eq!(line.text, "Mii lea sámi");
        assert_eq!(line.line_no, 1);
    }

    #[test]
    fn test_parse_long_label_is_truncated() {
        let line = parse_labeled_line("__label__unclassified hm", 3).unwrap();
        assert_eq!(line.expected_label, "__label__unc");
        assert_eq!(line.text, "assified hm");
    }

    #[test]
    fn test_parse_label_only() {
        let exact = parse_labeled_line("__label__nos", 1).unwrap();
        assert_eq!(exact.expected_label, "__label__nos");
        assert_eq!(exact.text, "");

        let with_sep = parse_labeled_line("__label__nos ", 1).unwrap();
        assert_eq!(with_sep.text, "");
    }

    #[test]
    fn test_parse_counts_characters() {
        // Multi-byte characters inside the prefix must not split a code point.
        let line = parse_labeled_line("ááááááááááááXdata", 1).unwrap();
        assert_eq!(line.expected_label, "áááááááááááá");
        assert_eq!(line.text, "data");
    }

    #[test]
    fn test_parse_short_line() {
        assert!(parse_labeled_line("", 1).is_none());
        assert!(parse_labeled_line("__label__sm", 1).is_none());
    }

    #[test]
    fn test_reader_skips_malformed() {
        let data = "__label__sme Buorre beaivi\r\nshort\n\n__label__nos God dag\n";
        let mut reader = CorpusReader::new(Cursor::new(data), MalformedLinePolicy::Skip);
        let lines: Vec<LabeledLine> = reader.by_ref().collect::<Result<_, _>>().unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Buorre beaivi");
        assert_eq!(lines[1].line_no, 4);
        assert_eq!(lines[1].text, "God dag");
        assert_eq!(reader.skipped(), 2);
    }

    #[test]
    fn test_reader_errors_on_malformed() {
        let data = "__label__sme Buorre beaivi\nshort\n";
        let mut reader = CorpusReader::new(Cursor::new(data), MalformedLinePolicy::Error);
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(CorpusError::MalformedLine { line_no, len }) => {
                assert_eq!(line_no, 2);
                assert_eq!(len, 5);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_open_missing_file() {
        let err = CorpusReader::open(Path::new("no/such/corpus.txt"), MalformedLinePolicy::Skip)
            .err()
            .unwrap();
        assert!(matches!(err, CorpusError::Open { .. }));
    }

    #[test]
    fn test_error_messages() {
        use std::error::Error as _;

        let malformed = CorpusError::MalformedLine { line_no: 7, len: 3 };
        assert_eq!(
            malformed.to_string(),
            format!("Malformed line 7: 3 characters, need at least {}", LABEL_WIDTH)
        );

        let err = CorpusReader::open(Path::new("no/such/corpus.txt"), MalformedLinePolicy::Skip)
            .err()
            .unwrap();
        let cause = err.source().unwrap().to_string();
        assert!(!err.to_string().contains(&cause));
    }
}
