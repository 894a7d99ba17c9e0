// Configuration Storage Service
// Handles config file read/write with a single backup copy

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{LabelSet, NON_TARGET_LABEL, TARGET_LABEL, UNCLASSIFIED_LABEL};
use super::corpus::MalformedLinePolicy;
use super::detection::thresholds::{
    ThresholdClassifier, ThresholdError, DEFAULT_LOWER_THRESHOLD, DEFAULT_UPPER_THRESHOLD,
};
use super::identifier::ModelBackend;

const CONFIG_FILE: &str = "config.json";
const BACKUP_FILE: &str = "config.json.bak";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to {action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize config")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Thresholds(#[from] ThresholdError),
    #[error("{} already exists (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            model: ModelConfig::default(),
            corpus: CorpusConfig::default(),
            classifier: ClassifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            path: default_model_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub malformed_lines: MalformedLinePolicy,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
            malformed_lines: MalformedLinePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    #[serde(default = "default_target_label")]
    pub target_label: String,
    #[serde(default = "default_non_target_label")]
    pub non_target_label: String,
    #[serde(default = "default_unclassified_label")]
    pub unclassified_label: String,
    #[serde(default = "default_lower")]
    pub lower_threshold: f64,
    #[serde(default = "default_upper")]
    pub upper_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            target_label: default_target_label(),
            non_target_label: default_non_target_label(),
            unclassified_label: default_unclassified_label(),
            lower_threshold: DEFAULT_LOWER_THRESHOLD,
            upper_threshold: DEFAULT_UPPER_THRESHOLD,
        }
    }
}

impl ClassifierConfig {
    pub fn classifier(&self) -> Result<ThresholdClassifier, ConfigError> {
        Ok(ThresholdClassifier::new(self.lower_threshold, self.upper_threshold)?)
    }

    pub fn labels(&self) -> LabelSet {
        LabelSet {
            target: self.target_label.clone(),
            non_target: self.non_target_label.clone(),
            unclassified: self.unclassified_label.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_keep_logs")]
    pub keep_logs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            keep_logs: default_keep_logs(),
        }
    }
}

fn default_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_model_path() -> PathBuf { PathBuf::from("lid.176.bin") }
fn default_corpus_path() -> PathBuf { PathBuf::from("shuf_sme_label.txt") }
fn default_target_label() -> String { TARGET_LABEL.to_string() }
fn default_non_target_label() -> String { NON_TARGET_LABEL.to_string() }
fn default_unclassified_label() -> String { UNCLASSIFIED_LABEL.to_string() }
fn default_lower() -> f64 { DEFAULT_LOWER_THRESHOLD }
fn default_upper() -> f64 { DEFAULT_UPPER_THRESHOLD }
fn default_keep_logs() -> usize { 30 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join(CONFIG_FILE);
        Self { config_dir, config_file }
    }

    /// Store rooted at an explicit file path (e.g. `--config`).
    pub fn at_file(config_file: PathBuf) -> Self {
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sme-classifier"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn exists(&self) -> bool {
        self.config_file.exists()
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        if self.config_dir.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            action: "create config dir",
            path: self.config_dir.clone(),
            source,
        })
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            tracing::debug!(path = %self.config_file.display(), "No config file, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(|source| ConfigError::Io {
            action: "read config",
            path: self.config_file.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.config_file.clone(),
            source,
        })
    }

    /// Write the default configuration without reading the current file,
    /// so a corrupt config can be replaced with `force`.
    pub fn init(&self, force: bool) -> Result<AppConfig, ConfigError> {
        if self.exists() && !force {
            return Err(ConfigError::AlreadyExists(self.config_file.clone()));
        }
        let config = AppConfig::default();
        self.save(&config)?;
        tracing::info!(path = %self.config_file.display(), "Wrote default config");
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;

        fs::write(&self.config_file, content).map_err(|source| ConfigError::Io {
            action: "write config",
            path: self.config_file.clone(),
            source,
        })
    }

    fn backup_file(&self) -> PathBuf {
        self.config_dir.join(BACKUP_FILE)
    }

    /// Keep the previous config next to the new one
    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_file = self.backup_file();
        fs::copy(&self.config_file, &backup_file).map_err(|source| ConfigError::Io {
            action: "back up config to",
            path: backup_file.clone(),
            source,
        })?;
        Ok(())
    }
}
