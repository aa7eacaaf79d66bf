use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use cash3_db::db;
use cash3_predict::PredictError;
use cash3_predict::scorer::{DEFAULT_DECAY_RATE, ScoringOptions, ScoringWeights};

/// Looked up when no `--config` is given. Absent file means defaults.
pub const DEFAULT_CONFIG_PATH: &str = "data/cash3.json";

/// Settings loaded from a JSON file. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub summary_file: String,
    pub weights: ScoringWeights,
    /// `null` in the file disables recency weighting.
    pub decay_rate: Option<f64>,
    pub suggestions: usize,
    pub insight_window: usize,
    pub evaluate_window: usize,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            summary_file: "summary.json".to_string(),
            weights: ScoringWeights::default(),
            decay_rate: Some(DEFAULT_DECAY_RATE),
            suggestions: 5,
            insight_window: 100,
            evaluate_window: 30,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("data_dir must not be empty")]
    EmptyDataDir,
    #[error("summary_file must not be empty")]
    EmptySummaryFile,
    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
    #[error(transparent)]
    Scoring(#[from] PredictError),
}

impl Settings {
    /// `explicit` must exist. Otherwise `DEFAULT_CONFIG_PATH` is used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if fallback.exists() {
                    Self::from_path(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path_buf.clone(),
            source,
        })?;
        let mut settings: Settings = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            ConfigError::Parse {
                path: path_buf.clone(),
                source,
            }
        })?;
        settings.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(settings)
    }

    pub fn validate(&mut self) -> Result<(), ValidationError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ValidationError::EmptyDataDir);
        }
        if self.summary_file.trim().is_empty() {
            return Err(ValidationError::EmptySummaryFile);
        }
        if self.log_level.trim().is_empty() {
            self.log_level = default_log_level();
        }
        if self.level().is_none() {
            return Err(ValidationError::UnknownLogLevel(self.log_level.clone()));
        }
        self.scoring().validate()?;
        Ok(())
    }

    pub fn level(&self) -> Option<Level> {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }

    pub fn scoring(&self) -> ScoringOptions {
        ScoringOptions {
            weights: self.weights,
            decay_rate: self.decay_rate,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        db::db_path(&self.data_dir)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.data_dir.join(&self.summary_file)
    }
}
