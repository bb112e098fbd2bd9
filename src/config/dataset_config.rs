//! Dataset builder configuration loaded from TOML

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::io::CsvFormat;
use crate::types::BoundaryPolicy;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration of the dataset builder.
///
/// Load with `DatasetConfig::load()` which searches:
/// 1. `$AREPA_DATASET_CONFIG` env var
/// 2. `./arepa_dataset.toml`
/// 3. Built-in defaults
///
/// Command-line arguments are applied on top by the binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Input file locations
    pub inputs: InputsConfig,

    /// Layout of the input exports
    pub csv: CsvConfig,

    /// Boundary conventions for the window and the faulty intervals
    pub boundaries: BoundariesConfig,

    /// Output destination
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub cooking_metrics: PathBuf,
    pub faulty_intervals: PathBuf,
    pub batch_registry: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            cooking_metrics: PathBuf::from(defaults::COOKING_METRICS_PATH),
            faulty_intervals: PathBuf::from(defaults::FAULTY_INTERVALS_PATH),
            batch_registry: PathBuf::from(defaults::BATCH_REGISTRY_PATH),
        }
    }
}

/// Separators are kept as strings so a bad value is reported by validation
/// instead of as an opaque parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: String,
    pub decimal_separator: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: char::from(defaults::CSV_DELIMITER).to_string(),
            decimal_separator: defaults::DECIMAL_SEPARATOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundariesConfig {
    pub window: BoundaryPolicy,
    pub faulty_interval: BoundaryPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Dataset file; stdout when unset
    pub path: Option<PathBuf>,
}

impl DatasetConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AREPA_DATASET_CONFIG` environment variable
    /// 2. `./arepa_dataset.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A config file that exists but does not parse or validate is an error.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                let config = Self::load_from_file(&p)?;
                info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                return Ok(config);
            }
            warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            info!(path = %local.display(), "Loaded local config");
            return Ok(config);
        }

        info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys are logged, not rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = super::validation::validate_ranges(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// CSV layout of the input files.
    pub fn csv_format(&self) -> Result<CsvFormat, ConfigError> {
        self.validate()?;
        match (
            single_ascii(&self.csv.delimiter),
            single_ascii(&self.csv.decimal_separator),
        ) {
            (Some(delimiter), Some(decimal)) => Ok(CsvFormat {
                delimiter: delimiter as u8,
                decimal_separator: decimal,
            }),
            _ => Err(ConfigError::Validation(vec![
                "csv separators must be single ASCII characters".to_string(),
            ])),
        }
    }
}

/// The only character of `s` when it is exactly one ASCII character
pub(crate) fn single_ascii(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Some(c),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
