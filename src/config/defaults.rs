//! Built-in default values.
//!
//! Used when neither `$AREPA_DATASET_CONFIG` nor `./arepa_dataset.toml`
//! provides a value and no command-line override is given.

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV_VAR: &str = "AREPA_DATASET_CONFIG";

/// Config file looked up in the current working directory.
pub const LOCAL_CONFIG_FILE: &str = "arepa_dataset.toml";

// ============================================================================
// Inputs
// ============================================================================

pub const COOKING_METRICS_PATH: &str = "input_dataset/cooking_metrics.csv";
pub const FAULTY_INTERVALS_PATH: &str = "input_dataset/faulty_intervals.csv";
pub const BATCH_REGISTRY_PATH: &str = "input_dataset/batch_registry.csv";

// ============================================================================
// CSV
// ============================================================================

/// Field delimiter of the line exports.
pub const CSV_DELIMITER: u8 = b';';

/// Decimal separator of the line exports.
pub const DECIMAL_SEPARATOR: char = ',';
