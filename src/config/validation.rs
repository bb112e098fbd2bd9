//! Config validation: unknown-key detection with Levenshtein suggestions
//! and separator checks.
//!
//! Two-pass parse: the raw TOML is first read as a `toml::Value`, its key
//! tree is compared against the known field names and typos are reported
//! with a "did you mean?" suggestion. Serde deserialization runs afterwards.
//! Unknown keys never fail a load.

use std::collections::HashSet;

use super::dataset_config::{single_ascii, DatasetConfig};

/// A non-fatal config warning (typo, unknown section).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `DatasetConfig`.
///
/// Kept by hand in step with the structs in dataset_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [inputs]
        "inputs",
        "inputs.cooking_metrics",
        "inputs.faulty_intervals",
        "inputs.batch_registry",
        // [csv]
        "csv",
        "csv.delimiter",
        "csv.decimal_separator",
        // [boundaries]
        "boundaries",
        "boundaries.window",
        "boundaries.faulty_interval",
        // [output]
        "output",
        "output.path",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Dotted path of every key in a TOML document, tables before their children.
///
/// `{ inputs = { cooking_metrics = "m.csv" } }` gives
/// `["inputs", "inputs.cooking_metrics"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };
    let mut keys = Vec::with_capacity(table.len());
    for (name, child) in table {
        let path = match prefix {
            "" => name.clone(),
            _ => format!("{prefix}.{name}"),
        };
        let nested = walk_toml_keys(child, &path);
        keys.push(path);
        keys.extend(nested);
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Levenshtein edit distance between two strings, counted in characters.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Closest known key within edit distance 3; ties go to the
/// lexicographically smaller key so the suggestion is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse raw TOML and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        // reported by the serde pass
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Values a run cannot proceed with. Every returned entry is fatal.
pub fn validate_ranges(config: &DatasetConfig) -> Vec<String> {
    let mut errors = Vec::new();
    let csv = &config.csv;

    let delimiter = single_ascii(&csv.delimiter);
    if delimiter.is_none() {
        errors.push(format!(
            "csv.delimiter = {:?} must be a single ASCII character",
            csv.delimiter
        ));
    }
    let decimal = single_ascii(&csv.decimal_separator);
    if decimal.is_none() {
        errors.push(format!(
            "csv.decimal_separator = {:?} must be a single ASCII character",
            csv.decimal_separator
        ));
    }
    if let (Some(d), Some(s)) = (delimiter, decimal) {
        if d == s {
            errors.push(format!(
                "csv.delimiter and csv.decimal_separator are both {d:?}"
            ));
        }
        if matches!(d, '"' | '\n' | '\r') {
            errors.push(format!("csv.delimiter = {d:?} cannot delimit fields"));
        }
    }

    for (key, path) in [
        ("inputs.cooking_metrics", &config.inputs.cooking_metrics),
        ("inputs.faulty_intervals", &config.inputs.faulty_intervals),
        ("inputs.batch_registry", &config.inputs.batch_registry),
    ] {
        if path.as_os_str().is_empty() {
            errors.push(format!("{key} is empty"));
        }
    }

    errors
}

// ============================================================================
// Tests
// ============================================================================
