//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProcessorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `classification.small_threshold`.
pub const SMALL_THRESHOLD_ENV: &str = "SMALL_THRESHOLD";
/// Environment variable overriding `classification.medium_threshold`.
pub const MEDIUM_THRESHOLD_ENV: &str = "MEDIUM_THRESHOLD";
/// Environment variable overriding `classification.large_threshold`.
pub const LARGE_THRESHOLD_ENV: &str = "LARGE_THRESHOLD";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProcessorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProcessorConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply threshold overrides from the process environment.
pub fn apply_env_overrides(config: &mut ProcessorConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply threshold overrides from an arbitrary variable source.
///
/// Unset or empty variables leave the current value alone. Values that do not
/// parse as a non-negative integer are ignored with a warning.
pub fn apply_overrides_from<F>(config: &mut ProcessorConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let thresholds = &mut config.classification;
    let targets = [
        (SMALL_THRESHOLD_ENV, &mut thresholds.small_threshold),
        (MEDIUM_THRESHOLD_ENV, &mut thresholds.medium_threshold),
        (LARGE_THRESHOLD_ENV, &mut thresholds.large_threshold),
    ];

    for (key, slot) in targets {
        let Some(raw) = lookup(key).filter(|v| !v.is_empty()) else {
            continue;
        };
        match raw.trim().parse::<u64>() {
            Ok(value) => {
                tracing::debug!(variable = key, value, "Threshold overridden from environment");
                *slot = value;
            }
            Err(e) => {
                tracing::warn!(
                    variable = key,
                    value = %raw,
                    error = %e,
                    kept = *slot,
                    "Ignoring unparsable threshold"
                );
            }
        }
    }
}
