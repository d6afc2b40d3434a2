//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the processor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the external processor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Listener configuration (bind address, HTTP/2 limits).
    pub listener: ListenerConfig,

    /// Size classification thresholds.
    pub classification: ClassificationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:50051").
    pub bind_address: String,

    /// Maximum concurrent HTTP/2 streams per proxy connection.
    pub max_concurrent_streams: Option<u32>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:50051".to_string(),
            max_concurrent_streams: None,
        }
    }
}

/// Byte-count boundaries used to label request bodies.
///
/// Built once at startup and shared read-only by every stream. Only
/// `small_threshold` and `medium_threshold` take part in the comparison;
/// `large_threshold` is carried as configuration but bodies at or above
/// `medium_threshold` are already "large".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Bodies shorter than this are "small".
    pub small_threshold: u64,

    /// Bodies shorter than this (and not small) are "medium".
    pub medium_threshold: u64,

    /// Upper boundary, accepted and reported but not used for decisions.
    pub large_threshold: u64,
}

impl ClassificationConfig {
    /// Build a config from explicit thresholds.
    pub fn new(small_threshold: u64, medium_threshold: u64, large_threshold: u64) -> Self {
        Self {
            small_threshold,
            medium_threshold,
            large_threshold,
        }
    }

    /// Whether `small <= medium <= large` holds.
    pub fn is_ordered(&self) -> bool {
        self.small_threshold <= self.medium_threshold
            && self.medium_threshold <= self.large_threshold
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            small_threshold: 1024,
            medium_threshold: 2048,
            large_threshold: 2048,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = ProcessorConfig::default();
        assert_eq!(config.classification, ClassificationConfig::new(1024, 2048, 2048));
        assert_eq!(config.listener.bind_address, "0.0.0.0:50051");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn ordering_check() {
        assert!(ClassificationConfig::default().is_ordered());
        assert!(ClassificationConfig::new(0, 0, 0).is_ordered());
        assert!(!ClassificationConfig::new(4096, 2048, 2048).is_ordered());
        assert!(!ClassificationConfig::new(10, 30, 20).is_ordered());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ProcessorConfig = toml::from_str(
            r#"
            [classification]
            small_threshold = 10

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.classification.small_threshold, 10);
        assert_eq!(config.classification.medium_threshold, 2048);
        assert_eq!(config.classification.large_threshold, 2048);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listener.bind_address, "0.0.0.0:50051");
    }
}
