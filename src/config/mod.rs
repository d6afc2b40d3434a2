//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → config file (TOML, optional) via loader.rs
//!     → SMALL/MEDIUM/LARGE_THRESHOLD environment overrides
//!     → command line flags (main.rs)
//!     → validation.rs (semantic checks)
//!     → ProcessorConfig (validated, immutable)
//!     → ClassificationConfig shared via Arc to every stream
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, ConfigError};
pub use schema::{ClassificationConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProcessorConfig};
