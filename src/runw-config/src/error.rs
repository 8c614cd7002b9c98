//! Error types for runw configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown preset '{name}' (used by {referenced_by})")]
    UnknownPreset { name: String, referenced_by: String },

    #[error("cyclic preset dependency: {}", cycle.join(" -> "))]
    CyclicPreset { cycle: Vec<String> },

    #[error("invalid bind spec: {0}")]
    InvalidBindSpec(String),

    #[error("unknown container: {0}")]
    UnknownProfile(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
