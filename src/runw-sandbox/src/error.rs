//! Error types for sandbox compilation and launch.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Errors raised while compiling directives or launching the sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create {path}: {source}")]
    HostMutation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid bind spec: {0}")]
    InvalidBindSpec(String),

    #[error("D-Bus proxy failed to start: {0}")]
    ProxyStartup(String),

    #[error("failed to execute {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no command to run")]
    EmptyCommand,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    pub(crate) fn host_mutation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::HostMutation {
            path: path.into(),
            source,
        }
    }
}
