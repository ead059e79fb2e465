//! Error types for lazyinstall
//!
//! All modules use `LazyInstallResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lazyinstall operations
pub type LazyInstallResult<T> = Result<T, LazyInstallError>;

/// All errors that can occur in lazyinstall
#[derive(Error, Debug)]
pub enum LazyInstallError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid package list at {path}: {reason}")]
    PackagesInvalid { path: PathBuf, reason: String },

    // State errors
    #[error("Invalid install state at {path}: {reason}")]
    StateInvalid { path: PathBuf, reason: String },

    // Package errors
    #[error("Package {package} has no manifest at {path}")]
    ManifestMissing { package: String, path: PathBuf },

    #[error("Invalid manifest for package {package} at {path}: {reason}")]
    ManifestInvalid {
        package: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Invalid shrinkwrap for package {package} at {path}: {reason}")]
    ShrinkwrapInvalid {
        package: String,
        path: PathBuf,
        reason: String,
    },

    // Install errors
    #[error("Install failed for package {package}: `{command}` exited with {}", exit_code_display(.code))]
    InstallFailed {
        package: String,
        command: String,
        code: Option<i32>,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

impl LazyInstallError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Check if this error is an IO "not found"
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::StateInvalid { .. } => Some("Run: lazyinstall clean"),
            Self::PackagesInvalid { .. } => {
                Some("The package list must be a JSON object of directory -> cache breaker")
            }
            Self::ManifestMissing { .. } => {
                Some("Remove the package from the package list or add a package.json")
            }
            Self::CommandFailed { .. } => Some("Check the [install] command in lazyinstall.toml"),
            _ => None,
        }
    }
}
