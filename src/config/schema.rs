//! Configuration schema for lazyinstall
//!
//! Settings are read from `lazyinstall.toml` in the workspace root. Every
//! section is optional and falls back to npm conventions.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Workspace file layout
    pub workspace: WorkspaceConfig,

    /// External install command settings
    pub install: InstallConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// File names that make up a workspace, relative to the workspace root
/// (or to each package directory for the per-package files)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// JSON object of package directory -> cache breaker
    pub packages_file: String,

    /// Persisted install state
    pub state_file: String,

    /// Per-package dependency manifest
    pub manifest_file: String,

    /// Per-package optional lockfile
    pub shrinkwrap_file: String,

    /// Per-package installed dependency directory
    pub modules_dir: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            packages_file: "lazyinstall.json".to_string(),
            state_file: ".lazyinstall-state.json".to_string(),
            manifest_file: "package.json".to_string(),
            shrinkwrap_file: "npm-shrinkwrap.json".to_string(),
            modules_dir: "node_modules".to_string(),
        }
    }
}

/// External install command configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Program and arguments, run inside each package directory
    pub command: Vec<String>,

    /// Wipe the modules directory before every reinstall
    pub force: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            command: vec!["npm".to_string(), "install".to_string()],
            force: false,
        }
    }
}
