//! Configuration management for lazyinstall

pub mod schema;

pub use schema::Config;

use crate::error::{LazyInstallError, LazyInstallResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Settings file looked up in the workspace root
pub const CONFIG_FILE_NAME: &str = "lazyinstall.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager for the settings file of a workspace
    pub fn for_workspace(root: &Path) -> Self {
        Self {
            config_path: root.join(CONFIG_FILE_NAME),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Load configuration, falling back to defaults if the file does not exist
    pub async fn load(&self) -> LazyInstallResult<Config> {
        Ok(self.load_file().await?.unwrap_or_default())
    }

    /// Load the settings file; `None` when it does not exist
    pub async fn load_file(&self) -> LazyInstallResult<Option<Config>> {
        match fs::read_to_string(&self.config_path).await {
            Ok(content) => Self::parse(&self.config_path, &content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LazyInstallError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )),
        }
    }

    fn parse(path: &Path, content: &str) -> LazyInstallResult<Config> {
        let config: Config = toml::from_str(content).map_err(|e| LazyInstallError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if config.install.command.is_empty() {
            return Err(LazyInstallError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: "install.command must name a program".to_string(),
            });
        }

        Ok(config)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}
