//! Workspace layout and declared package list
//!
//! The package list is a JSON object mapping each package directory
//! (relative to the workspace root) to an opaque cache breaker. Changing a
//! package's cache breaker forces that package to reinstall.

use crate::config::schema::WorkspaceConfig;
use crate::error::{LazyInstallError, LazyInstallResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// A declared package
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    /// Workspace-relative package directory
    pub name: String,

    /// Opaque invalidation token, compared structurally
    pub cache_breaker: Value,
}

/// Resolves workspace-relative names to concrete paths
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    layout: WorkspaceConfig,
}

impl Workspace {
    /// Create a workspace rooted at `root`
    pub fn new(root: impl Into<PathBuf>, layout: WorkspaceConfig) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages_path(&self) -> PathBuf {
        self.root.join(&self.layout.packages_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(&self.layout.state_file)
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.package_dir(name).join(&self.layout.manifest_file)
    }

    pub fn shrinkwrap_path(&self, name: &str) -> PathBuf {
        self.package_dir(name).join(&self.layout.shrinkwrap_file)
    }

    pub fn modules_path(&self, name: &str) -> PathBuf {
        self.package_dir(name).join(&self.layout.modules_dir)
    }

    /// Read the declared packages, sorted by name
    ///
    /// A missing package list is not an error: there is simply nothing to
    /// install. A package list that exists but cannot be parsed is fatal.
    pub async fn read_packages(&self) -> LazyInstallResult<Vec<PackageDescriptor>> {
        let path = self.packages_path();

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Package list {} not found, nothing to install",
                    path.display()
                );
                return Ok(vec![]);
            }
            Err(e) => {
                return Err(LazyInstallError::io(
                    format!("reading package list {}", path.display()),
                    e,
                ))
            }
        };

        let packages = parse_packages(&path, &content)?;
        debug!("Declared {} packages in {}", packages.len(), path.display());
        Ok(packages)
    }
}

fn parse_packages(path: &Path, content: &str) -> LazyInstallResult<Vec<PackageDescriptor>> {
    let invalid = |reason: String| LazyInstallError::PackagesInvalid {
        path: path.to_path_buf(),
        reason,
    };

    let value: Value = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;

    let Value::Object(entries) = value else {
        return Err(invalid("expected a JSON object".to_string()));
    };

    let mut packages: Vec<PackageDescriptor> = entries
        .into_iter()
        .map(|(name, cache_breaker)| PackageDescriptor {
            name,
            cache_breaker,
        })
        .collect();
    packages.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(packages)
}
