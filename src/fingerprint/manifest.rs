//! Package manifest parsing
//!
//! Only the fields that affect installation are read: the two dependency
//! tables, plus `files` and `main`, which decide what a package publishes.

use crate::error::{LazyInstallError, LazyInstallResult};
use crate::state::DependencyManifest;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed `package.json`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Explicit allow-list of published paths
    #[serde(default)]
    pub files: Option<Vec<String>>,

    /// Entry point, always published
    #[serde(default)]
    pub main: Option<String>,
}

impl PackageManifest {
    /// Read the manifest of a declared package. A missing file is an error.
    pub async fn from_file(package: &str, path: &Path) -> LazyInstallResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LazyInstallError::ManifestMissing {
                    package: package.to_string(),
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(LazyInstallError::io(
                    format!("reading manifest {}", path.display()),
                    e,
                ))
            }
        };
        Self::parse(package, path, &content)
    }

    /// Read a manifest that may legitimately be absent (e.g. a linked directory)
    pub async fn from_optional_file(package: &str, path: &Path) -> LazyInstallResult<Option<Self>> {
        match Self::from_file(package, path).await {
            Ok(manifest) => Ok(Some(manifest)),
            Err(LazyInstallError::ManifestMissing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn parse(package: &str, path: &Path, content: &str) -> LazyInstallResult<Self> {
        serde_json::from_str(content).map_err(|e| LazyInstallError::ManifestInvalid {
            package: package.to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Regular dependencies, then development dependencies overwriting on collision
    pub fn merged_dependencies(&self) -> DependencyManifest {
        let mut merged = self.dependencies.clone();
        merged.extend(
            self.dev_dependencies
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone())),
        );
        merged
    }
}
