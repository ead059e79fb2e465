//! Package fingerprinting
//!
//! A fingerprint captures every input of a package install:
//!
//! | Input | Source |
//! |-------|--------|
//! | Declared dependencies | `dependencies` + `devDependencies` |
//! | Lockfile snapshot | `npm-shrinkwrap.json`, if present |
//! | Linked sibling packages | content checksum of each local dependency |
//! | Cache breaker | the package list entry |
//!
//! Fingerprints are recomputed from scratch on every run.

pub mod checksum;
pub mod local;
pub mod manifest;
pub mod packlist;

pub use checksum::ContentChecksum;
pub use local::{classify, LocalDependency, LocalDependencySet, LocalKind};
pub use manifest::PackageManifest;

use crate::error::{LazyInstallError, LazyInstallResult};
use crate::state::{DependencyManifest, PackageFingerprint, StateStore};
use crate::workspace::{PackageDescriptor, Workspace};
use futures_util::future::try_join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Computes fingerprints for packages of one workspace
#[derive(Debug, Clone)]
pub struct FingerprintEngine {
    workspace: Workspace,
    home: Option<PathBuf>,
    /// Files rewritten by every run, never part of a local dependency's contents
    excluded: Vec<PathBuf>,
}

impl FingerprintEngine {
    pub fn new(workspace: Workspace) -> Self {
        let store = StateStore::new(workspace.state_path());
        let excluded = [store.path().to_path_buf(), store.tmp_path()]
            .iter()
            .map(|p| local::normalize(p))
            .collect();
        Self {
            workspace,
            home: dirs::home_dir(),
            excluded,
        }
    }

    /// Override the directory `~/` specifiers expand to
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Read a package's manifest
    pub async fn manifest(&self, name: &str) -> LazyInstallResult<PackageManifest> {
        PackageManifest::from_file(name, &self.workspace.manifest_path(name)).await
    }

    /// Local dependencies of a package, resolved against its own directory
    pub fn local_dependencies(
        &self,
        name: &str,
        dependencies: &DependencyManifest,
    ) -> LocalDependencySet {
        local::local_dependencies(
            dependencies,
            &self.workspace.package_dir(name),
            self.home.as_deref(),
        )
    }

    /// Content checksum of one local dependency
    pub async fn checksum(&self, dependency: &LocalDependency) -> LazyInstallResult<ContentChecksum> {
        checksum::checksum(dependency, &self.excluded).await
    }

    /// Read a package's lockfile; `None` when the package has none
    pub async fn shrinkwrap(&self, name: &str) -> LazyInstallResult<Option<Value>> {
        let path = self.workspace.shrinkwrap_path(name);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LazyInstallError::io(
                    format!("reading shrinkwrap {}", path.display()),
                    e,
                ))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| LazyInstallError::ShrinkwrapInvalid {
                package: name.to_string(),
                path,
                reason: e.to_string(),
            })
    }

    /// Compute the current fingerprint of a declared package
    pub async fn fingerprint(
        &self,
        package: &PackageDescriptor,
    ) -> LazyInstallResult<PackageFingerprint> {
        let name = package.name.as_str();
        let (manifest, shrinkwrap) = tokio::try_join!(self.manifest(name), self.shrinkwrap(name))?;

        let dependencies = manifest.merged_dependencies();
        let locals = self.local_dependencies(name, &dependencies);

        let checksums = try_join_all(locals.iter().map(|(dep, local)| async move {
            let sum = self.checksum(local).await?;
            Ok::<_, LazyInstallError>((dep.clone(), sum))
        }))
        .await?;
        let unversioned_dependency_checksums: BTreeMap<String, ContentChecksum> =
            checksums.into_iter().collect();

        debug!(
            "Fingerprinted {}: {} dependencies, {} local, shrinkwrap: {}",
            name,
            dependencies.len(),
            unversioned_dependency_checksums.len(),
            shrinkwrap.is_some()
        );

        Ok(PackageFingerprint {
            dependencies,
            unversioned_dependency_checksums,
            shrinkwrap,
            cache_breaker: package.cache_breaker.clone(),
        })
    }
}
