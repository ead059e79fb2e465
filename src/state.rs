//! Persisted install state
//!
//! One JSON document records, per package, the fingerprint that was current
//! when the package was last installed successfully. A global cache breaker
//! guards the document's schema: when it does not match
//! [`STATE_SCHEMA_VERSION`], every package is treated as new.

use crate::error::{LazyInstallError, LazyInstallResult};
use crate::fingerprint::ContentChecksum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Schema version of the state document. Bumping it resets every package.
pub const STATE_SCHEMA_VERSION: u64 = 1;

/// The current schema version as stored in the state document
pub fn current_schema_version() -> Value {
    Value::from(STATE_SCHEMA_VERSION)
}

/// Merged `dependencies` + `devDependencies`
pub type DependencyManifest = BTreeMap<String, String>;

/// Everything that decides whether a package must be reinstalled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFingerprint {
    pub dependencies: DependencyManifest,

    #[serde(default)]
    pub unversioned_dependency_checksums: BTreeMap<String, ContentChecksum>,

    /// Raw lockfile document; `None` when the package has no lockfile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shrinkwrap: Option<Value>,

    #[serde(default)]
    pub cache_breaker: Value,
}

/// The whole state document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_breaker: Option<Value>,

    #[serde(default)]
    pub packages: BTreeMap<String, PackageFingerprint>,
}

impl GlobalState {
    /// Whether this state was written by the current schema version
    pub fn is_current_schema(&self) -> bool {
        self.cache_breaker.as_ref() == Some(&current_schema_version())
    }
}

/// Loads and persists [`GlobalState`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, returning an empty state if the file does not exist
    ///
    /// A state file that exists but cannot be parsed is an error rather than
    /// an empty state, so a corrupt file never silently reinstalls everything.
    pub async fn load(&self) -> LazyInstallResult<GlobalState> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("State file {} not found, starting empty", self.path.display());
                return Ok(GlobalState::default());
            }
            Err(e) => {
                return Err(LazyInstallError::io(
                    format!("reading state file {}", self.path.display()),
                    e,
                ))
            }
        };

        serde_json::from_str(&content).map_err(|e| LazyInstallError::StateInvalid {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Overwrite the state file in one step
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place.
    pub async fn save(&self, state: &GlobalState) -> LazyInstallResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    LazyInstallError::io(format!("creating state directory {}", parent.display()), e)
                })?;
            }
        }

        let mut content = serde_json::to_string_pretty(state)?;
        content.push('\n');

        let tmp = self.tmp_path();
        fs::write(&tmp, content)
            .await
            .map_err(|e| LazyInstallError::io(format!("writing state file {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            LazyInstallError::io(format!("replacing state file {}", self.path.display()), e)
        })?;

        debug!(
            "Saved state for {} packages to {}",
            state.packages.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the state file. Returns whether a file was removed.
    pub async fn clear(&self) -> LazyInstallResult<bool> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LazyInstallError::io(
                format!("deleting state file {}", self.path.display()),
                e,
            )),
        }
    }

    /// Sibling file written before the atomic rename
    pub(crate) fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fingerprint(token: Value) -> PackageFingerprint {
        PackageFingerprint {
            dependencies: BTreeMap::from([("left-pad".to_string(), "^1.3.0".to_string())]),
            unversioned_dependency_checksums: BTreeMap::new(),
            shrinkwrap: None,
            cache_breaker: token,
        }
    }

    #[tokio::test]
    async fn load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let state = store.load().await.unwrap();
        assert_eq!(state, GlobalState::default());
        assert!(!state.is_current_schema());
    }

    #[tokio::test]
    async fn load_corrupt_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"packages\": ").unwrap();

        let err = StateStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, LazyInstallError::StateInvalid { .. }));
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        let state = GlobalState {
            cache_breaker: Some(current_schema_version()),
            packages: BTreeMap::from([("pkgA".to_string(), fingerprint(json!(1)))]),
        };
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.is_current_schema());
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn serialized_shape() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut with_lock = fingerprint(json!("a"));
        with_lock.shrinkwrap = Some(json!({}));
        let state = GlobalState {
            cache_breaker: Some(current_schema_version()),
            packages: BTreeMap::from([
                ("pkgB".to_string(), with_lock),
                ("pkgA".to_string(), fingerprint(json!(1))),
            ]),
        };
        store.save(&state).await.unwrap();

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["cacheBreaker"], json!(1));
        assert_eq!(raw["packages"]["pkgA"]["dependencies"]["left-pad"], "^1.3.0");
        assert_eq!(raw["packages"]["pkgA"]["unversionedDependencyChecksums"], json!({}));
        assert!(raw["packages"]["pkgA"].get("shrinkwrap").is_none());
        // An empty lockfile is recorded, not dropped
        assert_eq!(raw["packages"]["pkgB"]["shrinkwrap"], json!({}));
    }

    #[tokio::test]
    async fn save_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = GlobalState {
            cache_breaker: Some(current_schema_version()),
            packages: BTreeMap::from([
                ("b".to_string(), fingerprint(json!(2))),
                ("a".to_string(), fingerprint(json!(1))),
            ]),
        };

        store.save(&state).await.unwrap();
        let first = std::fs::read(store.path()).unwrap();
        store.save(&state).await.unwrap();
        let second = std::fs::read(store.path()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn clear_missing_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        assert!(!store.clear().await.unwrap());

        store.save(&GlobalState::default()).await.unwrap();
        assert!(store.clear().await.unwrap());
        assert!(!store.path().exists());
    }
}
