//! Install coordination
//!
//! Fingerprinting runs concurrently for every package, but the external
//! install command does not: a single async mutex ensures at most one install
//! subprocess runs at a time. The guard is dropped on every exit path, so a
//! failed install never leaves the lock held.

use crate::error::{LazyInstallError, LazyInstallResult};
use crate::state::PackageFingerprint;
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Runs the external install step for one package directory
#[async_trait]
pub trait InstallRunner: Send + Sync {
    /// Install dependencies in `package_dir`
    async fn install(&self, package: &str, package_dir: &Path) -> LazyInstallResult<()>;

    /// Human-readable command line for messages
    fn describe(&self) -> String;
}

/// Runs a configured program with stdio passed through
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl CommandRunner {
    /// Build a runner from a program followed by its arguments
    pub fn from_argv(argv: &[String]) -> LazyInstallResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| LazyInstallError::User("install command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl InstallRunner for CommandRunner {
    async fn install(&self, package: &str, package_dir: &Path) -> LazyInstallResult<()> {
        debug!("Executing in {}: {}", package_dir.display(), self.describe());

        let status = Command::new(&self.program)
            .args(&self.args)
            .current_dir(package_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| LazyInstallError::command_failed(self.describe(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(LazyInstallError::InstallFailed {
                package: package.to_string(),
                command: self.describe(),
                code: status.code(),
            })
        }
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A package whose fingerprint became the recorded one during this run
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledPackage {
    pub name: String,
    pub fingerprint: PackageFingerprint,
}

/// Serializes install invocations across all packages
pub struct InstallCoordinator {
    workspace: Workspace,
    runner: Arc<dyn InstallRunner>,
    lock: Mutex<()>,
}

impl InstallCoordinator {
    pub fn new(workspace: Workspace, runner: Arc<dyn InstallRunner>) -> Self {
        Self {
            workspace,
            runner,
            lock: Mutex::new(()),
        }
    }

    /// Run the install command for `name` while holding the install lock
    pub async fn install(
        &self,
        name: &str,
        fingerprint: PackageFingerprint,
    ) -> LazyInstallResult<InstalledPackage> {
        let _guard = self.lock.lock().await;

        info!("Installing {} ({})", name, self.runner.describe());
        self.runner
            .install(name, &self.workspace.package_dir(name))
            .await?;

        Ok(InstalledPackage {
            name: name.to_string(),
            fingerprint,
        })
    }

    /// Delete the package's installed dependencies, then install
    pub async fn force_reinstall(
        &self,
        name: &str,
        fingerprint: PackageFingerprint,
    ) -> LazyInstallResult<InstalledPackage> {
        let modules = self.workspace.modules_path(name);
        match tokio::fs::remove_dir_all(&modules).await {
            Ok(()) => debug!("Removed {}", modules.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(LazyInstallError::io(
                    format!("removing {}", modules.display()),
                    e,
                ))
            }
        }

        self.install(name, fingerprint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::WorkspaceConfig;
    use futures_util::future::join_all;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn fingerprint() -> PackageFingerprint {
        PackageFingerprint {
            dependencies: BTreeMap::new(),
            unversioned_dependency_checksums: BTreeMap::new(),
            shrinkwrap: None,
            cache_breaker: json!(1),
        }
    }

    /// Tracks how many installs are in flight at once
    #[derive(Default)]
    struct OverlapRunner {
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: AtomicUsize,
        fail: Option<&'static str>,
    }

    #[async_trait]
    impl InstallRunner for OverlapRunner {
        async fn install(&self, package: &str, _dir: &Path) -> LazyInstallResult<()> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail == Some(package) {
                return Err(LazyInstallError::InstallFailed {
                    package: package.to_string(),
                    command: self.describe(),
                    code: Some(1),
                });
            }
            Ok(())
        }

        fn describe(&self) -> String {
            "overlap".to_string()
        }
    }

    fn coordinator(dir: &TempDir, runner: Arc<OverlapRunner>) -> InstallCoordinator {
        InstallCoordinator::new(
            Workspace::new(dir.path(), WorkspaceConfig::default()),
            runner,
        )
    }

    #[tokio::test]
    async fn installs_never_overlap() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(OverlapRunner::default());
        let coordinator = coordinator(&dir, runner.clone());

        let names = ["a", "b", "c", "d", "e"];
        let results = join_all(names.iter().map(|n| coordinator.install(n, fingerprint()))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(runner.calls.load(Ordering::SeqCst), names.len());
        assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_releases_lock() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(OverlapRunner {
            fail: Some("bad"),
            ..Default::default()
        });
        let coordinator = coordinator(&dir, runner.clone());

        let err = coordinator.install("bad", fingerprint()).await.unwrap_err();
        assert!(matches!(err, LazyInstallError::InstallFailed { .. }));

        // The lock is free again
        let installed = coordinator.install("good", fingerprint()).await.unwrap();
        assert_eq!(installed.name, "good");
        assert_eq!(installed.fingerprint, fingerprint());
    }

    #[tokio::test]
    async fn force_reinstall_wipes_modules() {
        let dir = TempDir::new().unwrap();
        let modules = dir.path().join("pkg/node_modules/dep");
        std::fs::create_dir_all(&modules).unwrap();
        std::fs::write(modules.join("index.js"), "").unwrap();

        let runner = Arc::new(OverlapRunner::default());
        let coordinator = coordinator(&dir, runner.clone());

        coordinator.force_reinstall("pkg", fingerprint()).await.unwrap();
        assert!(!dir.path().join("pkg/node_modules").exists());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

        // Already absent is fine
        coordinator.force_reinstall("pkg", fingerprint()).await.unwrap();
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn command_runner_describe() {
        let runner =
            CommandRunner::from_argv(&["npm".to_string(), "ci".to_string()]).unwrap();
        assert_eq!(runner.describe(), "npm ci");
        assert!(CommandRunner::from_argv(&[]).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_runner_exit_codes() {
        let dir = TempDir::new().unwrap();

        let ok = CommandRunner::from_argv(&["true".to_string()]).unwrap();
        ok.install("pkg", dir.path()).await.unwrap();

        let fail = CommandRunner::from_argv(&[
            "sh".to_string(),
            "-c".to_string(),
            "exit 3".to_string(),
        ])
        .unwrap();
        match fail.install("pkg", dir.path()).await.unwrap_err() {
            LazyInstallError::InstallFailed { package, code, .. } => {
                assert_eq!(package, "pkg");
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_runner_uses_package_dir() {
        let dir = TempDir::new().unwrap();
        let runner = CommandRunner::from_argv(&[
            "sh".to_string(),
            "-c".to_string(),
            "touch installed.marker".to_string(),
        ])
        .unwrap();

        runner.install("pkg", dir.path()).await.unwrap();
        assert!(dir.path().join("installed.marker").exists());
    }
}
