//! Install pass orchestration
//!
//! Drives one run end to end:
//!
//! 1. Load the persisted state and the declared package list concurrently
//! 2. Fingerprint every package concurrently and decide which need installing
//! 3. Funnel those installs through the [`InstallCoordinator`]
//! 4. Merge freshly installed fingerprints into the state, pruning packages
//!    that are no longer declared, and persist it once
//!
//! Any error aborts the run before the state is written, so the state file
//! is left exactly as it was.

use crate::detect::{explain, UpdateReason};
use crate::error::{LazyInstallError, LazyInstallResult};
use crate::fingerprint::FingerprintEngine;
use crate::install::{InstallCoordinator, InstalledPackage, InstallRunner};
use crate::state::{current_schema_version, GlobalState, StateStore};
use crate::workspace::{PackageDescriptor, Workspace};
use futures_util::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of an install pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Packages installed during this run, sorted
    pub updated: Vec<String>,
    /// Packages dropped from the state because they are no longer declared
    pub pruned: Vec<String>,
    /// Whether the state schema changed, forcing every package to install
    pub reset: bool,
}

/// Install decision for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagePlan {
    pub name: String,
    /// `None` when the package is up to date
    pub reason: Option<UpdateReason>,
}

/// Runs install passes over one workspace
pub struct Orchestrator {
    engine: FingerprintEngine,
    store: StateStore,
    coordinator: InstallCoordinator,
    force: bool,
}

impl Orchestrator {
    pub fn new(workspace: Workspace, runner: Arc<dyn InstallRunner>) -> Self {
        Self {
            store: StateStore::new(workspace.state_path()),
            coordinator: InstallCoordinator::new(workspace.clone(), runner),
            engine: FingerprintEngine::new(workspace),
            force: false,
        }
    }

    /// Wipe installed dependencies before every reinstall
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Replace the fingerprint engine (e.g. to pin the home directory)
    pub fn with_engine(mut self, engine: FingerprintEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    async fn load(&self) -> LazyInstallResult<(GlobalState, Vec<PackageDescriptor>)> {
        load(&self.engine, &self.store).await
    }

    /// Run the install pass
    pub async fn run(&self) -> LazyInstallResult<RunReport> {
        let (state, packages) = self.load().await?;
        let reset = !state.is_current_schema();

        let installed = if reset {
            info!("Install state schema changed, installing every package");
            try_join_all(packages.iter().map(|package| self.reinstall_all(package))).await?
        } else {
            try_join_all(
                packages
                    .iter()
                    .map(|package| self.update_if_needed(package, &state)),
            )
            .await?
            .into_iter()
            .flatten()
            .collect()
        };

        let (merged, pruned) = merge(state, &packages, installed.clone());
        self.store.save(&merged).await?;

        let mut updated: Vec<String> = installed.into_iter().map(|p| p.name).collect();
        updated.sort();

        Ok(RunReport {
            updated,
            pruned,
            reset,
        })
    }

    /// Decide what a run would install, without installing or saving anything
    pub async fn plan(&self) -> LazyInstallResult<Vec<PackagePlan>> {
        plan(&self.engine, &self.store).await
    }

    async fn reinstall_all(
        &self,
        package: &PackageDescriptor,
    ) -> LazyInstallResult<InstalledPackage> {
        let current = self.engine.fingerprint(package).await?;
        self.coordinator.install(&package.name, current).await
    }

    async fn update_if_needed(
        &self,
        package: &PackageDescriptor,
        state: &GlobalState,
    ) -> LazyInstallResult<Option<InstalledPackage>> {
        let current = self.engine.fingerprint(package).await?;

        let Some(reason) = explain(&current, state.packages.get(&package.name)) else {
            debug!("{} is up to date", package.name);
            return Ok(None);
        };
        debug!("{} needs install: {}", package.name, reason);

        let installed = if self.force {
            self.coordinator
                .force_reinstall(&package.name, current)
                .await?
        } else {
            self.coordinator.install(&package.name, current).await?
        };
        Ok(Some(installed))
    }
}

async fn load(
    engine: &FingerprintEngine,
    store: &StateStore,
) -> LazyInstallResult<(GlobalState, Vec<PackageDescriptor>)> {
    tokio::try_join!(store.load(), engine.workspace().read_packages())
}

/// Decide what a run would install, without installing or saving anything
///
/// Only reads; no install runner is involved.
pub async fn plan(
    engine: &FingerprintEngine,
    store: &StateStore,
) -> LazyInstallResult<Vec<PackagePlan>> {
    let (state, packages) = load(engine, store).await?;
    let reset = !state.is_current_schema();
    let state = &state;

    try_join_all(packages.iter().map(|package| async move {
        let current = engine.fingerprint(package).await?;
        let reason = if reset {
            Some(UpdateReason::NotInstalled)
        } else {
            explain(&current, state.packages.get(&package.name))
        };
        Ok::<_, LazyInstallError>(PackagePlan {
            name: package.name.clone(),
            reason,
        })
    }))
    .await
}

/// Merge freshly installed fingerprints into the previous state
///
/// Keeps previous entries for packages that are still declared, replaces
/// entries for installed packages wholesale, and drops everything else.
/// Returns the new state and the names of pruned packages.
fn merge(
    previous: GlobalState,
    declared: &[PackageDescriptor],
    installed: Vec<InstalledPackage>,
) -> (GlobalState, Vec<String>) {
    let mut kept = BTreeMap::new();
    let mut pruned = Vec::new();

    for (name, fingerprint) in previous.packages {
        if declared.iter().any(|p| p.name == name) {
            kept.insert(name, fingerprint);
        } else {
            pruned.push(name);
        }
    }

    for package in installed {
        kept.insert(package.name, package.fingerprint);
    }

    if !pruned.is_empty() {
        debug!("Pruned {} undeclared packages from state", pruned.len());
    }

    (
        GlobalState {
            cache_breaker: Some(current_schema_version()),
            packages: kept,
        },
        pruned,
    )
}
