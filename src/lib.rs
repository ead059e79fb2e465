//! lazyinstall - selective dependency reinstall for multi-package workspaces
//!
//! Fingerprints each declared package and reruns the external install
//! command only for packages whose inputs changed since their last
//! successful install.

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod fingerprint;
pub mod install;
pub mod orchestrator;
pub mod state;
pub mod ui;
pub mod workspace;

pub use error::{LazyInstallError, LazyInstallResult};
