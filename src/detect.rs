//! Change detection
//!
//! Compares a freshly computed fingerprint with the one recorded at the last
//! successful install. Comparisons are structural: maps ignore key order,
//! arrays are order-sensitive, and values of different JSON types are never
//! equal (`1` and `"1"` differ).

use crate::state::PackageFingerprint;
use serde::Serialize;
use std::fmt;

/// Why a package needs to be reinstalled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateReason {
    /// Never installed, or the state schema changed
    NotInstalled,
    /// The package's cache breaker changed
    CacheBreaker,
    /// The lockfile changed
    Shrinkwrap,
    /// The declared dependencies changed
    Dependencies,
    /// A linked local dependency's contents changed
    LocalDependencies,
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotInstalled => "not installed",
            Self::CacheBreaker => "cache breaker changed",
            Self::Shrinkwrap => "shrinkwrap changed",
            Self::Dependencies => "dependencies changed",
            Self::LocalDependencies => "local dependencies changed",
        };
        write!(f, "{}", reason)
    }
}

/// The first rule that requires an update, or `None` if the package is current
pub fn explain(
    current: &PackageFingerprint,
    recorded: Option<&PackageFingerprint>,
) -> Option<UpdateReason> {
    let Some(recorded) = recorded else {
        return Some(UpdateReason::NotInstalled);
    };

    if recorded.cache_breaker != current.cache_breaker {
        return Some(UpdateReason::CacheBreaker);
    }

    // A lockfile that is present and differs from the recorded one forces an
    // update. The historical rule fired on *equality*, which reinstalled every
    // package with a lockfile on every run; see DESIGN.md.
    if let Some(shrinkwrap) = &current.shrinkwrap {
        if recorded.shrinkwrap.as_ref() != Some(shrinkwrap) {
            return Some(UpdateReason::Shrinkwrap);
        }
    }

    if recorded.dependencies != current.dependencies {
        return Some(UpdateReason::Dependencies);
    }

    if recorded.unversioned_dependency_checksums != current.unversioned_dependency_checksums {
        return Some(UpdateReason::LocalDependencies);
    }

    None
}

/// Whether a package must be reinstalled
pub fn needs_update(current: &PackageFingerprint, recorded: Option<&PackageFingerprint>) -> bool {
    explain(current, recorded).is_some()
}
