//! Order-independent content checksums
//!
//! Every included file is hashed on its own, the hex digests are sorted, and
//! the concatenation is hashed again. The result does not depend on the order
//! files are discovered in or the order their reads complete.

use crate::error::{LazyInstallError, LazyInstallResult};
use crate::fingerprint::local::{LocalDependency, LocalKind};
use crate::fingerprint::packlist;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Aggregate SHA-256 over a set of files, as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentChecksum(String);

impl ContentChecksum {
    /// Combine per-file digests into one checksum
    pub fn from_file_digests(digests: impl IntoIterator<Item = String>) -> Self {
        let mut digests: Vec<String> = digests.into_iter().collect();
        digests.sort_unstable();
        Self(digest_bytes(digests.concat().as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 of raw bytes as lowercase hex
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

async fn hash_file(path: &Path) -> LazyInstallResult<String> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| LazyInstallError::io(format!("reading {}", path.display()), e))?;
    Ok(digest_bytes(&contents))
}

/// Hash all files concurrently and combine the digests
pub async fn checksum_files(files: &[PathBuf]) -> LazyInstallResult<ContentChecksum> {
    let digests = try_join_all(files.iter().map(|path| hash_file(path))).await?;
    Ok(ContentChecksum::from_file_digests(digests))
}

/// Checksum the publishable contents of a local dependency, ignoring any
/// file listed in `exclude`
pub async fn checksum(
    dependency: &LocalDependency,
    exclude: &[PathBuf],
) -> LazyInstallResult<ContentChecksum> {
    let files = match dependency.kind {
        LocalKind::Directory => packlist::list_files(&dependency.path, exclude).await?,
        LocalKind::Tarball => vec![dependency.path.clone()],
    };

    let sum = checksum_files(&files).await?;
    debug!(
        "Checksum of {} ({} files): {}",
        dependency.path.display(),
        files.len(),
        sum
    );
    Ok(sum)
}
