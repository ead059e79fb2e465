//! Local dependency classification
//!
//! Decides whether a dependency specifier points at the filesystem rather
//! than a registry range, dist-tag, alias, or remote URL. Classification is a
//! pure function of the specifier and the declaring package's directory: it
//! never consults or changes the process working directory, so packages can
//! be classified concurrently.

use crate::state::DependencyManifest;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// What a local specifier points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    /// A package directory
    Directory,
    /// A packed tarball (`.tgz`, `.tar.gz`, `.tar`)
    Tarball,
}

/// A dependency resolved to a filesystem path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDependency {
    pub kind: LocalKind,
    /// Absolute when `base_dir` is absolute; lexically normalised
    pub path: PathBuf,
}

/// Local dependencies of one package, keyed by dependency name
pub type LocalDependencySet = BTreeMap<String, LocalDependency>;

const TARBALL_SUFFIXES: &[&str] = &[".tgz", ".tar.gz", ".tar"];

/// Classify one dependency specifier
///
/// Returns `None` for anything that is not a filesystem path. `home` is used
/// to expand `~/`; when unknown the tilde is kept literally.
pub fn classify(
    name: &str,
    specifier: &str,
    base_dir: &Path,
    home: Option<&Path>,
) -> Option<LocalDependency> {
    let raw = local_path_part(specifier.trim())?;

    let resolved = if let Some(rest) = raw.strip_prefix("~/") {
        match home {
            Some(home) => home.join(rest),
            None => base_dir.join(raw),
        }
    } else {
        base_dir.join(raw)
    };
    let path = normalize(&resolved);

    let lower = raw.to_ascii_lowercase();
    let kind = if TARBALL_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        LocalKind::Tarball
    } else {
        LocalKind::Directory
    };

    debug!("{} -> local {:?} {}", name, kind, path.display());
    Some(LocalDependency { kind, path })
}

/// Classify every entry of a merged dependency manifest
pub fn local_dependencies(
    dependencies: &DependencyManifest,
    base_dir: &Path,
    home: Option<&Path>,
) -> LocalDependencySet {
    dependencies
        .iter()
        .filter_map(|(name, spec)| {
            classify(name, spec, base_dir, home).map(|local| (name.clone(), local))
        })
        .collect()
}

/// Extract the path portion of a local specifier, or `None` if not local
fn local_path_part(spec: &str) -> Option<&str> {
    for protocol in ["file:", "link:"] {
        if let Some(rest) = strip_prefix_ignore_case(spec, protocol) {
            // file:///abs/path is a URL form of /abs/path
            let rest = match rest.strip_prefix("//") {
                Some(url_path) if url_path.starts_with('/') => url_path,
                _ => rest,
            };
            return if rest.is_empty() { Some(".") } else { Some(rest) };
        }
    }

    if is_path_like(spec) || is_bare_tarball(spec) {
        Some(spec)
    } else {
        None
    }
}

/// `pkg.tgz`, `vendor/foo-1.0.0.tar.gz`: a tarball named without a path prefix.
/// Anything with a protocol (`https:`, `npm:`, `github:`) is not.
fn is_bare_tarball(spec: &str) -> bool {
    let lower = spec.to_ascii_lowercase();
    !spec.contains(':')
        && !spec.contains('#')
        && TARBALL_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

fn is_path_like(spec: &str) -> bool {
    if spec == "." || spec == ".." {
        return true;
    }
    if ["./", "../", "/", "~/", ".\\", "..\\"]
        .iter()
        .any(|p| spec.starts_with(p))
    {
        return true;
    }

    // Windows drive paths: C:\ or C:/
    let bytes = spec.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Resolve `.` and `..` without touching the filesystem
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
