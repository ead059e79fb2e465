//! Publishable file listing
//!
//! Approximates the set of files a package manager would pack for a
//! directory:
//!
//! 1. Always-excluded entries (VCS metadata, `node_modules`, editor debris)
//!    are never listed.
//! 2. If the manifest declares `files`, only matching paths are listed.
//!    Otherwise `.npmignore` (or `.gitignore` when there is no `.npmignore`)
//!    excludes paths with gitignore-style rules.
//! 3. `package.json`, README/LICENSE/CHANGELOG files at the root and the
//!    `main` entry point are always listed.
//!
//! Ignore files are only read from the package root. Callers can exclude
//! specific paths (the install state file) that would otherwise change
//! between runs.

use crate::error::{LazyInstallError, LazyInstallResult};
use crate::fingerprint::manifest::PackageManifest;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const MANIFEST_FILE: &str = "package.json";

const ALWAYS_EXCLUDED: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "CVS",
    "node_modules",
    ".DS_Store",
    "npm-debug.log",
    ".npmrc",
    ".npmignore",
    ".gitignore",
    ".lock-wscript",
    "config.gypi",
    "package-lock.json",
    "*.orig",
    ".*.swp",
    "._*",
    ".wafpickle-*",
];

const ALWAYS_INCLUDED_PREFIXES: &[&str] = &["readme", "license", "licence", "changelog"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// List the publishable files under `dir`, sorted, skipping any path in
/// `exclude`
pub async fn list_files(dir: &Path, exclude: &[PathBuf]) -> LazyInstallResult<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(dir).await.map_err(|e| {
        LazyInstallError::io(format!("reading local dependency {}", dir.display()), e)
    })?;
    if !metadata.is_dir() {
        return Err(LazyInstallError::Internal(format!(
            "local dependency {} is not a directory",
            dir.display()
        )));
    }

    let label = dir.display().to_string();
    let manifest = PackageManifest::from_optional_file(&label, &dir.join(MANIFEST_FILE)).await?;
    let filter = match manifest.as_ref().and_then(|m| m.files.as_ref()) {
        Some(files) => Filter::AllowList(AllowList::new(files)),
        None => Filter::Ignore(read_ignore_rules(dir).await?),
    };
    let main = manifest
        .as_ref()
        .and_then(|m| m.main.as_deref())
        .map(|m| strip_relative(m).to_string());

    let root = dir.to_path_buf();
    let exclude = exclude.to_vec();
    let files = tokio::task::spawn_blocking(move || walk(&root, &filter, main.as_deref(), &exclude))
        .await
        .map_err(|e| LazyInstallError::Internal(format!("file listing task failed: {}", e)))??;

    debug!("{} publishable files in {}", files.len(), label);
    Ok(files)
}

async fn read_ignore_rules(dir: &Path) -> LazyInstallResult<IgnoreRules> {
    for name in [".npmignore", ".gitignore"] {
        let path = dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => return Ok(IgnoreRules::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(LazyInstallError::io(
                    format!("reading ignore file {}", path.display()),
                    e,
                ))
            }
        }
    }
    Ok(IgnoreRules::default())
}

fn walk(
    root: &Path,
    filter: &Filter,
    main: Option<&str>,
    exclude: &[PathBuf],
) -> LazyInstallResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !is_always_excluded(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let context = format!("listing files in {}", root.display());
            match e.into_io_error() {
                Some(io) => LazyInstallError::io(context, io),
                None => LazyInstallError::Internal(context),
            }
        })?;
        if !entry.file_type().is_file() || exclude.iter().any(|p| p == entry.path()) {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = to_slash(rel);

        if is_always_included(&rel, main) || filter.includes(&rel) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn is_always_excluded(name: &str) -> bool {
    ALWAYS_EXCLUDED.iter().any(|pattern| {
        if pattern.contains('*') {
            Pattern::new(pattern).is_ok_and(|p| p.matches_with(name, MATCH_OPTIONS))
        } else {
            *pattern == name
        }
    })
}

fn is_always_included(rel: &str, main: Option<&str>) -> bool {
    if main == Some(rel) {
        return true;
    }
    if rel.contains('/') {
        return false;
    }
    if rel == MANIFEST_FILE {
        return true;
    }
    let lower = rel.to_ascii_lowercase();
    ALWAYS_INCLUDED_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_relative(path: &str) -> &str {
    let mut path = path.trim();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.trim_start_matches('/').trim_end_matches('/')
}

/// Ancestor directories of a slash path, outermost first ("a", "a/b")
fn ancestors(rel: &str) -> impl Iterator<Item = &str> {
    rel.match_indices('/').map(move |(i, _)| &rel[..i])
}

enum Filter {
    AllowList(AllowList),
    Ignore(IgnoreRules),
}

impl Filter {
    fn includes(&self, rel: &str) -> bool {
        match self {
            Self::AllowList(allow) => allow.includes(rel),
            Self::Ignore(rules) => !rules.is_ignored(rel),
        }
    }
}

/// The manifest's `files` field
struct AllowList {
    patterns: Vec<Pattern>,
}

impl AllowList {
    fn new(entries: &[String]) -> Self {
        let patterns = entries
            .iter()
            .map(|e| strip_relative(e))
            .filter(|e| !e.is_empty())
            .filter_map(|e| Pattern::new(e).ok())
            .collect();
        Self { patterns }
    }

    /// A file is allowed if it, or any directory containing it, matches
    fn includes(&self, rel: &str) -> bool {
        self.patterns.iter().any(|p| {
            p.matches_with(rel, MATCH_OPTIONS)
                || ancestors(rel).any(|dir| p.matches_with(dir, MATCH_OPTIONS))
        })
    }
}

#[derive(Debug)]
struct IgnoreRule {
    pattern: Pattern,
    negated: bool,
    dir_only: bool,
    anchored: bool,
}

impl IgnoreRule {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (negated, line) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line.strip_prefix('\\').unwrap_or(line)),
        };
        let (dir_only, line) = match line.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let (leading_slash, line) = match line.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        if line.is_empty() {
            return None;
        }

        Some(Self {
            pattern: Pattern::new(line).ok()?,
            negated,
            dir_only,
            anchored: leading_slash || line.contains('/'),
        })
    }

    fn matches_segment(&self, path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        let candidate = if self.anchored {
            path
        } else {
            path.rsplit('/').next().unwrap_or(path)
        };
        self.pattern.matches_with(candidate, MATCH_OPTIONS)
    }

    /// Whether the rule matches the file itself or any directory above it
    fn matches(&self, rel: &str) -> bool {
        ancestors(rel).any(|dir| self.matches_segment(dir, true)) || self.matches_segment(rel, false)
    }
}

/// gitignore-style exclusion rules; the last matching rule wins
#[derive(Debug, Default)]
struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    fn parse(content: &str) -> Self {
        Self {
            rules: content.lines().filter_map(IgnoreRule::parse).collect(),
        }
    }

    fn is_ignored(&self, rel: &str) -> bool {
        let mut ignored = false;
        for rule in &self.rules {
            if rule.matches(rel) {
                ignored = !rule.negated;
            }
        }
        ignored
    }
}
