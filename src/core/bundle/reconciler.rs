// ─── Bundle Reconciler ───
// Diffs the required manifest against the local tree and prunes leftovers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::entry::{EntryKind, ManifestEntry};
use super::hash::sha1_file;
use crate::core::config::SyncConfig;
use crate::core::error::{LauncherError, LauncherResult};

/// Top-level directories under the root that pruning never touches.
const PROTECTED_DIRS: [&str; 2] = ["loader", "runtime"];

pub struct BundleReconciler {
    root: PathBuf,
    /// Instance directory when one is configured, otherwise the root.
    scope: PathBuf,
    scoped_to_instance: bool,
    ignored: Vec<String>,
}

impl BundleReconciler {
    pub fn new(root: impl Into<PathBuf>, instance: Option<&str>, ignored: Vec<String>) -> Self {
        let root = root.into();
        let (scope, scoped_to_instance) = match instance {
            Some(name) => (root.join("instances").join(name), true),
            None => (root.clone(), false),
        };
        let ignored = ignored
            .into_iter()
            .map(|p| p.replace('\\', "/").trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            root,
            scope,
            scoped_to_instance,
            ignored,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.root.clone(),
            config.instance.as_deref(),
            config.ignored.clone(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes inline entries and returns the remote entries that must be
    /// downloaded (absent, or present with a different SHA-1).
    #[instrument(skip_all, fields(entries = manifest.len()))]
    pub async fn reconcile(&self, manifest: &[ManifestEntry]) -> LauncherResult<Vec<ManifestEntry>> {
        let mut missing = Vec::new();

        for entry in manifest {
            if !entry.is_contained() {
                warn!("Skipping manifest path outside the root: {:?}", entry.path);
                continue;
            }
            let path = entry.absolute_path(&self.root);

            match entry.kind {
                EntryKind::InlineContent => {
                    self.write_inline(entry, &path).await?;
                }
                EntryKind::RemoteFile => {
                    let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
                    if exists && self.is_ignored(&path) {
                        debug!("Ignored, keeping local copy: {}", entry.path);
                        continue;
                    }
                    if needs_download(entry, &path, exists).await {
                        missing.push(entry.clone());
                    }
                }
            }
        }

        info!(
            "Reconciled {} entries: {} to download ({} bytes)",
            manifest.len(),
            missing.len(),
            Self::total_size(&missing)
        );
        Ok(missing)
    }

    async fn write_inline(&self, entry: &ManifestEntry, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        let content = entry.content.as_deref().unwrap_or_default();
        tokio::fs::write(path, content)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }

    /// Sum of the declared sizes; undeclared sizes count as zero.
    pub fn total_size(entries: &[ManifestEntry]) -> u64 {
        entries.iter().filter_map(|e| e.size).sum()
    }

    /// Delete every file (and empty directory) under the scope that the
    /// manifest does not reference. Best effort: failures are logged only.
    #[instrument(skip_all, fields(scope = %self.scope.display()))]
    pub async fn prune(&self, manifest: &[ManifestEntry]) -> Vec<PathBuf> {
        let referenced: HashSet<PathBuf> = manifest
            .iter()
            .map(|e| e.absolute_path(&self.root))
            .collect();

        let scope = self.scope.clone();
        let protected = self.protected_roots();
        let ignored: Vec<PathBuf> = self.ignored.iter().map(|i| scope.join(i)).collect();

        let result = tokio::task::spawn_blocking(move || {
            prune_blocking(&scope, &referenced, &protected, &ignored)
        })
        .await;

        match result {
            Ok(removed) => {
                info!("Pruned {} unreferenced paths", removed.len());
                removed
            }
            Err(e) => {
                warn!("Prune task failed: {}", e);
                Vec::new()
            }
        }
    }

    fn protected_roots(&self) -> Vec<PathBuf> {
        let mut protected: Vec<PathBuf> =
            PROTECTED_DIRS.iter().map(|d| self.root.join(d)).collect();
        if !self.scoped_to_instance {
            protected.push(self.root.join("instances"));
        }
        protected
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.scope) else {
            return false;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.ignored.iter().any(|ig| {
            relative == *ig
                || relative
                    .strip_prefix(ig.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

async fn needs_download(entry: &ManifestEntry, path: &Path, exists: bool) -> bool {
    if !exists {
        return true;
    }
    let Some(expected) = entry.sha1.as_deref() else {
        return false;
    };

    match sha1_file(path).await {
        Ok(actual) => !actual.eq_ignore_ascii_case(expected),
        Err(e) => {
            warn!("Cannot hash {:?}, scheduling re-download: {}", path, e);
            true
        }
    }
}

fn prune_blocking(
    scope: &Path,
    referenced: &HashSet<PathBuf>,
    protected: &[PathBuf],
    ignored: &[PathBuf],
) -> Vec<PathBuf> {
    if !scope.is_dir() {
        return Vec::new();
    }

    let shielded = |path: &Path| {
        protected.iter().any(|p| path.starts_with(p)) || ignored.iter().any(|i| path.starts_with(i))
    };

    let mut leaves = Vec::new();
    let walker = WalkDir::new(scope)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !shielded(e.path()));
    for entry in walker.flatten() {
        let path = entry.path();
        let is_leaf = if entry.file_type().is_dir() {
            is_empty_dir(path)
        } else {
            true
        };
        if is_leaf && !referenced.contains(path) {
            leaves.push(path.to_path_buf());
        }
    }

    let mut removed = Vec::new();
    for leaf in leaves {
        let outcome = if leaf.is_dir() {
            std::fs::remove_dir(&leaf)
        } else {
            std::fs::remove_file(&leaf)
        };
        match outcome {
            Ok(()) => {
                debug!("Pruned {:?}", leaf);
                removed.push(leaf.clone());
                remove_empty_ancestors(&leaf, scope);
            }
            Err(e) => warn!("Cannot prune {:?}: {}", leaf, e),
        }
    }
    removed
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut it| it.next().is_none())
        .unwrap_or(false)
}

/// Climb from `path` towards `stop`, removing directories left empty.
fn remove_empty_ancestors(path: &Path, stop: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) || !is_empty_dir(dir) {
            break;
        }
        if std::fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}
