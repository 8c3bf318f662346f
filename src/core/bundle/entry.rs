use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::downloader::DownloadTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Content carried by the manifest itself; rewritten on every run.
    InlineContent,
    /// Fetched from `url`; downloaded only when absent or stale.
    RemoteFile,
}

/// What an entry is for. Drives native extraction and executable bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    Library,
    Native,
    Asset,
    AssetIndex,
    Java,
    Client,
    VersionJson,
    Extra,
}

/// One file required by the installation, relative to the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub kind: EntryKind,
    pub sha1: Option<String>,
    pub size: Option<u64>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub category: EntryCategory,
    #[serde(default)]
    pub executable: bool,
}

impl ManifestEntry {
    pub fn remote(
        path: impl Into<String>,
        url: impl Into<String>,
        sha1: Option<String>,
        size: Option<u64>,
        category: EntryCategory,
    ) -> Self {
        Self {
            path: normalize(path.into()),
            kind: EntryKind::RemoteFile,
            sha1,
            size,
            url: Some(url.into()),
            content: None,
            category,
            executable: false,
        }
    }

    pub fn inline(
        path: impl Into<String>,
        content: impl Into<String>,
        category: EntryCategory,
    ) -> Self {
        Self {
            path: normalize(path.into()),
            kind: EntryKind::InlineContent,
            sha1: None,
            size: None,
            url: None,
            content: Some(content.into()),
            category,
            executable: false,
        }
    }

    pub fn executable(mut self, executable: bool) -> Self {
        self.executable = executable;
        self
    }

    pub fn is_inline(&self) -> bool {
        self.kind == EntryKind::InlineContent
    }

    pub fn absolute_path(&self, root: &Path) -> PathBuf {
        root.join(&self.path)
    }

    /// Path stays below the root once joined.
    pub fn is_contained(&self) -> bool {
        safe_relative(&self.path).is_some()
    }

    /// Download task for this entry. `None` for inline entries or entries
    /// without a URL.
    pub fn to_download_task(&self, root: &Path) -> Option<DownloadTask> {
        if self.is_inline() || !self.is_contained() {
            return None;
        }
        let url = self.url.clone()?;
        let destination_path = self.absolute_path(root);
        let destination_folder = destination_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());

        Some(DownloadTask {
            url,
            destination_path,
            destination_folder,
            expected_size: self.size,
            label: self.path.clone(),
        })
    }
}

/// Relative path made only of plain names. `..`, roots and drive prefixes
/// are refused.
pub fn safe_relative(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    (path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_))))
    .then(|| path.to_path_buf())
}

/// Drop entries whose path would land outside the root. Returns how many
/// were dropped.
pub fn retain_contained(entries: &mut Vec<ManifestEntry>) -> usize {
    let before = entries.len();
    entries.retain(|entry| {
        let keep = entry.is_contained();
        if !keep {
            warn!("Rejecting manifest path outside the root: {:?}", entry.path);
        }
        keep
    });
    before - entries.len()
}

/// Manifest paths always use forward slashes and never start with one.
fn normalize(path: String) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}
