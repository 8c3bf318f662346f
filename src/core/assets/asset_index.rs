use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::bundle::{safe_relative, EntryCategory, ManifestEntry};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_text;
use crate::core::version::AssetIndexInfo;

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
    /// Pre-1.7 indexes: objects are also laid out by name under `assets/virtual/legacy`.
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    /// Pre-1.6 indexes: objects are copied into `<instance>/resources`.
    #[serde(default)]
    pub map_to_resources: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    /// `assets/objects/<hash[0:2]>/<hash>`
    pub fn object_path(&self) -> String {
        format!("assets/objects/{}/{}", &self.hash[..2.min(self.hash.len())], self.hash)
    }
}

/// Manages Minecraft asset resolution (sounds, textures referenced by the asset index).
pub struct AssetManager;

impl AssetManager {
    /// Download and parse the asset index, keeping the raw text.
    pub async fn fetch_index(
        client: &reqwest::Client,
        info: &AssetIndexInfo,
    ) -> LauncherResult<(AssetIndex, String)> {
        let raw = fetch_text(client, &info.url).await?;
        let index: AssetIndex = serde_json::from_str(&raw)?;
        info!(
            "Asset index {}: {} objects (virtual={}, map_to_resources={})",
            info.id,
            index.objects.len(),
            index.is_virtual,
            index.map_to_resources
        );
        Ok((index, raw))
    }

    /// The index itself (inline) plus one remote entry per distinct object.
    pub fn manifest_entries(
        info: &AssetIndexInfo,
        index: &AssetIndex,
        raw: &str,
        resources_url: &str,
    ) -> Vec<ManifestEntry> {
        let base = resources_url.trim_end_matches('/');
        let mut entries = vec![ManifestEntry::inline(
            format!("assets/indexes/{}.json", info.id),
            raw,
            EntryCategory::AssetIndex,
        )];

        let mut seen = HashSet::new();
        let mut objects: Vec<&AssetObject> = index.objects.values().collect();
        objects.sort_by(|a, b| a.hash.cmp(&b.hash));
        for object in objects {
            if object.hash.len() < 2 || !seen.insert(object.hash.as_str()) {
                continue;
            }
            entries.push(ManifestEntry::remote(
                object.object_path(),
                format!("{}/{}/{}", base, &object.hash[..2], object.hash),
                Some(object.hash.clone()),
                Some(object.size),
                EntryCategory::Asset,
            ));
        }
        entries
    }

    /// Copy objects to their by-name locations for legacy indexes. Existing
    /// copies are kept. Returns the number of files written.
    pub async fn copy_legacy_assets(
        root: &Path,
        instance_dir: &Path,
        index: &AssetIndex,
    ) -> LauncherResult<usize> {
        let target_base = if index.map_to_resources {
            instance_dir.join("resources")
        } else if index.is_virtual {
            root.join("assets").join("virtual").join("legacy")
        } else {
            return Ok(0);
        };

        let mut copied = 0;
        for (name, object) in &index.objects {
            let Some(relative) = safe_relative(name) else {
                warn!("Skipping legacy asset with unsafe name {:?}", name);
                continue;
            };
            let source = root.join(object.object_path());
            let target = target_base.join(relative);
            if tokio::fs::try_exists(&target).await.unwrap_or(false) {
                continue;
            }
            if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
                debug!("Legacy asset source missing: {:?}", source);
                continue;
            }
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LauncherError::io(parent, e))?;
            }
            tokio::fs::copy(&source, &target)
                .await
                .map_err(|e| LauncherError::io(&target, e))?;
            copied += 1;
        }

        info!("Copied {} legacy assets into {:?}", copied, target_base);
        Ok(copied)
    }
}
