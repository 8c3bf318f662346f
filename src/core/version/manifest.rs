// ─── Version Manifest ───
// Handles fetching and parsing the Mojang version manifest v2.

use serde::Deserialize;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_json;

/// Top-level Mojang version manifest.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        info!("Fetching Minecraft version manifest...");
        let manifest: VersionManifest = fetch_json(client, url).await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Resolve an id or alias (`latest_release`/`r`, `latest_snapshot`/`s`).
    pub fn resolve(&self, requested: &str) -> LauncherResult<&VersionEntry> {
        let id = match requested {
            "latest_release" | "r" | "lr" => self.latest.release.as_str(),
            "latest_snapshot" | "s" | "ls" => self.latest.snapshot.as_str(),
            other => other,
        };

        self.versions
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| LauncherError::VersionNotFound {
                requested: requested.to_string(),
                available: self.releases().map(|v| v.id.clone()).collect(),
            })
    }

    /// All official stable versions (release only).
    pub fn releases(&self) -> impl Iterator<Item = &VersionEntry> {
        self.versions.iter().filter(|v| v.version_type == "release")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> VersionManifest {
        serde_json::from_value(serde_json::json!({
            "latest": { "release": "1.20.4", "snapshot": "24w03a" },
            "versions": [
                { "id": "24w03a", "type": "snapshot", "url": "https://x/24w03a.json" },
                { "id": "1.20.4", "type": "release", "url": "https://x/1.20.4.json", "sha1": "abc" },
                { "id": "1.20.1", "type": "release", "url": "https://x/1.20.1.json" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn aliases_follow_latest_block() {
        let m = manifest();
        assert_eq!(m.resolve("latest_release").unwrap().id, "1.20.4");
        assert_eq!(m.resolve("r").unwrap().id, "1.20.4");
        assert_eq!(m.resolve("latest_snapshot").unwrap().id, "24w03a");
        assert_eq!(m.resolve("1.20.1").unwrap().url, "https://x/1.20.1.json");
    }

    #[test]
    fn unknown_version_lists_releases() {
        let err = manifest().resolve("1.99").unwrap_err();
        match err {
            LauncherError::VersionNotFound { available, .. } => {
                assert_eq!(available, vec!["1.20.4", "1.20.1"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
