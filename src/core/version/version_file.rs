// ─── Version File ───
// Parses a Mojang version JSON and turns it into manifest entries.

use serde::Deserialize;
use tracing::{debug, info};

use super::library::{LibraryEntry, LibraryRecord};
use super::rules::{rules_allow, LibraryRule};
use crate::core::bundle::{EntryCategory, ManifestEntry};
use crate::core::error::LauncherResult;
use crate::core::http::fetch_text;

/// A fully parsed Mojang version JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    pub main_class: String,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub major_version: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<serde_json::Value>,
    #[serde(default)]
    pub jvm: Vec<serde_json::Value>,
}

impl Arguments {
    /// Rule-filtered game arguments.
    pub fn game_values(&self) -> Vec<String> {
        self.game.iter().flat_map(extract_argument_values).collect()
    }

    pub fn jvm_values(&self) -> Vec<String> {
        self.jvm.iter().flat_map(extract_argument_values).collect()
    }
}

/// Default runtime component for versions that predate `javaVersion`.
pub const LEGACY_JAVA_COMPONENT: &str = "jre-legacy";

impl VersionJson {
    /// Fetch and parse a version JSON, keeping the raw text for the inline entry.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<(Self, String)> {
        let raw = fetch_text(client, url).await?;
        let version_json: VersionJson = serde_json::from_str(&raw)?;
        Ok((version_json, raw))
    }

    pub fn java_component(&self) -> &str {
        self.java_version
            .as_ref()
            .and_then(|j| j.component.as_deref())
            .unwrap_or(LEGACY_JAVA_COMPONENT)
    }

    /// Every library allowed on this platform, resolved to downloads.
    pub fn library_records(&self) -> Vec<LibraryRecord> {
        let records: Vec<LibraryRecord> =
            self.libraries.iter().flat_map(LibraryEntry::records).collect();
        debug!(
            "Version {}: {} libraries, {} records for this platform",
            self.id,
            self.libraries.len(),
            records.len()
        );
        records
    }

    pub fn client_jar_path(&self) -> String {
        format!("versions/{0}/{0}.jar", self.id)
    }

    pub fn json_path(&self) -> String {
        format!("versions/{0}/{0}.json", self.id)
    }

    pub fn natives_path(&self) -> String {
        format!("versions/{}/natives", self.id)
    }

    /// Library, client jar and version JSON entries. `raw` becomes the inline
    /// content of `versions/<id>/<id>.json`.
    pub fn manifest_entries(&self, raw: &str) -> Vec<ManifestEntry> {
        let mut entries: Vec<ManifestEntry> = self
            .library_records()
            .iter()
            .map(|r| r.to_manifest_entry("libraries"))
            .collect();

        if let Some(client) = self.downloads.as_ref().and_then(|d| d.client.as_ref()) {
            entries.push(ManifestEntry::remote(
                self.client_jar_path(),
                client.url.clone(),
                Some(client.sha1.clone()),
                Some(client.size),
                EntryCategory::Client,
            ));
        }
        entries.push(ManifestEntry::inline(
            self.json_path(),
            raw,
            EntryCategory::VersionJson,
        ));

        info!("Version {} contributes {} manifest entries", self.id, entries.len());
        entries
    }

    /// Game arguments with platform rules applied. Falls back to the legacy
    /// space-separated `minecraftArguments`.
    pub fn simple_game_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.game_values(),
            None => match &self.minecraft_arguments {
                Some(s) => s.split_whitespace().map(|s| s.to_string()).collect(),
                None => vec![],
            },
        }
    }

    pub fn simple_jvm_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.jvm_values(),
            None => vec![],
        }
    }
}

fn extract_argument_values(value: &serde_json::Value) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(rules) = obj.get("rules") {
        let rules: Vec<LibraryRule> = serde_json::from_value(rules.clone()).unwrap_or_default();
        if !rules_allow(Some(&rules)) {
            return vec![];
        }
    }

    match obj.get("value") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::EntryKind;
    use crate::core::version::rules::current_os_name;

    fn sample() -> (VersionJson, String) {
        let value = serde_json::json!({
            "id": "1.20.1",
            "mainClass": "net.minecraft.client.main.Main",
            "assetIndex": { "id": "5", "url": "https://x/5.json", "totalSize": 100 },
            "downloads": { "client": { "sha1": "c1", "size": 20, "url": "https://x/client.jar" } },
            "javaVersion": { "component": "java-runtime-gamma", "majorVersion": 17 },
            "libraries": [
                { "name": "com.mojang:brigadier:1.1.8", "downloads": { "artifact": {
                    "path": "com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar",
                    "sha1": "b1", "size": 7, "url": "https://x/brigadier.jar" } } },
                { "name": "ca.weblite:java-objc-bridge:1.1", "rules": [
                    { "action": "allow", "os": { "name": "some-other-os" } } ],
                  "downloads": { "artifact": { "path": "ca/w.jar", "sha1": "w", "size": 1, "url": "https://x/w.jar" } } }
            ],
            "arguments": {
                "game": [
                    "--username", "${auth_player_name}",
                    { "rules": [{ "action": "allow", "features": { "is_demo_user": true } }], "value": "--demo" }
                ],
                "jvm": [
                    { "rules": [{ "action": "allow", "os": { "name": current_os_name() } }], "value": ["-Dos=1"] },
                    "-cp", "${classpath}"
                ]
            }
        });
        let raw = value.to_string();
        (serde_json::from_value(value).unwrap(), raw)
    }

    #[test]
    fn manifest_entries_cover_libraries_client_and_json() {
        let (version, raw) = sample();
        let entries = version.manifest_entries(&raw);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, "libraries/com/mojang/brigadier/1.1.8/brigadier-1.1.8.jar");
        assert_eq!(entries[1].path, "versions/1.20.1/1.20.1.jar");
        assert_eq!(entries[1].sha1.as_deref(), Some("c1"));
        assert_eq!(entries[2].kind, EntryKind::InlineContent);
        assert_eq!(entries[2].content.as_deref(), Some(raw.as_str()));
        assert_eq!(version.java_component(), "java-runtime-gamma");
    }

    #[test]
    fn argument_rules_apply() {
        let (version, _) = sample();
        assert_eq!(version.simple_game_args(), vec!["--username", "${auth_player_name}"]);
        assert_eq!(version.simple_jvm_args(), vec!["-Dos=1", "-cp", "${classpath}"]);
    }

    #[test]
    fn legacy_arguments_and_component_default() {
        let version: VersionJson = serde_json::from_value(serde_json::json!({
            "id": "1.7.10",
            "mainClass": "net.minecraft.client.main.Main",
            "minecraftArguments": "--username ${auth_player_name} --version ${version_name}"
        }))
        .unwrap();
        assert_eq!(version.simple_game_args().len(), 4);
        assert_eq!(version.java_component(), LEGACY_JAVA_COMPONENT);
    }
}
