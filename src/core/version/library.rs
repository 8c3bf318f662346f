// ─── Libraries ───
// Library entries as they appear in version JSONs and loader profiles, and
// the resolved records derived from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::rules::{arch_bits, current_os_name, rules_allow, LibraryRule};
use crate::core::bundle::{EntryCategory, ManifestEntry};
use crate::core::maven::MavenArtifact;

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<LibraryRule>>,
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    /// Repository base (Fabric-style libraries).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, LibDownloadArtifact>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    /// Forge writes `""` for artifacts produced locally by processors.
    #[serde(default)]
    pub url: Option<String>,
}

impl LibDownloadArtifact {
    pub fn download_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// A library resolved to a concrete download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRecord {
    pub name: String,
    pub url: String,
    pub size: Option<u64>,
    pub sha1: Option<String>,
    /// Relative to the libraries directory, forward slashes.
    pub local_path: String,
    pub is_native: bool,
}

impl LibraryRecord {
    pub fn to_manifest_entry(&self, libraries_prefix: &str) -> ManifestEntry {
        let category = if self.is_native {
            EntryCategory::Native
        } else {
            EntryCategory::Library
        };
        ManifestEntry::remote(
            format!("{}/{}", libraries_prefix.trim_end_matches('/'), self.local_path),
            self.url.clone(),
            self.sha1.clone(),
            self.size,
            category,
        )
    }
}

impl LibraryEntry {
    pub fn is_allowed(&self) -> bool {
        rules_allow(self.rules.as_deref())
    }

    /// Native classifier for this OS, with `${arch}` substituted.
    pub fn native_classifier(&self) -> Option<String> {
        let classifier = self.natives.as_ref()?.get(current_os_name())?;
        Some(classifier.replace("${arch}", arch_bits()))
    }

    pub fn artifact(&self) -> Option<MavenArtifact> {
        MavenArtifact::parse(&self.name).ok()
    }

    /// Path of the main artifact relative to the libraries directory.
    pub fn artifact_path(&self) -> Option<String> {
        self.downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.clone())
            .or_else(|| {
                self.artifact()
                    .map(|a| a.local_path().to_string_lossy().replace('\\', "/"))
            })
    }

    /// Declared direct download URL of the main artifact, if any.
    pub fn declared_url(&self) -> Option<String> {
        if let Some(url) = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.download_url())
        {
            return Some(url.to_string());
        }
        let base = self.url.as_deref().filter(|u| !u.trim().is_empty())?;
        Some(self.artifact()?.url(base))
    }

    /// Records for Mojang-style entries (`downloads.artifact` / `classifiers`).
    /// Disallowed entries yield nothing.
    pub fn records(&self) -> Vec<LibraryRecord> {
        if !self.is_allowed() {
            return Vec::new();
        }
        let Some(downloads) = &self.downloads else {
            return Vec::new();
        };

        let mut out = Vec::new();
        if let Some(artifact) = &downloads.artifact {
            if let (Some(url), Some(path)) = (artifact.download_url(), self.artifact_path()) {
                out.push(LibraryRecord {
                    name: self.name.clone(),
                    url: url.to_string(),
                    size: artifact.size,
                    sha1: artifact.sha1.clone(),
                    local_path: path,
                    is_native: false,
                });
            }
        }

        if let Some(classifier) = self.native_classifier() {
            let native = downloads
                .classifiers
                .as_ref()
                .and_then(|c| c.get(&classifier));
            if let Some(native) = native {
                let path = native.path.clone().or_else(|| {
                    let mut a = self.artifact()?;
                    a.classifier = Some(classifier.clone());
                    Some(a.local_path().to_string_lossy().replace('\\', "/"))
                });
                if let (Some(url), Some(path)) = (native.download_url(), path) {
                    out.push(LibraryRecord {
                        name: format!("{}:{}", self.name, classifier),
                        url: url.to_string(),
                        size: native.size,
                        sha1: native.sha1.clone(),
                        local_path: path,
                        is_native: true,
                    });
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_classifier_substitutes_arch() {
        let lib: LibraryEntry = serde_json::from_value(serde_json::json!({
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
            "natives": {
                "linux": "natives-linux-${arch}",
                "osx": "natives-osx-${arch}",
                "windows": "natives-windows-${arch}"
            },
            "downloads": {
                "classifiers": {
                    "natives-linux-64": { "path": "l/linux64.jar", "sha1": "a", "size": 1, "url": "https://x/l64" },
                    "natives-linux-32": { "path": "l/linux32.jar", "sha1": "b", "size": 1, "url": "https://x/l32" },
                    "natives-osx-64": { "path": "l/osx64.jar", "sha1": "c", "size": 1, "url": "https://x/o64" },
                    "natives-osx-32": { "path": "l/osx32.jar", "sha1": "c", "size": 1, "url": "https://x/o32" },
                    "natives-windows-64": { "path": "l/win64.jar", "sha1": "d", "size": 1, "url": "https://x/w64" },
                    "natives-windows-32": { "path": "l/win32.jar", "sha1": "d", "size": 1, "url": "https://x/w32" }
                }
            }
        }))
        .unwrap();

        let classifier = lib.native_classifier().unwrap();
        assert!(classifier.ends_with(arch_bits()));

        let records = lib.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_native);
        assert_eq!(
            records[0].to_manifest_entry("libraries").category,
            EntryCategory::Native
        );
    }

    #[test]
    fn empty_forge_url_is_not_downloadable() {
        let lib: LibraryEntry = serde_json::from_value(serde_json::json!({
            "name": "net.minecraftforge:forge:1.20.1-47.2.0:client",
            "downloads": { "artifact": {
                "path": "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar",
                "url": "", "sha1": "x", "size": 0
            } }
        }))
        .unwrap();
        assert!(lib.declared_url().is_none());
        assert!(lib.records().is_empty());
        assert_eq!(
            lib.artifact_path().unwrap(),
            "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar"
        );
    }

    #[test]
    fn fabric_style_url_is_a_repository_base() {
        let lib: LibraryEntry = serde_json::from_value(serde_json::json!({
            "name": "net.fabricmc:intermediary:1.20.1",
            "url": "https://maven.fabricmc.net/"
        }))
        .unwrap();
        assert_eq!(
            lib.declared_url().unwrap(),
            "https://maven.fabricmc.net/net/fabricmc/intermediary/1.20.1/intermediary-1.20.1.jar"
        );
    }
}
