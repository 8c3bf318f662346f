// ─── Java Runtime ───
// Resolves a Mojang-managed Java runtime component into manifest entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::core::bundle::{EntryCategory, ManifestEntry};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_json;

/// `all.json`: platform → component → builds.
type RuntimeIndex = BTreeMap<String, BTreeMap<String, Vec<RuntimeBuild>>>;

#[derive(Debug, Deserialize)]
struct RuntimeBuild {
    manifest: RuntimeManifestRef,
}

#[derive(Debug, Deserialize)]
struct RuntimeManifestRef {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ComponentManifest {
    files: BTreeMap<String, RuntimeFile>,
}

#[derive(Debug, Deserialize)]
struct RuntimeFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    executable: bool,
    #[serde(default)]
    downloads: Option<RuntimeDownloads>,
}

#[derive(Debug, Deserialize)]
struct RuntimeDownloads {
    raw: RawDownload,
}

#[derive(Debug, Deserialize)]
struct RawDownload {
    sha1: String,
    size: u64,
    url: String,
}

/// A runtime component ready to be reconciled.
#[derive(Debug, Clone)]
pub struct JavaRuntime {
    pub component: String,
    pub platform: String,
    pub entries: Vec<ManifestEntry>,
    /// Absolute path of the java binary once installed.
    pub java_path: PathBuf,
}

/// Platform key used by the runtime index.
pub fn runtime_platform() -> &'static str {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("windows", "x86") => "windows-x86",
        ("windows", "aarch64") => "windows-arm64",
        ("windows", _) => "windows-x64",
        ("macos", "aarch64") => "mac-os-arm64",
        ("macos", _) => "mac-os",
        (_, "x86") => "linux-i386",
        _ => "linux",
    }
}

fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

#[instrument(skip(client, root))]
pub async fn resolve_runtime(
    client: &reqwest::Client,
    index_url: &str,
    component: &str,
    platform: &str,
    root: &Path,
) -> LauncherResult<JavaRuntime> {
    let index: RuntimeIndex = fetch_json(client, index_url).await?;
    let manifest_url = manifest_url_for(&index, platform, component)?;
    let manifest: ComponentManifest = fetch_json(client, &manifest_url).await?;

    let runtime = runtime_from_manifest(manifest, component, platform, root);
    info!(
        "Java runtime {} ({}): {} files",
        component,
        platform,
        runtime.entries.len()
    );
    Ok(runtime)
}

fn manifest_url_for(index: &RuntimeIndex, platform: &str, component: &str) -> LauncherResult<String> {
    let components = index.get(platform);
    components
        .and_then(|c| c.get(component))
        .and_then(|builds| builds.first())
        .map(|b| b.manifest.url.clone())
        .ok_or_else(|| LauncherError::VersionNotFound {
            requested: format!("{component} for {platform}"),
            available: components
                .map(|c| {
                    c.iter()
                        .filter(|(_, builds)| !builds.is_empty())
                        .map(|(name, _)| name.clone())
                        .collect()
                })
                .unwrap_or_default(),
        })
}

fn runtime_from_manifest(
    manifest: ComponentManifest,
    component: &str,
    platform: &str,
    root: &Path,
) -> JavaRuntime {
    let base = format!("runtime/{component}-{platform}");
    let suffix = format!("bin/{}", java_exe());

    let mut java_rel: Option<String> = None;
    let mut entries = Vec::new();
    for (path, file) in manifest.files {
        if file.kind != "file" {
            continue;
        }
        let Some(downloads) = file.downloads else {
            debug!("Runtime file without downloads: {}", path);
            continue;
        };
        if path.ends_with(&suffix)
            && java_rel.as_ref().map_or(true, |current| path.len() < current.len())
        {
            java_rel = Some(path.clone());
        }
        entries.push(
            ManifestEntry::remote(
                format!("{base}/{path}"),
                downloads.raw.url,
                Some(downloads.raw.sha1),
                Some(downloads.raw.size),
                EntryCategory::Java,
            )
            .executable(file.executable),
        );
    }

    let java_rel = java_rel.unwrap_or(suffix);
    JavaRuntime {
        component: component.to_string(),
        platform: platform.to_string(),
        entries,
        java_path: root.join(base).join(java_rel),
    }
}

/// Restore the executable bit on runtime files after download.
pub async fn apply_executable_bits(root: &Path, entries: &[ManifestEntry]) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        for entry in entries.iter().filter(|e| e.executable) {
            let path = entry.absolute_path(root);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(|e| LauncherError::io(&path, e))?;
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (root, entries);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{Route, TestServer};

    #[tokio::test]
    async fn resolves_component_files_for_platform() {
        let server = TestServer::start(vec![]).await;
        server.set(
            "/all.json",
            Route::json(&serde_json::json!({
                "linux": {
                    "java-runtime-gamma": [ { "manifest": { "url": server.url("/gamma.json") } } ],
                    "jre-legacy": []
                }
            })),
        );
        server.set(
            "/gamma.json",
            Route::json(&serde_json::json!({ "files": {
                "bin": { "type": "directory" },
                "bin/java": { "type": "file", "executable": true,
                    "downloads": { "raw": { "sha1": "j", "size": 8, "url": "https://cdn/java" } } },
                "lib/rt.jar": { "type": "file", "executable": false,
                    "downloads": { "raw": { "sha1": "r", "size": 4, "url": "https://cdn/rt" } } },
                "legal/link": { "type": "link", "target": "../x" }
            } })),
        );

        let root = Path::new("/games");
        let runtime = resolve_runtime(
            &reqwest::Client::new(),
            &server.url("/all.json"),
            "java-runtime-gamma",
            "linux",
            root,
        )
        .await
        .unwrap();

        assert_eq!(runtime.entries.len(), 2);
        let java = &runtime.entries[0];
        assert_eq!(java.path, "runtime/java-runtime-gamma-linux/bin/java");
        assert!(java.executable);
        assert!(!runtime.entries[1].executable);
        if !cfg!(windows) {
            assert_eq!(
                runtime.java_path,
                PathBuf::from("/games/runtime/java-runtime-gamma-linux/bin/java")
            );
        }

        let err = resolve_runtime(
            &reqwest::Client::new(),
            &server.url("/all.json"),
            "jre-legacy",
            "linux",
            root,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LauncherError::VersionNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn executable_bits_are_restored() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let entry = ManifestEntry::remote("runtime/x/bin/java", "https://x", None, None, EntryCategory::Java)
            .executable(true);
        let path = entry.absolute_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"#!/bin/sh").unwrap();

        apply_executable_bits(dir.path(), &[entry]).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
