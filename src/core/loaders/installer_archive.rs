// ─── Installer Archive ───
// Reads the install profile out of a Forge-family installer jar and lays its
// bundled artifacts into the loader's libraries directory.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use super::profile::InstallProfile;
use crate::core::archive::JarArchive;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventEmitter;
use crate::core::maven::MavenArtifact;

const INSTALL_PROFILE_ENTRY: &str = "install_profile.json";
const DEFAULT_VERSION_ENTRY: &str = "version.json";
const CLIENT_DATA_ENTRY: &str = "data/client.lzma";

/// Parse `install_profile.json`, in either dialect.
pub fn read_install_profile(archive: &mut JarArchive) -> LauncherResult<InstallProfile> {
    let raw: Value = serde_json::from_slice(&archive.read(INSTALL_PROFILE_ENTRY)?)?;
    if InstallProfile::is_legacy_document(&raw) {
        debug!("Legacy install profile in {:?}", archive.path());
        return InstallProfile::legacy(raw);
    }

    let version_entry = raw
        .get("json")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_VERSION_ENTRY)
        .to_string();
    let version_raw: Value = serde_json::from_slice(&archive.read(&version_entry)?)?;
    InstallProfile::modern(raw, version_raw)
}

/// Place the loader's universal artifact where the classpath expects it.
///
/// Returns the skip flag: `true` when the core artifacts came out of the
/// archive and must not be downloaded.
pub fn extract_universal(
    archive: &mut JarArchive,
    profile: &InstallProfile,
    libraries_dir: &Path,
    events: &EventEmitter,
) -> LauncherResult<bool> {
    let install = &profile.install;

    if let Some(file_path) = install.file_path.as_deref() {
        let Some(coord) = install.path.as_deref() else {
            return Err(LauncherError::Loader(format!(
                "installer declares {file_path} without a target coordinate"
            )));
        };
        let artifact = MavenArtifact::parse(coord)?;
        let target = artifact.path_in(libraries_dir);
        let bytes = archive.read(file_path)?;
        write_bytes(&target, &bytes)?;
        events.extract(format!("{file_path} -> {artifact}"));
        info!("Extracted universal jar {} to {:?}", file_path, target);
        return Ok(true);
    }

    if let Some(coord) = install.path.as_deref() {
        let artifact = MavenArtifact::parse(coord)?;
        let prefix = format!(
            "maven/{}/{}/{}/",
            artifact.group_path(),
            artifact.artifact_id,
            artifact.version
        );
        let entries = archive.read_prefix(&prefix)?;
        for (name, bytes) in &entries {
            let relative = &name["maven/".len()..];
            let target = relative
                .split('/')
                .fold(libraries_dir.to_path_buf(), |acc, part| acc.join(part));
            write_bytes(&target, bytes)?;
            events.extract(relative.to_string());
        }
        info!("Extracted {} bundled maven entries for {}", entries.len(), artifact);
        return Ok(true);
    }

    Ok(false)
}

/// Write the client binary patch next to the universal artifact. Only
/// meaningful when the profile has processors.
pub fn extract_client_data(
    archive: &mut JarArchive,
    profile: &InstallProfile,
    libraries_dir: &Path,
    universal_prefix: &str,
    events: &EventEmitter,
) -> LauncherResult<Option<std::path::PathBuf>> {
    if !profile.has_processors() {
        return Ok(None);
    }
    let Some(universal) = profile.universal_artifact(universal_prefix) else {
        debug!("No universal artifact under {}; no client data", universal_prefix);
        return Ok(None);
    };
    if !archive.contains(CLIENT_DATA_ENTRY) {
        debug!("{} has no {}", archive.path().display(), CLIENT_DATA_ENTRY);
        return Ok(None);
    }

    let target = universal.clientdata_path_in(libraries_dir);
    let bytes = archive.read(CLIENT_DATA_ENTRY)?;
    write_bytes(&target, &bytes)?;
    events.extract(format!("{CLIENT_DATA_ENTRY} -> {}", target.display()));
    Ok(Some(target))
}

fn write_bytes(target: &Path, bytes: &[u8]) -> LauncherResult<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
    }
    std::fs::write(target, bytes).map_err(|e| LauncherError::io(target, e))
}
