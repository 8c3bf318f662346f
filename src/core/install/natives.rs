// ─── Native Extraction ───
// Unpacks classifier jars into versions/<id>/natives.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::archive::JarArchive;
use crate::core::bundle::{safe_relative, EntryCategory, ManifestEntry};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventEmitter;

/// Extract every `Native` entry's archive into `natives_dir`. The directory
/// is recreated from scratch. Returns the number of files written.
pub async fn extract_natives(
    root: &Path,
    natives_dir: &Path,
    entries: &[ManifestEntry],
    events: &EventEmitter,
) -> LauncherResult<usize> {
    // Clean previous session
    if tokio::fs::try_exists(natives_dir).await.unwrap_or(false) {
        let _ = tokio::fs::remove_dir_all(natives_dir).await;
    }
    tokio::fs::create_dir_all(natives_dir)
        .await
        .map_err(|e| LauncherError::io(natives_dir, e))?;

    let jars: Vec<PathBuf> = entries
        .iter()
        .filter(|e| e.category == EntryCategory::Native)
        .map(|e| e.absolute_path(root))
        .collect();

    let mut written = 0;
    for jar in jars {
        if !tokio::fs::try_exists(&jar).await.unwrap_or(false) {
            warn!("Native archive missing, skipping: {:?}", jar);
            continue;
        }
        let dest = natives_dir.to_path_buf();
        let source = jar.clone();
        let count = tokio::task::spawn_blocking(move || unpack(&source, &dest))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))??;
        events.extract(format!("Extracted {} natives from {}", count, file_label(&jar)));
        written += count;
    }

    debug!("Natives ready in {:?} ({} files)", natives_dir, written);
    Ok(written)
}

fn unpack(jar: &Path, dest: &Path) -> LauncherResult<usize> {
    let mut archive = JarArchive::open(jar)?;
    let mut count = 0;
    for name in archive.entry_names() {
        if name.ends_with('/') || name.starts_with("META-INF/") {
            continue;
        }
        let Some(relative) = safe_relative(&name) else {
            warn!("Skipping suspicious native entry {:?} in {:?}", name, jar);
            continue;
        };

        let bytes = archive.read(&name)?;
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        std::fs::write(&target, bytes).map_err(|e| LauncherError::io(&target, e))?;
        count += 1;
    }
    Ok(count)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
