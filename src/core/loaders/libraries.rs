// ─── Loader Libraries ───
// Turns a loader's merged library list into download tasks and classpath
// entries under the loader's own libraries directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::context::InstallContext;
use crate::core::downloader::DownloadTask;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::LibraryEntry;

/// What the driver still has to fetch, plus every jar the loader runs with.
#[derive(Debug, Default)]
pub struct LibraryPlan {
    pub tasks: Vec<DownloadTask>,
    pub total_size: u64,
    /// Absolute paths, in profile order.
    pub classpath: Vec<PathBuf>,
}

enum Source {
    /// Already on disk, or produced locally by the installer.
    Local,
    Remote { url: String, size: Option<u64> },
}

/// Library declares an artifact with an empty URL: a processor builds it.
fn produced_locally(lib: &LibraryEntry) -> bool {
    lib.downloads
        .as_ref()
        .and_then(|d| d.artifact.as_ref())
        .is_some_and(|a| a.url.is_some() && a.download_url().is_none())
}

fn is_core(lib: &LibraryEntry, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| lib.name.starts_with(p))
}

/// Mirror first, then the declared URL. `LibraryUnresolvable` if neither.
///
/// With `skip_core`, core loader artifacts without a URL are assumed to have
/// been extracted from the installer already.
pub async fn resolve_libraries(
    ctx: &InstallContext<'_>,
    libraries: &[&LibraryEntry],
    skip_core: bool,
    core_prefixes: &[&str],
) -> LauncherResult<LibraryPlan> {
    let libs_dir = ctx.libraries_dir();
    let allowed: Vec<&LibraryEntry> = libraries
        .iter()
        .copied()
        .filter(|lib| lib.is_allowed())
        .collect();
    let total = allowed.len();
    let mut plan = LibraryPlan::default();

    for (i, lib) in allowed.into_iter().enumerate() {
        ctx.ensure_not_cancelled("library resolution")?;
        ctx.events.check(i + 1, total, &lib.name);

        let Some(relative) = lib.artifact_path() else {
            debug!("Skipping library without a Maven path: {}", lib.name);
            continue;
        };
        let destination = to_local(&libs_dir, &relative);
        plan.classpath.push(destination.clone());

        if skip_core && is_core(lib, core_prefixes) && lib.declared_url().is_none() {
            debug!("Core artifact already extracted: {}", lib.name);
            continue;
        }

        match pick_source(ctx, lib, &relative, &destination).await? {
            Source::Local => {}
            Source::Remote { url, size } => {
                plan.total_size += size.unwrap_or(0);
                plan.tasks.push(DownloadTask {
                    url,
                    destination_folder: destination
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| libs_dir.clone()),
                    destination_path: destination,
                    expected_size: size,
                    label: lib.name.clone(),
                });
            }
        }
    }

    info!(
        "{} libraries: {} on classpath, {} to download ({} bytes)",
        ctx.request.loader_type.display_name(),
        plan.classpath.len(),
        plan.tasks.len(),
        plan.total_size
    );
    Ok(plan)
}

async fn pick_source(
    ctx: &InstallContext<'_>,
    lib: &LibraryEntry,
    relative: &str,
    destination: &Path,
) -> LauncherResult<Source> {
    if tokio::fs::try_exists(destination).await.unwrap_or(false) || produced_locally(lib) {
        return Ok(Source::Local);
    }

    if let Some(hit) = ctx.downloader.check_mirror(relative, ctx.mirrors).await {
        return Ok(Source::Remote {
            url: hit.url,
            size: hit.size,
        });
    }

    let Some(url) = lib.declared_url() else {
        return Err(LauncherError::LibraryUnresolvable(lib.name.clone()));
    };
    let declared_size = lib
        .downloads
        .as_ref()
        .and_then(|d| d.artifact.as_ref())
        .and_then(|a| a.size)
        .or(lib.size);
    let size = match declared_size {
        Some(size) => Some(size),
        None => ctx.downloader.check_url(&url).await.and_then(|info| info.size),
    };
    Ok(Source::Remote { url, size })
}

fn to_local(libs_dir: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(libs_dir.to_path_buf(), |acc, part| acc.join(part))
}
