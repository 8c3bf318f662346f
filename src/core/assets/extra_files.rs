use serde::Deserialize;
use tracing::info;

use crate::core::bundle::{EntryCategory, ManifestEntry};
use crate::core::error::LauncherResult;
use crate::core::http::fetch_json;

/// One file served by the optional extra-files endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraFile {
    pub path: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

/// Fetch the extra-files list. Paths land under `instances/<name>/` when an
/// instance is configured, otherwise at the root.
pub async fn fetch_extra_files(
    client: &reqwest::Client,
    url: &str,
    instance: Option<&str>,
) -> LauncherResult<Vec<ManifestEntry>> {
    let files: Vec<ExtraFile> = fetch_json(client, url).await?;
    info!("Extra files endpoint listed {} files", files.len());
    Ok(extra_entries(files, instance))
}

fn extra_entries(files: Vec<ExtraFile>, instance: Option<&str>) -> Vec<ManifestEntry> {
    files
        .into_iter()
        .map(|f| {
            let relative = f.path.replace('\\', "/");
            let relative = relative.trim_start_matches('/');
            let path = match instance {
                Some(name) => format!("instances/{name}/{relative}"),
                None => relative.to_string(),
            };
            ManifestEntry::remote(path, f.url, f.sha1, f.size, EntryCategory::Extra)
        })
        .collect()
}
