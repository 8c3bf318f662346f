use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// A single file to fetch, derived from a manifest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    pub url: String,
    pub destination_path: PathBuf,
    pub destination_folder: PathBuf,
    pub expected_size: Option<u64>,
    /// Shown in progress events (usually the manifest path).
    pub label: String,
}

/// Answer to a metadata-only probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlInfo {
    pub size: Option<u64>,
    pub status: u16,
}

/// Mirror hit returned by [`Downloader::check_mirror`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorHit {
    pub url: String,
    pub size: Option<u64>,
}

/// Streaming downloader with a per-request stall timeout.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    timeout: Duration,
}

impl Downloader {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ── Single file download ────────────────────────────

    /// Download `url` into `folder/filename`, creating the folder. Returns the
    /// number of bytes written.
    pub async fn fetch_one(&self, url: &str, folder: &Path, filename: &str) -> LauncherResult<u64> {
        let dest = folder.join(filename);
        self.stream_to_file(url, &dest, |_| {}).await
    }

    /// Stream the body into `<dest>.part`, reporting every chunk, then move it
    /// into place. A partial file never sits at `dest`.
    pub(crate) async fn stream_to_file<F>(
        &self,
        url: &str,
        dest: &Path,
        mut on_chunk: F,
    ) -> LauncherResult<u64>
    where
        F: FnMut(u64),
    {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| LauncherError::Timeout {
                url: url.to_string(),
            })??;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let part = part_path(dest);
        let written = match self.write_body(url, response, &part, &mut on_chunk).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }

    async fn write_body<F>(
        &self,
        url: &str,
        response: reqwest::Response,
        part: &Path,
        on_chunk: &mut F,
    ) -> LauncherResult<u64>
    where
        F: FnMut(u64),
    {
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| LauncherError::io(part, e))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        loop {
            let next = tokio::time::timeout(self.timeout, stream.next())
                .await
                .map_err(|_| LauncherError::Timeout {
                    url: url.to_string(),
                })?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(part, e))?;
            written += chunk.len() as u64;
            on_chunk(chunk.len() as u64);
        }

        file.flush().await.map_err(|e| LauncherError::io(part, e))?;
        Ok(written)
    }

    // ── Probes ──────────────────────────────────────────

    /// HEAD probe. `None` when the request itself fails (DNS, refused, timeout).
    pub async fn check_url(&self, url: &str) -> Option<UrlInfo> {
        let response = tokio::time::timeout(self.timeout, self.client.head(url).send())
            .await
            .ok()?
            .ok()?;

        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        Some(UrlInfo {
            size,
            status: response.status().as_u16(),
        })
    }

    /// Try `<mirror>/<relative_path>` in declared order; first 200 wins.
    pub async fn check_mirror(&self, relative_path: &str, mirrors: &[String]) -> Option<MirrorHit> {
        let relative_path = relative_path.trim_start_matches('/');
        for mirror in mirrors {
            let url = format!("{}/{}", mirror.trim_end_matches('/'), relative_path);
            match self.check_url(&url).await {
                Some(info) if info.status == 200 => {
                    return Some(MirrorHit {
                        url,
                        size: info.size,
                    })
                }
                _ => debug!("Mirror miss: {}", url),
            }
        }
        None
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::build_http_client;
    use crate::core::test_support::{Route, TestServer};

    fn downloader() -> Downloader {
        let client = build_http_client(Duration::from_secs(5)).unwrap();
        Downloader::new(client, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn fetch_one_writes_file_and_returns_size() {
        let server = TestServer::start(vec![("/lib.jar", Route::ok(b"0123456789".to_vec()))]).await;
        let dir = tempfile::tempdir().unwrap();

        let size = downloader()
            .fetch_one(&server.url("/lib.jar"), &dir.path().join("a/b"), "lib.jar")
            .await
            .unwrap();

        assert_eq!(size, 10);
        assert_eq!(std::fs::read(dir.path().join("a/b/lib.jar")).unwrap(), b"0123456789");
        assert!(!dir.path().join("a/b/lib.jar.part").exists());
    }

    #[tokio::test]
    async fn fetch_one_reports_http_status() {
        let server = TestServer::start(vec![]).await;
        let dir = tempfile::tempdir().unwrap();

        let err = downloader()
            .fetch_one(&server.url("/missing.jar"), dir.path(), "missing.jar")
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::DownloadFailed { status: 404, .. }));
    }

    #[tokio::test]
    async fn stalled_response_times_out() {
        let server = TestServer::start(vec![(
            "/slow.jar",
            Route::ok(b"x".to_vec()).delayed(Duration::from_millis(600)),
        )])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let client = build_http_client(Duration::from_secs(5)).unwrap();
        let dl = Downloader::new(client, Duration::from_millis(100));

        let err = dl
            .fetch_one(&server.url("/slow.jar"), dir.path(), "slow.jar")
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Timeout { .. }));
    }

    #[tokio::test]
    async fn check_url_uses_head_and_reads_length() {
        let server = TestServer::start(vec![("/x.jar", Route::ok(vec![7u8; 42]))]).await;

        let info = downloader().check_url(&server.url("/x.jar")).await.unwrap();
        assert_eq!(info, UrlInfo { size: Some(42), status: 200 });
        assert_eq!(server.hits("HEAD", "/x.jar"), 1);
        assert_eq!(server.hits("GET", "/x.jar"), 0);
    }

    #[tokio::test]
    async fn check_mirror_keeps_declared_order() {
        let first = TestServer::start(vec![]).await;
        let second = TestServer::start(vec![("/repo/a/b/1/b-1.jar", Route::ok(vec![1; 5]))]).await;
        let third = TestServer::start(vec![("/repo/a/b/1/b-1.jar", Route::ok(vec![1; 9]))]).await;
        let mirrors = vec![first.url("/repo"), second.url("/repo/"), third.url("/repo")];

        let hit = downloader()
            .check_mirror("a/b/1/b-1.jar", &mirrors)
            .await
            .unwrap();
        assert_eq!(hit.url, second.url("/repo/a/b/1/b-1.jar"));
        assert_eq!(hit.size, Some(5));
        assert_eq!(third.hits("HEAD", "/repo/a/b/1/b-1.jar"), 0);

        assert!(downloader()
            .check_mirror("nope.jar", &mirrors[..1])
            .await
            .is_none());
    }
}
