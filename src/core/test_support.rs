// ─── Test Support ───
// Minimal HTTP/1.1 server for exercising the network paths offline, plus a
// temp-dir fixture for the loader installers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::downloader::Downloader;
use crate::core::events::EventEmitter;
use crate::core::loaders::{BuildSelector, InstallContext, LoaderRequest, LoaderType};

#[derive(Debug, Clone)]
pub struct Route {
    status: u16,
    body: Vec<u8>,
    delay: Option<Duration>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self::ok(value.to_string())
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            delay: None,
        }
    }

    /// Hold the response back; the request counts as in flight meanwhile.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct State {
    routes: Mutex<HashMap<String, Route>>,
    hits: Mutex<HashMap<(String, String), usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

pub struct TestServer {
    base: String,
    state: Arc<State>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        Self::start_owned(
            routes
                .into_iter()
                .map(|(p, r)| (p.to_string(), r))
                .collect(),
        )
        .await
    }

    pub async fn start_owned(routes: Vec<(String, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(State::default());
        state.routes.lock().unwrap().extend(routes);

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self {
            base: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Add or replace a route after start (bodies that embed the server URL).
    pub fn set(&self, path: &str, route: Route) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), route);
    }

    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }

    /// Highest number of requests held at the same time.
    pub fn peak_connections(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, state: Arc<State>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let mut parts = head.lines().next().unwrap_or_default().split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    *state
        .hits
        .lock()
        .unwrap()
        .entry((method.clone(), path.clone()))
        .or_default() += 1;
    let route = state.routes.lock().unwrap().get(&path).cloned();
    let route = route.unwrap_or_else(|| Route::status(404));

    let now = state.active.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak.fetch_max(now, Ordering::SeqCst);
    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }
    state.active.fetch_sub(1, Ordering::SeqCst);

    let header = format!(
        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        route.body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    if method != "HEAD" {
        stream.write_all(&route.body).await?;
    }
    stream.shutdown().await
}

// ── Loader fixture ──────────────────────────────────────

/// Owns everything an [`InstallContext`] borrows, rooted in a temp dir.
pub struct LoaderFixture {
    pub dir: tempfile::TempDir,
    pub request: LoaderRequest,
    pub mirrors: Vec<String>,
    pub downloader: Downloader,
    pub events: EventEmitter,
    pub cancel: CancellationToken,
    pub strict_processors: bool,
}

impl LoaderFixture {
    pub fn new(loader_type: LoaderType, build: BuildSelector, events: EventEmitter) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let request = LoaderRequest {
            loader_type,
            minecraft_version: "1.20.1".into(),
            build,
            java_path: PathBuf::from("java"),
            minecraft_jar_path: dir.path().join("versions/1.20.1/1.20.1.jar"),
            minecraft_json_path: dir.path().join("versions/1.20.1/1.20.1.json"),
        };
        Self {
            dir,
            request,
            mirrors: Vec::new(),
            downloader: Downloader::new(reqwest::Client::new(), Duration::from_secs(5)),
            events,
            cancel: CancellationToken::new(),
            strict_processors: true,
        }
    }

    pub fn ctx(&self) -> InstallContext<'_> {
        InstallContext {
            request: &self.request,
            root: self.dir.path().to_path_buf(),
            loader_root: self
                .dir
                .path()
                .join("loader")
                .join(self.request.loader_type.to_string()),
            mirrors: &self.mirrors,
            downloader: &self.downloader,
            events: &self.events,
            cancel: &self.cancel,
            concurrency: 2,
            kill_grace: Duration::from_millis(200),
            strict_processors: self.strict_processors,
        }
    }
}

/// Executable `/bin/sh` script standing in for java. Processors see it as
/// `java -classpath <cp> <main> <args...>`.
#[cfg(unix)]
pub fn fake_java(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
