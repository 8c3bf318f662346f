use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::core::error::{LauncherError, LauncherResult};

const APP_USER_AGENT: &str = "InterfaceOficial/0.1.0";

/// Shared client. Identity encoding keeps `Content-Length` equal to the bytes
/// we write, which the progress counters rely on.
pub fn build_http_client(connect_timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(connect_timeout)
        .build()
}

/// GET a URL and decode it as JSON, mapping non-2xx to `DownloadFailed`.
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> LauncherResult<T> {
    let text = fetch_text(client, url).await?;
    Ok(serde_json::from_str(&text)?)
}

pub async fn fetch_text(client: &Client, url: &str) -> LauncherResult<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LauncherError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}
