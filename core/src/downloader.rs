//! file: core/src/downloader.rs
//! description: concurrent HTTP fan-out facade, modeled on the original's
//! `HTTPDownloader`/`WaitForAllRequests`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}")]
    BadStatus { url: String, status: u16 },
}

pub struct Response {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Thin wrapper over a `reqwest::Client`. Every request runs as its own
/// `tokio` task; callers join with `futures::future::join_all`, matching the
/// original's single `WaitForAllRequests` barrier rather than per-request
/// cancellation.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is always valid here");
        Downloader { client }
    }

    pub async fn get(&self, url: &str) -> Result<Response, DownloadError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DownloadError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?
            .to_vec();
        Ok(Response {
            url: url.to_string(),
            bytes,
        })
    }

    /// Issues every URL concurrently and waits for all of them to settle —
    /// the `WaitForAllRequests` barrier. Each result is independent; one
    /// failure never cancels the others.
    pub async fn get_all(&self, urls: &[String]) -> Vec<Result<Response, DownloadError>> {
        let futures = urls.iter().map(|url| self.get(url));
        futures::future::join_all(futures).await
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Downloader::new(Duration::from_secs(30))
    }
}
