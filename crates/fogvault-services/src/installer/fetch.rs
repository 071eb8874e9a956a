//! Artifact download.
//!
//! The response body is streamed chunk by chunk through a fixed-size write
//! buffer into a file named after the last URL path segment. The whole
//! transfer, headers included, is bounded by one timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{Result, ServiceError};

/// File name for an artifact URL: its last non-empty path segment.
pub fn file_name_from_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ServiceError::InvalidRequest(format!("invalid url '{raw}': {e}")))?;

    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .filter(|name| *name != "." && *name != "..")
        .map(str::to_owned)
        .ok_or_else(|| {
            ServiceError::InvalidRequest(format!("url '{raw}' does not name a file"))
        })
}

/// Downloads plugin artifacts.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: reqwest::Client,
    timeout: Duration,
    chunk_size: usize,
}

impl Fetcher {
    /// Create a fetcher with the given total timeout and write buffer size.
    pub fn new(timeout: Duration, chunk_size: usize) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            timeout,
            chunk_size,
        })
    }

    /// Download `url` into `dir`, returning the path of the written file.
    pub async fn fetch(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        let file_name = file_name_from_url(url)?;
        let dest = dir.join(&file_name);

        match tokio::time::timeout(self.timeout, self.download(url, &dest)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ServiceError::FetchTimeout {
                    url: url.to_owned(),
                });
            }
        }

        tracing::debug!(url, path = %dest.display(), "artifact downloaded");
        Ok(dest)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                ServiceError::FetchTimeout {
                    url: url.to_owned(),
                }
            } else {
                ServiceError::FetchFailed {
                    url: url.to_owned(),
                    reason: e.to_string(),
                }
            }
        };

        let mut response = self.http.get(url).send().await.map_err(map_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::FetchFailed {
                url: url.to_owned(),
                reason: format!("server responded with {status}"),
            });
        }

        let file = tokio::fs::File::create(dest).await?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        while let Some(chunk) = response.chunk().await.map_err(map_err)? {
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(
            file_name_from_url("http://host/a/b/fogvault-south-x.tar.gz").unwrap(),
            "fogvault-south-x.tar.gz"
        );
        assert_eq!(
            file_name_from_url("http://host/a/plugin.tar?token=1").unwrap(),
            "plugin.tar"
        );
        assert_eq!(file_name_from_url("http://host/a/plugin.tar/").unwrap(), "plugin.tar");
    }

    #[test]
    fn url_without_file_is_rejected() {
        assert!(matches!(
            file_name_from_url("http://host/"),
            Err(ServiceError::InvalidRequest(_))
        ));
        assert!(matches!(
            file_name_from_url("not a url"),
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn fetch_streams_body_to_file() {
        let mut server = mockito::Server::new_async().await;
        let body = vec![7u8; 5000];
        let mock = server
            .mock("GET", "/files/plugin.tar")
            .with_status(200)
            .with_body(&body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5), 1024).unwrap();
        let path = fetcher
            .fetch(&format!("{}/files/plugin.tar", server.url()), dir.path())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(path, dir.path().join("plugin.tar"));
        assert_eq!(std::fs::read(&path).unwrap(), body);
    }

    #[tokio::test]
    async fn client_timeout_is_applied() {
        use std::io::Write;

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/slow.tar")
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(500));
                w.write_all(b"late")
            })
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_millis(100), 1024).unwrap();
        let err = fetcher
            .fetch(&format!("{}/slow.tar", server.url()), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::FetchTimeout { .. } | ServiceError::FetchFailed { .. }
        ));
    }

    #[tokio::test]
    async fn http_error_is_fetch_failed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.tar")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5), 1024).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing.tar", server.url()), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::FetchFailed { .. }));
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn unreachable_host_is_fetch_failed() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5), 1024).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/plugin.tar", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::FetchFailed { .. } | ServiceError::FetchTimeout { .. }
        ));
    }
}
