//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use std::io::Write;
use url::Url;

use super::retry::{MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, check_retryable};

/// A fetched text document together with the URL it was finally served from
/// (after redirects), which is the base for resolving relative links.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub body: String,
}

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Performs a GET request and returns the response body as text.
    /// Automatically retries on transient errors.
    #[tracing::instrument(skip(self))]
    pub async fn get_page(&self, url: &str) -> Result<Page> {
        debug!("GET page {}...", url);

        self.with_retry("GET page", || async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", url))?;

            let response = response.error_for_status().map_err(check_retryable)?;
            let final_url = response.url().clone();

            let body = response
                .text()
                .await
                .with_context(|| format!("Failed to read response body from {}", url))?;

            Ok(Page {
                url: final_url,
                body,
            })
        })
        .await
    }

    /// Downloads a file from a URL into the writer returned by `create_writer`.
    /// Automatically retries on transient errors; the writer is recreated for
    /// every attempt.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        self.with_retry("Download", || self.download_file_once(url, &create_writer))
            .await
    }

    /// Single download attempt without retry.
    async fn download_file_once<W, F>(&self, url: &str, create_writer: &F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to start download request for {}", url))?;

        let mut response = response.error_for_status().map_err(check_retryable)?;

        let mut writer = create_writer().map_err(|e| local_io(e, url))?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")
                .map_err(|e| local_io(e, url))?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer
            .flush()
            .context("Failed to flush downloaded file")
            .map_err(|e| local_io(e, url))?;

        debug!(
            "Downloaded {:.2} MB from {}",
            downloaded_bytes as f64 / (1024.0 * 1024.0),
            url
        );

        Ok(downloaded_bytes)
    }

    /// Executes an async operation with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_retryable_error(&e) {
                        debug!("{}: non-retryable error: {}", operation_name, e);
                        return Err(e);
                    }

                    if attempt < MAX_RETRIES {
                        warn!(
                            "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                            operation_name, attempt, MAX_RETRIES, e, RETRY_DELAY_MS
                        );
                        tokio::time::sleep(std::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("{}: failed after {} attempts", operation_name, MAX_RETRIES)
        }))
    }
}

/// Marks a failure on the local side of a download, which another attempt cannot fix.
fn local_io(error: anyhow::Error, url: &str) -> anyhow::Error {
    error.context(NonRetryableError::LocalIo(url.to_string()))
}

/// Checks if an anyhow::Error is retryable based on its content.
fn is_retryable_error(e: &anyhow::Error) -> bool {
    // Everything that isn't explicitly non-retryable gets another attempt
    e.downcast_ref::<NonRetryableError>().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_get_page_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/simple")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/simple/pkg-a/">pkg-a</a>"#)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let page = client.get_page(&format!("{}/simple", url)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.body, r#"<a href="/simple/pkg-a/">pkg-a</a>"#);
        assert_eq!(page.url.path(), "/simple");
    }

    #[tokio::test]
    async fn test_get_page_follows_redirect() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _redirect = server
            .mock("GET", "/simple/pkg-a")
            .with_status(301)
            .with_header("location", &format!("{}/simple/pkg-a/", url))
            .create_async()
            .await;
        let _page = server
            .mock("GET", "/simple/pkg-a/")
            .with_status(200)
            .with_body("listing")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let page = client
            .get_page(&format!("{}/simple/pkg-a", url))
            .await
            .unwrap();

        assert_eq!(page.body, "listing");
        assert_eq!(page.url.path(), "/simple/pkg-a/");
    }

    #[tokio::test]
    async fn test_get_page_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/simple/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result = client.get_page(&format!("{}/simple/missing", url)).await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<NonRetryableError>().is_some());
    }

    #[tokio::test]
    async fn test_download_file_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/files/pkg_a-1.0.tar.gz")
            .with_status(200)
            .with_body("test content")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let bytes = client
            .download_file(&format!("{}/files/pkg_a-1.0.tar.gz", url), || {
                Ok(std::io::sink())
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 12); // "test content" is 12 bytes
    }

    #[tokio::test]
    async fn test_download_file_not_found_never_creates_writer() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/files/missing.whl")
            .with_status(404)
            .create_async()
            .await;

        let created = Arc::new(AtomicUsize::new(0));
        let created_clone = created.clone();

        let client = HttpClient::new(Client::new());
        let result = client
            .download_file(&format!("{}/files/missing.whl", url), || {
                created_clone.fetch_add(1, Ordering::SeqCst);
                Ok(std::io::sink())
            })
            .await;

        mock.assert_async().await;
        assert!(result.is_err());
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_file_local_create_failure_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/files/pkg_a-1.0.whl")
            .with_status(200)
            .with_body("wheel")
            .expect(1)
            .create_async()
            .await;

        let created = Arc::new(AtomicUsize::new(0));
        let created_clone = created.clone();

        let client = HttpClient::new(Client::new());
        let err = client
            .download_file(&format!("{}/files/pkg_a-1.0.whl", url), || {
                created_clone.fetch_add(1, Ordering::SeqCst);
                Err::<std::io::Sink, _>(anyhow::anyhow!("Permission denied"))
            })
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err.downcast_ref::<NonRetryableError>(),
            Some(NonRetryableError::LocalIo(_))
        ));
        assert!(format!("{:#}", err).contains("Permission denied"));
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("No space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_download_file_local_write_failure_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/files/pkg_a-1.0.whl")
            .with_status(200)
            .with_body("wheel")
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let err = client
            .download_file(&format!("{}/files/pkg_a-1.0.whl", url), || Ok(FullDisk))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(err.downcast_ref::<NonRetryableError>().is_some());
    }

    #[test]
    fn test_is_retryable_error() {
        let err = anyhow::Error::from(NonRetryableError::NotFound("test".to_string()));
        assert!(!is_retryable_error(&err));

        let err = anyhow::anyhow!("connection reset by peer");
        assert!(is_retryable_error(&err));

        let err = anyhow::anyhow!("operation timed out");
        assert!(is_retryable_error(&err));
    }

    #[tokio::test]
    async fn test_with_retry_immediate_failure_on_non_retryable() {
        let client = HttpClient::new(Client::new());
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let result = client
            .with_retry("test", || {
                let count = call_count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::Error::from(NonRetryableError::NotFound(
                        "not found".to_string(),
                    )))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_retries_on_network_error() {
        let client = HttpClient::new(Client::new());
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let result = client
            .with_retry("test", || {
                let count = call_count_clone.clone();
                async move {
                    let current = count.fetch_add(1, Ordering::SeqCst);
                    if current < 2 {
                        Err::<&str, _>(anyhow::anyhow!("connection reset"))
                    } else {
                        Ok("success after retries")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success after retries");
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_retries() {
        let client = HttpClient::new(Client::new());
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let result = client
            .with_retry("test", || {
                let count = call_count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::anyhow!("connection timeout"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), MAX_RETRIES);
    }
}
