//! Payload retrieval.

use std::time::Duration;

use keepsake_common::CancelFlag;

/// Retrieves the raw payload behind a download URL.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, cancel: &CancelFlag) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Download cancelled")]
    Cancelled,

    #[error("Failed to build HTTP client: {source}")]
    Client { source: reqwest::Error },

    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Server answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body from {url}: {source}")]
    Body { url: String, source: reqwest::Error },
}

/// Blocking HTTP GET fetcher.
///
/// Must be created and dropped outside of an async runtime context.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// `timeout` bounds each request as a whole; `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("keepsake/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Client { source })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, cancel: &CancelFlag) -> Result<Vec<u8>, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        tracing::trace!(url, bytes = body.len(), "Fetched payload");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_fetch_skips_network() {
        let fetcher = HttpFetcher::new(Some(Duration::from_secs(1))).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = fetcher.fetch("http://192.0.2.1/never", &cancel).unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
    }

    #[test]
    fn test_invalid_url_is_a_request_error() {
        let fetcher = HttpFetcher::new(None).unwrap();
        let err = fetcher.fetch("not a url", &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }

    #[test]
    fn test_status_error_message() {
        let err = FetchError::Status {
            url: "https://example.com/x".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "Server answered 404 for https://example.com/x");
    }
}
