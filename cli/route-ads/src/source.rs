//! Policy document retrieval.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors fetching a policy document.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unsupported policy location {0:?}")]
    UnsupportedLocation(String),

    #[error("failed to read policy file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch policy from {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("policy server {url} answered with status {status}")]
    Status { url: String, status: u16 },
}

/// Where the policy document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    File(PathBuf),
    Http(String),
}

impl PolicySource {
    /// Interprets a location string.
    ///
    /// `http://` and `https://` URLs are fetched; `file://` URLs and bare
    /// paths are read from disk. Other schemes are rejected.
    pub fn parse(location: &str) -> Result<Self, SourceError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(SourceError::UnsupportedLocation(location.to_string()));
        }

        if let Some(path) = location.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            return Ok(Self::Http(location.to_string()));
        }
        if location.contains("://") {
            return Err(SourceError::UnsupportedLocation(location.to_string()));
        }
        Ok(Self::File(PathBuf::from(location)))
    }

    /// Reads the whole document.
    pub async fn fetch(&self, timeout: Duration) -> Result<String, SourceError> {
        match self {
            Self::File(path) => {
                tracing::debug!(path = %path.display(), "reading policy file");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SourceError::Read {
                        path: path.clone(),
                        source,
                    })
            }
            Self::Http(url) => fetch_http(url, timeout).await,
        }
    }
}

async fn fetch_http(url: &str, timeout: Duration) -> Result<String, SourceError> {
    let http = |source| SourceError::Http {
        url: url.to_string(),
        source,
    };

    tracing::debug!(url, timeout_secs = timeout.as_secs(), "fetching policy");
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(http)?;
    let response = client.get(url).send().await.map_err(http)?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(http)
}

impl fmt::Display for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Http(url) => f.write_str(url),
        }
    }
}
