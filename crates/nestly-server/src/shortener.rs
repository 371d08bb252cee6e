//! Upstream URL shorteners.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("shortener request failed: {reason}")]
    Request { reason: String },

    #[error("shortener returned status {status}")]
    Status { status: u16 },

    #[error("shortener returned an unexpected body")]
    Malformed,
}

/// Something that turns a long URL into a short one.
#[async_trait]
pub trait Shortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenError>;
}

/// A TinyURL-style endpoint: `GET {endpoint}?url=...` answers with the short
/// URL as plain text.
pub struct HttpShortener {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpShortener {
    /// # Errors
    ///
    /// Returns `ShortenError::Request` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ShortenError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShortenError::Request {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Shortener for HttpShortener {
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenError> {
        let url = format!("{}?url={}", self.endpoint, urlencoding::encode(long_url));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ShortenError::Request {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ShortenError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| ShortenError::Request {
            reason: e.to_string(),
        })?;
        let short = body.trim();
        debug!(short, "upstream shortened link");
        parse_plain(short)
    }
}

fn parse_plain(body: &str) -> Result<String, ShortenError> {
    if body.starts_with("http://") || body.starts_with("https://") {
        Ok(body.to_owned())
    } else {
        Err(ShortenError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_url() {
        assert!(matches!(
            parse_plain("https://tinyurl.com/abc").as_deref(),
            Ok("https://tinyurl.com/abc")
        ));
    }

    #[test]
    fn rejects_error_text() {
        assert!(matches!(parse_plain("Error"), Err(ShortenError::Malformed)));
        assert!(matches!(parse_plain(""), Err(ShortenError::Malformed)));
    }
}
