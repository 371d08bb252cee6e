//! Share helpers: QR image URLs and short links.
//!
//! Both are thin wrappers around third-party services. Nothing here is
//! needed to open or edit a document.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";
const QR_SIZE: &str = "250x250";
const SHORTEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Image URL of a QR code pointing at `full_link`.
pub fn qr_url(full_link: &str) -> String {
    format!(
        "{QR_ENDPOINT}?size={QR_SIZE}&data={}",
        urlencoding::encode(full_link)
    )
}

/// The proxy answers with JSON; TinyURL answers with the bare URL.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyResponse {
    short_url: String,
}

/// Ask `shortener` for a short form of `full_link`.
///
/// # Errors
///
/// Fails on network errors, timeouts, non-success status, or an empty
/// response.
pub async fn shorten(http: &reqwest::Client, shortener: &str, full_link: &str) -> Result<String> {
    let url = format!("{shortener}?url={}", urlencoding::encode(full_link));
    let resp = http
        .get(&url)
        .timeout(SHORTEN_TIMEOUT)
        .send()
        .await
        .context("shortener request failed")?;

    let status = resp.status();
    let body = resp.text().await.context("failed to read shortener response")?;
    if !status.is_success() {
        bail!("shortener returned {status}");
    }
    parse_short_link(&body)
}

fn parse_short_link(body: &str) -> Result<String> {
    let body = body.trim();
    let short = match serde_json::from_str::<ProxyResponse>(body) {
        Ok(proxy) => proxy.short_url,
        Err(_) => body.to_owned(),
    };
    if !short.starts_with("http") {
        bail!("shortener returned an unexpected response");
    }
    Ok(short)
}
