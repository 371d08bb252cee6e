//! `GET /api/shorten?url=...`
//!
//! Only full Nestly links are forwarded, so the proxy cannot be used as a
//! general-purpose shortener.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use nestly_core::link::Link;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/shorten", get(shorten))
}

#[derive(Deserialize)]
struct ShortenParams {
    url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShortenResponse {
    short_url: String,
}

async fn shorten(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ShortenParams>,
) -> Result<Json<ShortenResponse>, AppError> {
    let url = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("URL is required".to_owned()))?;

    let link = nestly_link(url)
        .ok_or_else(|| AppError::BadRequest("URL is not a Nestly link".to_owned()))?;

    let short_url = state.shortener.shorten(url).await?;
    info!(tool = %link.tool(), "shortened link");
    Ok(Json(ShortenResponse { short_url }))
}

fn nestly_link(url: &str) -> Option<Link> {
    let is_http = url.starts_with("http://") || url.starts_with("https://");
    if !is_http || !url.contains('#') {
        return None;
    }
    Link::parse(url).ok()
}
