//! Request handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/data` | Reports inside a polygon and time window, enriched |
//! | `GET` | `/api/all-data` | Raw stored reports |
//! | `GET` | `/api/recent` | One page of recent activity |
//! | `GET` | `/api/recent/stream` | NDJSON stream of recent activity |
//! | `GET` | `/api/health` | Liveness probe |

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use futures::stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::api::state::AppState;
use crate::errors::MonitorError;
use crate::models::{PositionReport, ResolvedObject};
use crate::pagination::{PageRequest, PageResult};
use crate::query::SpatialQuery;
use crate::snapshot::Snapshot;
use crate::stream::{StreamEvent, StreamOptions, StreamingSession};

/// Page size of `/api/data` when the client gives none
pub const DEFAULT_SPATIAL_PAGE_SIZE: u32 = 500;
/// Page size of `/api/all-data` when the client gives none
pub const DEFAULT_LISTING_PAGE_SIZE: u32 = 200;

const NDJSON: &str = "application/x-ndjson";
const STREAM_BUFFER: usize = 8;

/// Query parameters of `GET /api/data`
///
/// Everything is taken as text so that bad values become our own
/// validation errors instead of extractor rejections.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialParams {
    pub polygon: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub page_size: Option<String>,
}

impl SpatialParams {
    fn page_request(&self, default_size: u32) -> PageRequest {
        let size = self.limit.as_deref().or(self.page_size.as_deref());
        PageRequest::from_params(self.page.as_deref(), size, default_size)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamParams {
    pub interval: Option<String>,
    pub limit: Option<String>,
    pub total_limit: Option<String>,
}

fn log_failure(route: &str, e: &MonitorError) {
    if e.is_client_error() {
        warn!("{} rejected: {}", route, e);
    } else {
        error!("{} failed: {:?}", route, e);
    }
}

pub async fn get_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SpatialParams>,
) -> Result<Json<PageResult<ResolvedObject>>, MonitorError> {
    let page = params.page_request(DEFAULT_SPATIAL_PAGE_SIZE);
    let query = SpatialQuery {
        polygon: params.polygon.as_deref(),
        start_date: params.start_date.as_deref(),
        end_date: params.end_date.as_deref(),
    };

    let result = state
        .engine
        .spatial_query(&query, page, Utc::now())
        .await
        .inspect_err(|e| log_failure("Spatial query", e))?;

    info!(
        "Spatial query returned {} of {} reports (page {} of {})",
        result.items.len(),
        result.pagination.total,
        result.pagination.page,
        result.pagination.total_pages
    );
    Ok(Json(result))
}

pub async fn get_all_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingParams>,
) -> Result<Json<PageResult<PositionReport>>, MonitorError> {
    let page = PageRequest::from_params(
        params.page.as_deref(),
        params.limit.as_deref(),
        DEFAULT_LISTING_PAGE_SIZE,
    );

    let result = state
        .engine
        .list_positions(page)
        .await
        .inspect_err(|e| log_failure("Listing", e))?;

    Ok(Json(result))
}

/// One page of recent activity
///
/// Store failures are not errors here: the response carries no pagination,
/// meaning "temporarily unavailable" rather than "no activity".
pub async fn get_recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingParams>,
) -> Json<Snapshot> {
    let page = PageRequest::from_params(
        params.page.as_deref(),
        params.limit.as_deref(),
        state.stream.default_page_size,
    );
    Json(state.snapshotter.snapshot(page, Utc::now()).await)
}

/// Open a recent activity stream for this client
///
/// The session runs on its own task and ends when the response body is
/// dropped, which happens as soon as the client disconnects.
pub async fn recent_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    let options = StreamOptions::from_params(
        params.interval.as_deref(),
        params.limit.as_deref(),
        params.total_limit.as_deref(),
        &state.stream,
    );
    let session = StreamingSession::new(state.snapshotter.clone(), options);

    let (tx, rx) = mpsc::channel::<StreamEvent>(STREAM_BUFFER);
    tokio::spawn(session.run(tx, state.shutdown.clone()));

    let lines = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let line = event.to_ndjson().unwrap_or_else(|e| {
            error!("Failed to serialize stream event: {}", e);
            let fallback = StreamEvent::error(&MonitorError::SerdeError(e), event.timestamp);
            serde_json::to_string(&fallback).unwrap_or_default() + "\n"
        });
        Some((Ok::<_, Infallible>(line), rx))
    });

    (
        [
            (header::CONTENT_TYPE, NDJSON),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(lines),
    )
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_wins_over_page_size() {
        let params = SpatialParams {
            limit: Some("20".to_string()),
            page_size: Some("30".to_string()),
            ..Default::default()
        };
        assert_eq!(params.page_request(DEFAULT_SPATIAL_PAGE_SIZE).page_size(), 20);

        let params = SpatialParams {
            page_size: Some("30".to_string()),
            ..Default::default()
        };
        assert_eq!(params.page_request(DEFAULT_SPATIAL_PAGE_SIZE).page_size(), 30);
    }

    #[test]
    fn default_page_sizes() {
        let params = SpatialParams::default();
        let page = params.page_request(DEFAULT_SPATIAL_PAGE_SIZE);
        assert_eq!(page.page(), 1);
        assert_eq!(page.page_size(), 500);
    }
}
