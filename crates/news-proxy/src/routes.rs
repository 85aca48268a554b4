//! Axum router for the news proxy.
//!
//! - `GET /search?query=<text>[&method=rss]` returns `{"results": [...]}`; any other
//!   method value, or none, searches Google
//! - `OPTIONS /search` answers browser preflight with 204
//! - `GET /health` returns `ok`
//!
//! Every response carries permissive CORS headers so a browser front end on
//! any origin can call the proxy.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use shared::{NewsAdapter, SearchMethod, SearchResponse};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ServerError;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: Option<String>,
    method: Option<String>,
}

pub fn build(adapter: Arc<NewsAdapter>) -> Router {
    Router::new()
        .route("/search", get(search).options(preflight))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .with_state(adapter)
}

async fn search(
    State(adapter): State<Arc<NewsAdapter>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ServerError> {
    let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let method = params
        .method
        .as_deref()
        .map(SearchMethod::from_param)
        .unwrap_or_default();
    let query = params.query.unwrap_or_default();

    let results = adapter.fetch_sources(&query, method).await?;
    info!(query = %query.trim(), %method, count = results.len(), "search served");

    Ok(Json(SearchResponse { results }))
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn health() -> &'static str {
    "ok"
}
