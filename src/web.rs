//! HTTP trigger for the filler.
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::config::FillQuery;
use crate::error::FillError;
use crate::fill::{BatchOptions, Filler};

pub type AppState = Arc<Filler>;

pub fn router(filler: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/fill", get(fill_daily))
        .route("/api/fill/page", get(fill_page))
        .route("/api/fill/batch", get(fill_batch))
        .with_state(filler)
}

impl FillError {
    pub fn status(&self) -> StatusCode {
        match self {
            FillError::Unauthorized => StatusCode::UNAUTHORIZED,
            FillError::CardNotFound { .. } => StatusCode::NOT_FOUND,
            FillError::MissingVerseKey { .. }
            | FillError::InvalidIndex(_)
            | FillError::MissingParam(_) => StatusCode::BAD_REQUEST,
            FillError::MissingConfig(_) | FillError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for FillError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "fill failed");
        }
        (status, self.to_string()).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn fill_daily(
    State(filler): State<AppState>,
    Query(query): Query<FillQuery>,
) -> Result<impl IntoResponse, FillError> {
    let outcome = filler.handle(&query).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageQuery {
    key: Option<String>,
    page_id: Option<String>,
}

async fn fill_page(
    State(filler): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, FillError> {
    filler.authorize(query.key.as_deref())?;
    let page_id = query
        .page_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or(FillError::MissingParam("pageId"))?;
    let report = filler.fill_page(page_id).await?;
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchQuery {
    key: Option<String>,
    word_db_id: Option<String>,
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    empty_only: bool,
}

async fn fill_batch(
    State(filler): State<AppState>,
    Query(query): Query<BatchQuery>,
) -> Result<impl IntoResponse, FillError> {
    filler.authorize(query.key.as_deref())?;
    let options = BatchOptions {
        word_db_id: query.word_db_id,
        dry_run: query.dry_run,
        empty_only: query.empty_only,
    };
    let report = filler.fill_batch(&options).await?;
    Ok(Json(report))
}
