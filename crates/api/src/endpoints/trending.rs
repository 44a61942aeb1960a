//! Trending events endpoint.

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use chrono::Utc;
use fedevents_common::AppError;
use fedevents_core::{TrendingEntry, Viewer};
use serde::Deserialize;

use crate::{extractors::MaybeAuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    window_days: Option<i64>,
    limit: Option<u64>,
}

async fn trending(
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<TrendingQuery>,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<TrendingEntry>>, AppError> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let viewer = viewer_id.map_or(Viewer::Anonymous, Viewer::User);
    let entries = state
        .trending_service
        .trending(viewer, query.window_days, query.limit, Utc::now())
        .await?;
    Ok(ApiResponse::ok(entries))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/trending", get(trending))
}
