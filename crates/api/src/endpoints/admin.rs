//! Admin endpoints.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use content_poll_common::{AppError, AppResult};
use content_poll_core::{
    AggregateResult, AnalyticsOverview, OrphanPoll, PollActivity, PollAttributes,
    PostsSummaryRow, validate_poll_id,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{extractors::AdminAuth, middleware::AppState};

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

/// Listing limit query.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

impl LimitQuery {
    fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Purge request. `confirm` must repeat the poll identifier.
#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub confirm: String,
}

/// Purge response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub rows_deleted: u64,
}

/// Per-post poll detail.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPollsResponse {
    pub post_id: i64,
    pub total_votes: u64,
    pub polls: Vec<PollActivity>,
    pub attributes: BTreeMap<String, PollAttributes>,
}

async fn posts_summary(
    _: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PostsSummaryRow>>> {
    Ok(Json(state.analytics.posts_summary().await?))
}

async fn overview(
    _: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<Json<AnalyticsOverview>> {
    Ok(Json(state.analytics.overview().await?))
}

async fn orphans(
    _: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<OrphanPoll>>> {
    Ok(Json(state.analytics.find_orphans().await?))
}

async fn top_polls(
    _: AdminAuth,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<PollActivity>>> {
    Ok(Json(state.analytics.top_polls(query.limit()).await?))
}

async fn recent_activity(
    _: AdminAuth,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<PollActivity>>> {
    Ok(Json(state.analytics.recent_activity(query.limit()).await?))
}

async fn poll_breakdown(
    _: AdminAuth,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<Json<AggregateResult>> {
    validate_poll_id(&poll_id)?;
    Ok(Json(state.analytics.poll_breakdown(&poll_id).await))
}

/// Delete every vote for a poll.
async fn purge_poll(
    _: AdminAuth,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Json(req): Json<PurgeRequest>,
) -> AppResult<Json<PurgeResponse>> {
    validate_poll_id(&poll_id)?;
    if req.confirm != poll_id {
        return Err(AppError::BadRequest(
            "confirm must match the poll identifier".to_string(),
        ));
    }

    let rows_deleted = state.analytics.delete_block_votes(&poll_id).await?;
    info!(poll_id = %poll_id, rows = rows_deleted, "Admin purged poll votes");
    Ok(Json(PurgeResponse { rows_deleted }))
}

async fn post_polls(
    _: AdminAuth,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<PostPollsResponse>> {
    let total_votes = state.analytics.post_total_votes(post_id).await?;
    let polls = state.analytics.post_poll_totals(post_id).await?;
    let attributes = state.analytics.post_poll_attributes(post_id).await?;
    Ok(Json(PostPollsResponse {
        post_id,
        total_votes,
        polls,
        attributes,
    }))
}

/// Host notification that a post was saved.
async fn content_saved(
    _: AdminAuth,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.analytics.on_content_saved(post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts-summary", get(posts_summary))
        .route("/overview", get(overview))
        .route("/orphans", get(orphans))
        .route("/top-polls", get(top_polls))
        .route("/recent-activity", get(recent_activity))
        .route("/polls/{poll_id}", get(poll_breakdown).delete(purge_poll))
        .route("/posts/{post_id}/polls", get(post_polls))
        .route("/posts/{post_id}/saved", post(content_saved))
}
