//! Vote endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use content_poll_common::{AppError, AppResult, generate_token};
use content_poll_core::{MAX_POLL_ID_LEN, PollResults, validate_poll_id};
use serde::Deserialize;
use tracing::debug;

use crate::{extractors::VoterToken, middleware::AppState};

/// Shortest poll identifier accepted over HTTP.
pub const MIN_POLL_ID_LEN: usize = 8;

/// Vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_index: i64,
    #[serde(default)]
    pub post_id: i64,
}

fn check_poll_id(poll_id: &str) -> AppResult<()> {
    if !(MIN_POLL_ID_LEN..=MAX_POLL_ID_LEN).contains(&poll_id.len()) {
        return Err(AppError::InvalidPollId(poll_id.to_string()));
    }
    validate_poll_id(poll_id)
}

/// Record a vote, issuing the voter cookie on first use.
async fn vote(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    VoterToken(token): VoterToken,
    jar: CookieJar,
    Json(req): Json<VoteRequest>,
) -> AppResult<(CookieJar, Json<PollResults>)> {
    check_poll_id(&poll_id)?;

    let (raw, jar) = match token {
        Some(raw) => (raw, jar),
        None => {
            let raw = generate_token();
            debug!(poll_id = %poll_id, "Issuing voter cookie");
            let cookie = Cookie::build((state.cookie.name.clone(), raw.clone()))
                .http_only(true)
                .same_site(SameSite::Lax)
                .path("/")
                .secure(state.cookie.secure)
                .permanent();
            (raw, jar.add(cookie))
        }
    };

    let aggregate = state
        .votes
        .record_vote(&poll_id, req.post_id, req.option_index, &state.hasher.hash(&raw))
        .await?;

    Ok((
        jar,
        Json(PollResults {
            aggregate,
            user_vote: Some(req.option_index as i16),
        }),
    ))
}

/// Current results, with the caller's own vote when the cookie is present.
async fn results(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    VoterToken(token): VoterToken,
) -> AppResult<Json<PollResults>> {
    check_poll_id(&poll_id)?;

    let hashed = token.map(|raw| state.hasher.hash(&raw));
    Ok(Json(state.votes.get_results(&poll_id, hashed.as_deref()).await))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{poll_id}/vote", post(vote))
        .route("/{poll_id}/results", get(results))
}
