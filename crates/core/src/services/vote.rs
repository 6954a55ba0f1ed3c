//! Vote service: duplicate guard and results.

use chrono::Utc;
use content_poll_common::{AppError, AppResult};
use content_poll_db::{entities::vote_submission, repositories::VoteRepository};
use sea_orm::Set;
use tracing::{debug, error, info, warn};

use crate::aggregate::{AggregateResult, MAX_OPTION_INDEX, PollResults, aggregate};
use crate::services::analytics::AnalyticsService;

/// Longest accepted poll identifier.
pub const MAX_POLL_ID_LEN: usize = 64;

/// Check an option index against `[0, 5]`.
pub fn validate_option(option_index: i64) -> AppResult<i16> {
    if (0..=MAX_OPTION_INDEX).contains(&option_index) {
        Ok(option_index as i16)
    } else {
        Err(AppError::InvalidOption(option_index))
    }
}

/// Check a poll identifier: 1 to 64 characters of `[A-Za-z0-9_-]`.
pub fn validate_poll_id(poll_id: &str) -> AppResult<()> {
    let valid = !poll_id.is_empty()
        && poll_id.len() <= MAX_POLL_ID_LEN
        && poll_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidPollId(poll_id.to_string()))
    }
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    analytics: AnalyticsService,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(vote_repo: VoteRepository, analytics: AnalyticsService) -> Self {
        Self {
            vote_repo,
            analytics,
        }
    }

    /// Record one vote and return the fresh aggregate.
    ///
    /// Inputs are validated before the store is touched. The insert is a
    /// single `ON CONFLICT DO NOTHING`; zero affected rows means the voter
    /// already voted on this poll.
    pub async fn record_vote(
        &self,
        poll_id: &str,
        post_id: i64,
        option_index: i64,
        hashed_token: &str,
    ) -> AppResult<AggregateResult> {
        let option_index = validate_option(option_index)?;
        validate_poll_id(poll_id)?;
        if post_id <= 0 {
            return Err(AppError::InvalidPostId(post_id));
        }
        if hashed_token.trim().is_empty() {
            return Err(AppError::InvalidToken);
        }

        let model = vote_submission::ActiveModel {
            poll_id: Set(poll_id.to_string()),
            block_id: Set(poll_id.to_string()),
            post_id: Set(post_id),
            option_index: Set(option_index),
            hashed_token: Set(hashed_token.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = self
            .vote_repo
            .insert_if_absent(model)
            .await
            .inspect_err(|e| error!(poll_id = %poll_id, error = %e, "Vote insert failed"))?;

        if !inserted {
            debug!(poll_id = %poll_id, "Duplicate vote rejected");
            return Err(AppError::DuplicateVote);
        }

        info!(poll_id = %poll_id, post_id, option_index, "Vote recorded");

        if let Err(e) = self.analytics.invalidate().await {
            warn!(error = %e, "Failed to invalidate posts summary after vote");
        }

        Ok(aggregate(&self.vote_repo, poll_id).await)
    }

    /// Current aggregate for a poll. Never fails.
    pub async fn get_aggregate(&self, poll_id: &str) -> AggregateResult {
        aggregate(&self.vote_repo, poll_id).await
    }

    /// The option this voter picked, if any.
    pub async fn get_user_vote(&self, poll_id: &str, hashed_token: &str) -> AppResult<Option<i16>> {
        self.vote_repo.find_user_vote(poll_id, hashed_token).await
    }

    /// Aggregate plus the caller's prior vote when a token hash is supplied.
    pub async fn get_results(&self, poll_id: &str, hashed_token: Option<&str>) -> PollResults {
        let aggregate = self.get_aggregate(poll_id).await;
        let user_vote = match hashed_token {
            Some(hash) => self
                .get_user_vote(poll_id, hash)
                .await
                .unwrap_or_else(|e| {
                    warn!(poll_id = %poll_id, error = %e, "User vote lookup failed");
                    None
                }),
            None => None,
        };
        PollResults {
            aggregate,
            user_vote,
        }
    }
}
