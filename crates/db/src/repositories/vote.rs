//! Vote ledger repository.

use std::sync::Arc;

use crate::entities::{VoteSubmission, vote_submission};
use chrono::{DateTime, Utc};
use content_poll_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// Per-option count for one poll.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct OptionCount {
    pub option_index: i16,
    pub votes: i64,
}

/// Votes for one poll attributed to one post.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct PollTotals {
    pub post_id: i64,
    pub poll_id: String,
    pub votes: i64,
    pub last_vote: Option<DateTime<Utc>>,
}

/// Unattributed (`post_id = 0`) votes for one legacy block identifier.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct LegacyTotals {
    pub block_id: String,
    pub votes: i64,
    pub last_vote: Option<DateTime<Utc>>,
}

/// Vote count for one poll identifier across all posts.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct PollIdCount {
    pub poll_id: String,
    pub votes: i64,
}

/// Ordering for grouped poll activity listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOrder {
    /// Most votes first.
    MostVotes,
    /// Most recent vote first.
    LatestVote,
}

/// Vote ledger repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a vote unless `(poll_id, hashed_token)` already exists.
    ///
    /// One statement; the unique index decides. Returns `false` on conflict.
    pub async fn insert_if_absent(&self, model: vote_submission::ActiveModel) -> AppResult<bool> {
        let rows = VoteSubmission::insert(model)
            .on_conflict(
                OnConflict::columns([
                    vote_submission::Column::PollId,
                    vote_submission::Column::HashedToken,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))?;
        Ok(rows > 0)
    }

    /// Count votes per option for a poll.
    pub async fn option_counts(&self, poll_id: &str) -> AppResult<Vec<OptionCount>> {
        VoteSubmission::find()
            .select_only()
            .column(vote_submission::Column::OptionIndex)
            .column_as(Expr::col(vote_submission::Column::Id).count(), "votes")
            .filter(vote_submission::Column::PollId.eq(poll_id))
            .group_by(vote_submission::Column::OptionIndex)
            .into_model::<OptionCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the option a voter picked on a poll.
    pub async fn find_user_vote(&self, poll_id: &str, hashed_token: &str) -> AppResult<Option<i16>> {
        let vote = VoteSubmission::find()
            .filter(vote_submission::Column::PollId.eq(poll_id))
            .filter(vote_submission::Column::HashedToken.eq(hashed_token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(vote.map(|v| v.option_index))
    }

    /// Delete every row whose `poll_id` or `block_id` equals `id`.
    pub async fn delete_by_poll(&self, id: &str) -> AppResult<u64> {
        let result = VoteSubmission::delete_many()
            .filter(
                Condition::any()
                    .add(vote_submission::Column::PollId.eq(id))
                    .add(vote_submission::Column::BlockId.eq(id)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Attributed votes (`post_id > 0`) grouped by `(post_id, poll_id)`.
    pub async fn attributed_totals(&self) -> AppResult<Vec<PollTotals>> {
        VoteSubmission::find()
            .select_only()
            .column(vote_submission::Column::PostId)
            .column(vote_submission::Column::PollId)
            .column_as(Expr::col(vote_submission::Column::Id).count(), "votes")
            .column_as(Expr::col(vote_submission::Column::CreatedAt).max(), "last_vote")
            .filter(vote_submission::Column::PostId.gt(0))
            .group_by(vote_submission::Column::PostId)
            .group_by(vote_submission::Column::PollId)
            .into_model::<PollTotals>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Legacy votes (`post_id = 0`) grouped by `block_id`.
    pub async fn legacy_totals(&self) -> AppResult<Vec<LegacyTotals>> {
        VoteSubmission::find()
            .select_only()
            .column(vote_submission::Column::BlockId)
            .column_as(Expr::col(vote_submission::Column::Id).count(), "votes")
            .column_as(Expr::col(vote_submission::Column::CreatedAt).max(), "last_vote")
            .filter(vote_submission::Column::PostId.eq(0))
            .group_by(vote_submission::Column::BlockId)
            .into_model::<LegacyTotals>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Vote counts per distinct `poll_id`.
    pub async fn poll_id_counts(&self) -> AppResult<Vec<PollIdCount>> {
        VoteSubmission::find()
            .select_only()
            .column(vote_submission::Column::PollId)
            .column_as(Expr::col(vote_submission::Column::Id).count(), "votes")
            .group_by(vote_submission::Column::PollId)
            .order_by_asc(vote_submission::Column::PollId)
            .into_model::<PollIdCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Total number of votes.
    pub async fn count_all(&self) -> AppResult<u64> {
        VoteSubmission::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of distinct polls with at least one vote.
    pub async fn count_polls(&self) -> AppResult<u64> {
        VoteSubmission::find()
            .select_only()
            .column(vote_submission::Column::PollId)
            .distinct()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Votes grouped by `(poll_id, post_id)`, ordered per `order`.
    pub async fn poll_activity(
        &self,
        order: ActivityOrder,
        limit: u64,
    ) -> AppResult<Vec<PollTotals>> {
        let sort = match order {
            ActivityOrder::MostVotes => Expr::col(vote_submission::Column::Id).count(),
            ActivityOrder::LatestVote => Expr::col(vote_submission::Column::CreatedAt).max(),
        };

        VoteSubmission::find()
            .select_only()
            .column(vote_submission::Column::PostId)
            .column(vote_submission::Column::PollId)
            .column_as(Expr::col(vote_submission::Column::Id).count(), "votes")
            .column_as(Expr::col(vote_submission::Column::CreatedAt).max(), "last_vote")
            .group_by(vote_submission::Column::PollId)
            .group_by(vote_submission::Column::PostId)
            .order_by(sort, Order::Desc)
            .order_by_asc(vote_submission::Column::PollId)
            .limit(limit)
            .into_model::<PollTotals>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Total votes attributed to a post.
    pub async fn post_total(&self, post_id: i64) -> AppResult<u64> {
        VoteSubmission::find()
            .filter(vote_submission::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Per-poll totals for a post, most votes first.
    pub async fn post_poll_totals(&self, post_id: i64) -> AppResult<Vec<PollTotals>> {
        VoteSubmission::find()
            .select_only()
            .column(vote_submission::Column::PostId)
            .column(vote_submission::Column::PollId)
            .column_as(Expr::col(vote_submission::Column::Id).count(), "votes")
            .column_as(Expr::col(vote_submission::Column::CreatedAt).max(), "last_vote")
            .filter(vote_submission::Column::PostId.eq(post_id))
            .group_by(vote_submission::Column::PostId)
            .group_by(vote_submission::Column::PollId)
            .order_by(Expr::col(vote_submission::Column::Id).count(), Order::Desc)
            .order_by_asc(vote_submission::Column::PollId)
            .into_model::<PollTotals>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
