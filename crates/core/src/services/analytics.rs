//! Analytics rollup and posts-summary cache.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use content_poll_blocks::{MARKER, poll_blocks};
use content_poll_common::{AppError, AppResult, KvCache, config::AnalyticsConfig};
use content_poll_db::repositories::{
    ActivityOrder, PollTotals, PostRepository, SCANNED_STATUSES, VoteRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{AggregateResult, aggregate, round2};

/// Cache key of the posts summary.
pub const SUMMARY_CACHE_KEY: &str = "content_poll_posts_summary";

/// Question shown for polls without one.
pub const UNTITLED_POLL: &str = "Untitled Poll";

/// One post that embeds at least one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsSummaryRow {
    pub post_id: i64,
    pub post_title: String,
    pub poll_count: usize,
    pub total_votes: u64,
    pub last_vote: Option<DateTime<Utc>>,
}

/// A ledger identifier no post references anymore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanPoll {
    pub poll_id: String,
    pub votes: u64,
}

/// Site-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_votes: u64,
    pub total_polls: u64,
    pub average_votes_per_poll: f64,
}

/// Votes for one poll on one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollActivity {
    pub poll_id: String,
    pub post_id: i64,
    pub total_votes: u64,
    pub last_vote: Option<DateTime<Utc>>,
}

impl From<PollTotals> for PollActivity {
    fn from(row: PollTotals) -> Self {
        Self {
            poll_id: row.poll_id,
            post_id: row.post_id,
            total_votes: clamp_count(row.votes),
            last_vote: row.last_vote,
        }
    }
}

/// Display attributes of a poll block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollAttributes {
    pub question: String,
    pub options: Vec<String>,
}

fn clamp_count(votes: i64) -> u64 {
    u64::try_from(votes).unwrap_or(0)
}

/// Analytics service.
#[derive(Clone)]
pub struct AnalyticsService {
    vote_repo: VoteRepository,
    post_repo: PostRepository,
    cache: Arc<dyn KvCache>,
    ttl: Duration,
    rollup_timeout: Duration,
}

impl AnalyticsService {
    /// Create a new analytics service.
    #[must_use]
    pub fn new(
        vote_repo: VoteRepository,
        post_repo: PostRepository,
        cache: Arc<dyn KvCache>,
        config: &AnalyticsConfig,
    ) -> Self {
        Self {
            vote_repo,
            post_repo,
            cache,
            ttl: config.cache_ttl(),
            rollup_timeout: config.rollup_timeout(),
        }
    }

    /// Per-post vote totals, served from cache when fresh.
    ///
    /// Cache read failures and undecodable entries count as a miss.
    pub async fn posts_summary(&self) -> AppResult<Vec<PostsSummaryRow>> {
        match self.cache.get(SUMMARY_CACHE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<PostsSummaryRow>>(&raw) {
                Ok(rows) => {
                    debug!(rows = rows.len(), "Posts summary served from cache");
                    return Ok(rows);
                }
                Err(e) => warn!(error = %e, "Discarding undecodable posts summary"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Posts summary cache read failed"),
        }

        let rows = tokio::time::timeout(self.rollup_timeout, self.build_summary())
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "posts summary rollup exceeded {}s",
                    self.rollup_timeout.as_secs()
                ))
            })??;

        match serde_json::to_string(&rows) {
            Ok(encoded) => {
                if let Err(e) = self.cache.set(SUMMARY_CACHE_KEY, encoded, self.ttl).await {
                    warn!(error = %e, "Failed to cache posts summary");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode posts summary"),
        }

        Ok(rows)
    }

    /// Rebuild the posts summary from posts and the ledger.
    pub async fn build_summary(&self) -> AppResult<Vec<PostsSummaryRow>> {
        let posts = self
            .post_repo
            .find_containing(MARKER, &SCANNED_STATUSES)
            .await?;

        let mut attributed: HashMap<(i64, String), (u64, Option<DateTime<Utc>>)> = HashMap::new();
        for row in self.vote_repo.attributed_totals().await? {
            attributed.insert((row.post_id, row.poll_id), (clamp_count(row.votes), row.last_vote));
        }

        let mut legacy: HashMap<String, (u64, Option<DateTime<Utc>>)> = HashMap::new();
        for row in self.vote_repo.legacy_totals().await? {
            legacy.insert(row.block_id, (clamp_count(row.votes), row.last_vote));
        }

        let mut rows = Vec::new();
        for post in posts {
            let blocks = poll_blocks(&post.content);
            if blocks.is_empty() {
                continue;
            }

            // Legacy rows carry only the block identifier, which may differ from `pollId`.
            let ids: BTreeSet<&str> = blocks.iter().map(|b| b.poll_id.as_str()).collect();
            let legacy_keys: BTreeSet<&str> = blocks
                .iter()
                .flat_map(|b| std::iter::once(b.poll_id.as_str()).chain(b.block_id.as_deref()))
                .collect();

            let mut total_votes = 0u64;
            let mut last_vote: Option<DateTime<Utc>> = None;
            let attributed_hits = ids
                .iter()
                .filter_map(|id| attributed.get(&(post.id, (*id).to_string())));
            let legacy_hits = legacy_keys.iter().filter_map(|key| legacy.get(*key));
            for (votes, at) in attributed_hits.chain(legacy_hits) {
                total_votes += *votes;
                last_vote = last_vote.max(*at);
            }

            rows.push(PostsSummaryRow {
                post_id: post.id,
                post_title: post.title,
                poll_count: ids.len(),
                total_votes,
                last_vote,
            });
        }

        rows.sort_by(|a, b| {
            b.total_votes
                .cmp(&a.total_votes)
                .then(a.post_id.cmp(&b.post_id))
        });

        info!(rows = rows.len(), "Posts summary rebuilt");
        Ok(rows)
    }

    /// Drop the cached posts summary.
    pub async fn invalidate(&self) -> AppResult<()> {
        self.cache.delete(SUMMARY_CACHE_KEY).await
    }

    /// Hook for host content saves; poll blocks may have been added or removed.
    pub async fn on_content_saved(&self, post_id: i64) -> AppResult<()> {
        debug!(post_id, "Content saved, invalidating posts summary");
        self.invalidate().await
    }

    /// Delete every vote for a poll identifier and invalidate the summary.
    pub async fn delete_block_votes(&self, poll_id: &str) -> AppResult<u64> {
        let rows = self.vote_repo.delete_by_poll(poll_id).await?;
        info!(poll_id = %poll_id, rows, "Poll votes purged");

        if let Err(e) = self.invalidate().await {
            warn!(error = %e, "Failed to invalidate posts summary after purge");
        }
        Ok(rows)
    }

    /// Ledger identifiers that no scanned post references.
    pub async fn find_orphans(&self) -> AppResult<Vec<OrphanPoll>> {
        let posts = self
            .post_repo
            .find_containing(MARKER, &SCANNED_STATUSES)
            .await?;

        let mut referenced = BTreeSet::new();
        for post in &posts {
            for block in poll_blocks(&post.content) {
                referenced.extend(block.block_id);
                referenced.insert(block.poll_id);
            }
        }

        Ok(self
            .vote_repo
            .poll_id_counts()
            .await?
            .into_iter()
            .filter(|row| !referenced.contains(&row.poll_id))
            .map(|row| OrphanPoll {
                poll_id: row.poll_id,
                votes: clamp_count(row.votes),
            })
            .collect())
    }

    /// Site-wide vote totals.
    pub async fn overview(&self) -> AppResult<AnalyticsOverview> {
        let total_votes = self.vote_repo.count_all().await?;
        let total_polls = self.vote_repo.count_polls().await?;
        let average_votes_per_poll = if total_polls == 0 {
            0.0
        } else {
            round2(total_votes as f64 / total_polls as f64)
        };

        Ok(AnalyticsOverview {
            total_votes,
            total_polls,
            average_votes_per_poll,
        })
    }

    /// Polls with the most votes.
    pub async fn top_polls(&self, limit: u64) -> AppResult<Vec<PollActivity>> {
        self.activity(ActivityOrder::MostVotes, limit).await
    }

    /// Polls with the most recent votes.
    pub async fn recent_activity(&self, limit: u64) -> AppResult<Vec<PollActivity>> {
        self.activity(ActivityOrder::LatestVote, limit).await
    }

    async fn activity(&self, order: ActivityOrder, limit: u64) -> AppResult<Vec<PollActivity>> {
        Ok(self
            .vote_repo
            .poll_activity(order, limit)
            .await?
            .into_iter()
            .map(PollActivity::from)
            .collect())
    }

    pub async fn post_total_votes(&self, post_id: i64) -> AppResult<u64> {
        self.vote_repo.post_total(post_id).await
    }

    pub async fn post_poll_totals(&self, post_id: i64) -> AppResult<Vec<PollActivity>> {
        Ok(self
            .vote_repo
            .post_poll_totals(post_id)
            .await?
            .into_iter()
            .map(PollActivity::from)
            .collect())
    }

    /// Per-option breakdown of one poll.
    pub async fn poll_breakdown(&self, poll_id: &str) -> AggregateResult {
        aggregate(&self.vote_repo, poll_id).await
    }

    /// Question and options of every poll embedded in a post.
    ///
    /// A missing post yields an empty map.
    pub async fn post_poll_attributes(
        &self,
        post_id: i64,
    ) -> AppResult<BTreeMap<String, PollAttributes>> {
        let Some(post) = self.post_repo.find_by_id(post_id).await? else {
            return Ok(BTreeMap::new());
        };

        let mut attributes = BTreeMap::new();
        for block in poll_blocks(&post.content) {
            attributes
                .entry(block.poll_id)
                .or_insert_with(|| PollAttributes {
                    question: block
                        .question
                        .unwrap_or_else(|| UNTITLED_POLL.to_string()),
                    options: block.options,
                });
        }
        Ok(attributes)
    }
}
