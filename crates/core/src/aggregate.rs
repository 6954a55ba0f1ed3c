//! Poll result aggregation.

use content_poll_db::repositories::VoteRepository;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Number of option slots every result carries.
pub const OPTION_SLOTS: usize = 6;

/// Highest accepted option index.
pub const MAX_OPTION_INDEX: i64 = (OPTION_SLOTS - 1) as i64;

/// Per-option counts and percentages for one poll.
///
/// Always six slots regardless of how many options the poll displays.
/// Percentages are rounded independently and may not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// Poll identifier.
    pub poll_id: String,
    /// Sum of `counts`.
    pub total_votes: u64,
    /// Votes per option slot.
    pub counts: [u64; OPTION_SLOTS],
    /// Share of `total_votes` per slot, two decimals.
    pub percentages: [f64; OPTION_SLOTS],
}

impl AggregateResult {
    /// A result with no votes.
    #[must_use]
    pub fn empty(poll_id: &str) -> Self {
        Self {
            poll_id: poll_id.to_string(),
            total_votes: 0,
            counts: [0; OPTION_SLOTS],
            percentages: [0.0; OPTION_SLOTS],
        }
    }

    /// Build from `(option_index, count)` pairs. Indexes outside the slot
    /// range are dropped.
    #[must_use]
    pub fn from_counts<I>(poll_id: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, u64)>,
    {
        let mut result = Self::empty(poll_id);
        for (index, count) in rows {
            if let Some(slot) = usize::try_from(index)
                .ok()
                .and_then(|i| result.counts.get_mut(i))
            {
                *slot += count;
            }
        }

        result.total_votes = result.counts.iter().sum();
        if result.total_votes > 0 {
            let total = result.total_votes as f64;
            for (pct, &count) in result.percentages.iter_mut().zip(&result.counts) {
                *pct = round2(count as f64 / total * 100.0);
            }
        }
        result
    }
}

/// Aggregate plus the caller's own prior vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    /// Current aggregate.
    #[serde(flatten)]
    pub aggregate: AggregateResult,
    /// Option the caller voted for.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_vote: Option<i16>,
}

/// Round half away from zero to two decimals.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Read the current aggregate for a poll.
///
/// Store errors degrade to an all-zero result; results display must never
/// fail the page.
pub async fn aggregate(repo: &VoteRepository, poll_id: &str) -> AggregateResult {
    match repo.option_counts(poll_id).await {
        Ok(rows) => AggregateResult::from_counts(
            poll_id,
            rows.into_iter()
                .map(|r| (i64::from(r.option_index), r.votes.max(0) as u64)),
        ),
        Err(e) => {
            warn!(poll_id = %poll_id, error = %e, "Aggregate read failed, returning empty result");
            AggregateResult::empty(poll_id)
        }
    }
}
