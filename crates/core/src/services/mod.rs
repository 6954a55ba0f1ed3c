//! Business logic services.

#![allow(missing_docs)]

pub mod analytics;
pub mod vote;

pub use analytics::{
    AnalyticsOverview, AnalyticsService, OrphanPoll, PollActivity, PollAttributes,
    PostsSummaryRow, SUMMARY_CACHE_KEY,
};
pub use vote::{MAX_POLL_ID_LEN, VoteService, validate_option, validate_poll_id};
