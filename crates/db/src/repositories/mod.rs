//! Database repositories.

pub mod post;
pub mod vote;

pub use post::{PostRepository, SCANNED_STATUSES};
pub use vote::{
    ActivityOrder, LegacyTotals, OptionCount, PollIdCount, PollTotals, VoteRepository,
};
