//! Core voting logic for content-poll.
//!
//! - [`VoteService`] records votes behind the ledger's uniqueness index and
//!   reads per-poll results.
//! - [`AnalyticsService`] builds the cached posts summary and the admin
//!   reports.
//! - [`aggregate`](aggregate::aggregate) turns ledger counts into
//!   six-slot results.

pub mod aggregate;
pub mod services;

pub use aggregate::{AggregateResult, OPTION_SLOTS, PollResults};
pub use services::*;
