//! Database entities.

#![allow(missing_docs)]

pub mod plugin_option;
pub mod post;
pub mod vote_submission;

pub use plugin_option::Entity as PluginOption;
pub use post::Entity as Post;
pub use vote_submission::Entity as VoteSubmission;
