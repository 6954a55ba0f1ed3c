//! Block markup parser for content-poll.
//!
//! Post content stores blocks as delimited HTML comments. This crate turns
//! that content into a block tree and pulls out the embedded poll blocks.
//!
//! # Example
//!
//! ```
//! use content_poll_blocks::{parse, poll_ids};
//!
//! let content = r#"<!-- wp:content-poll/vote-block {"pollId":"a1b2c3d4"} /-->"#;
//! assert_eq!(parse(content).len(), 1);
//! assert!(poll_ids(content).contains("a1b2c3d4"));
//! ```

mod block;
mod parser;
mod poll;

pub use block::Block;
pub use parser::parse;
pub use poll::{BLOCK_NAME, MARKER, PollBlock, poll_blocks, poll_ids};
