//! Common utilities and shared types for content-poll.
//!
//! This crate provides foundational components used across all content-poll crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Voter tokens**: Anonymous token generation and salted hashing via [`TokenHasher`]
//! - **Cache**: Expiring key-value cache abstraction with in-memory and Redis backends
//!
//! # Example
//!
//! ```no_run
//! use content_poll_common::{AppResult, Config, TokenHasher, generate_token};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let hasher = TokenHasher::new(&config.voting.token_secret)?;
//!     let hashed = hasher.hash(&generate_token());
//!     println!("Voter hash: {hashed}");
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod token;

pub use cache::{KvCache, MemoryCache, RedisCache};
pub use config::Config;
pub use error::{AppError, AppResult, ErrorBody, Severity};
pub use token::{TokenHasher, generate_token, secrets_match};
