//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `content_poll_test`)
//!   `TEST_DB_PASSWORD` (default: `content_poll_test`)
//!   `TEST_DB_NAME` (default: `content_poll_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use content_poll_db::entities::vote_submission;
use content_poll_db::migrations::{self, SchemaVersion};
use content_poll_db::repositories::VoteRepository;
use content_poll_db::test_utils::{
    TestDatabase, TestDbConfig, create_legacy_ledger, insert_legacy_vote,
};
use sea_orm::Set;

fn vote(poll_id: &str, token: &str, option_index: i16) -> vote_submission::ActiveModel {
    vote_submission::ActiveModel {
        poll_id: Set(poll_id.to_string()),
        block_id: Set(poll_id.to_string()),
        post_id: Set(1),
        option_index: Set(option_index),
        hashed_token: Set(token.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_fresh_install_and_duplicate_guard() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.reset().await.unwrap();

    let version = migrations::initialize(db.connection()).await.unwrap();
    assert_eq!(version, SchemaVersion::CURRENT);

    let repo = VoteRepository::new(Arc::new(db.conn));
    assert!(repo.insert_if_absent(vote("pg-poll-1", "t1", 0)).await.unwrap());
    assert!(!repo.insert_if_absent(vote("pg-poll-1", "t1", 4)).await.unwrap());
    assert_eq!(repo.count_all().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_legacy_migration() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.reset().await.unwrap();

    create_legacy_ledger(db.connection()).await.unwrap();
    insert_legacy_vote(db.connection(), "abc123", 0, 1, "h1", Utc::now())
        .await
        .unwrap();

    migrations::initialize(db.connection()).await.unwrap();
    migrations::initialize(db.connection()).await.unwrap();

    let repo = VoteRepository::new(Arc::new(db.conn));
    let counts = repo.option_counts("abc123").await.unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].votes, 1);
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };
    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
}
