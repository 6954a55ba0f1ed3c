//! Schema migrator behaviour against an in-memory `SQLite` database.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use content_poll_common::AppError;
use content_poll_db::migrations::{
    self, DB_VERSION_OPTION, IDX_BLOCK_OPTION, IDX_POLL_OPTION, LEDGER_TABLE,
    LEGACY_MIGRATION_OPTION, SchemaVersion, Step, UNIQ_BLOCK_TOKEN, UNIQ_POLL_TOKEN,
};
use content_poll_db::repositories::VoteRepository;
use content_poll_db::test_utils::{create_legacy_ledger, insert_legacy_vote, sqlite_memory};
use content_poll_db::entities::vote_submission;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Set, Statement};
use sea_orm_migration::SchemaManager;

/// Index names and row contents, for comparing schema state across runs.
async fn snapshot(db: &DatabaseConnection) -> (Vec<String>, Vec<(i64, String, String, String)>) {
    let indexes = db
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = '{LEDGER_TABLE}' ORDER BY name"
            ),
        ))
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.try_get::<String>("", "name").unwrap())
        .collect();

    let rows = db
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!("SELECT id, poll_id, block_id, hashed_token FROM {LEDGER_TABLE} ORDER BY id"),
        ))
        .await
        .unwrap()
        .into_iter()
        .map(|row| {
            (
                row.try_get::<i64>("", "id").unwrap(),
                row.try_get::<String>("", "poll_id").unwrap(),
                row.try_get::<String>("", "block_id").unwrap(),
                row.try_get::<String>("", "hashed_token").unwrap(),
            )
        })
        .collect();

    (indexes, rows)
}

async fn legacy_store() -> Arc<DatabaseConnection> {
    let db = sqlite_memory().await.unwrap();
    create_legacy_ledger(&db).await.unwrap();
    insert_legacy_vote(&db, "abc123", 0, 0, "h1", Utc::now())
        .await
        .unwrap();
    insert_legacy_vote(&db, "abc123", 0, 2, "h2", Utc::now())
        .await
        .unwrap();
    insert_legacy_vote(&db, "other-block", 7, 1, "h1", Utc::now())
        .await
        .unwrap();
    Arc::new(db)
}

#[tokio::test]
async fn test_fresh_install_creates_current_schema() {
    let db = sqlite_memory().await.unwrap();

    let version = migrations::initialize(&db).await.unwrap();
    assert_eq!(version, SchemaVersion::CURRENT);
    assert_eq!(
        migrations::installed_version(&db).await.unwrap(),
        SchemaVersion::CURRENT
    );

    let manager = SchemaManager::new(&db);
    assert!(manager.has_table(LEDGER_TABLE).await.unwrap());
    assert!(manager.has_column(LEDGER_TABLE, "poll_id").await.unwrap());
    assert!(manager.has_index(LEDGER_TABLE, UNIQ_POLL_TOKEN).await.unwrap());
    assert!(manager.has_index(LEDGER_TABLE, IDX_POLL_OPTION).await.unwrap());
    assert!(manager.has_index(LEDGER_TABLE, IDX_BLOCK_OPTION).await.unwrap());
    assert!(!manager.has_index(LEDGER_TABLE, UNIQ_BLOCK_TOKEN).await.unwrap());
}

#[tokio::test]
async fn test_legacy_rows_backfilled() {
    let db = legacy_store().await;

    let version = migrations::initialize(&db).await.unwrap();
    assert_eq!(version, SchemaVersion::CURRENT);

    let (indexes, rows) = snapshot(&db).await;
    assert_eq!(rows.len(), 3);
    for (_, poll_id, block_id, _) in &rows {
        assert_eq!(poll_id, block_id);
    }
    assert!(indexes.contains(&UNIQ_POLL_TOKEN.to_string()));
    assert!(!indexes.contains(&UNIQ_BLOCK_TOKEN.to_string()));

    let repo = VoteRepository::new(db.clone());
    let counts = repo.option_counts("abc123").await.unwrap();
    assert_eq!(counts.iter().map(|c| c.votes).sum::<i64>(), 2);
}

#[tokio::test]
async fn test_single_legacy_row_addressable_by_poll_id() {
    let db = sqlite_memory().await.unwrap();
    create_legacy_ledger(&db).await.unwrap();
    insert_legacy_vote(&db, "abc123", 0, 0, "h1", Utc::now())
        .await
        .unwrap();
    let db = Arc::new(db);

    migrations::initialize(&db).await.unwrap();
    let repo = VoteRepository::new(db.clone());
    let total: i64 = repo
        .option_counts("abc123")
        .await
        .unwrap()
        .iter()
        .map(|c| c.votes)
        .sum();
    assert_eq!(total, 1);

    let before = snapshot(&db).await;
    migrations::initialize(&db).await.unwrap();
    assert_eq!(snapshot(&db).await, before);
}

#[tokio::test]
async fn test_migrate_twice_is_identical() {
    let db = legacy_store().await;

    migrations::migrate(&db, SchemaVersion::NONE).await.unwrap();
    let once = snapshot(&db).await;

    // The flag is never written by `migrate`, so this re-runs every step.
    migrations::migrate(&db, SchemaVersion::NONE).await.unwrap();
    let twice = snapshot(&db).await;

    assert_eq!(once, twice);
    assert_eq!(twice.1.len(), 3);
}

#[tokio::test]
async fn test_uniqueness_moves_to_poll_id() {
    let db = legacy_store().await;
    migrations::initialize(&db).await.unwrap();

    let repo = VoteRepository::new(db.clone());
    let duplicate = vote_submission::ActiveModel {
        poll_id: Set("abc123".to_string()),
        block_id: Set("abc123".to_string()),
        post_id: Set(42),
        option_index: Set(3),
        hashed_token: Set("h1".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    assert!(!repo.insert_if_absent(duplicate).await.unwrap());

    let fresh = vote_submission::ActiveModel {
        poll_id: Set("abc123".to_string()),
        block_id: Set("abc123".to_string()),
        post_id: Set(42),
        option_index: Set(3),
        hashed_token: Set("h3".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    assert!(repo.insert_if_absent(fresh).await.unwrap());
}

#[tokio::test]
async fn test_interrupted_migration_resumes() {
    let db = legacy_store().await;
    let manager = SchemaManager::new(db.as_ref());

    // Simulate a run that stopped after the first two steps.
    assert!(Step::AddPollIdColumn.apply(&manager).await.unwrap());
    assert!(Step::BackfillPollId.apply(&manager).await.unwrap());

    migrations::initialize(&db).await.unwrap();

    for step in Step::ALL {
        assert!(
            !step.apply(&manager).await.unwrap(),
            "{} should have nothing left to do",
            step.name()
        );
    }
    assert_eq!(snapshot(&db).await.1.len(), 3);
}

#[tokio::test]
async fn test_failed_step_leaves_version_unset_and_retries() {
    let db = legacy_store().await;
    let manager = SchemaManager::new(db.as_ref());

    // A run stopped before the new unique index, leaving rows that collide on it.
    assert!(Step::AddPollIdColumn.apply(&manager).await.unwrap());
    assert!(Step::BackfillPollId.apply(&manager).await.unwrap());
    assert!(Step::DropBlockTokenIndex.apply(&manager).await.unwrap());
    for block_id in ["split-a", "split-b"] {
        db.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!(
                "INSERT INTO {LEDGER_TABLE} (poll_id, block_id, post_id, option_index, hashed_token, created_at) \
                 VALUES ('shared', '{block_id}', 3, 0, 'h9', '2025-01-01T00:00:00Z')"
            ),
        ))
        .await
        .unwrap();
    }

    let err = migrations::initialize(&db).await.unwrap_err();
    assert!(matches!(err, AppError::Migration(_)));
    assert!(
        migrations::get_option(&db, DB_VERSION_OPTION)
            .await
            .unwrap()
            .is_none()
    );
    assert!(!manager.has_index(LEDGER_TABLE, UNIQ_POLL_TOKEN).await.unwrap());

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        format!("DELETE FROM {LEDGER_TABLE} WHERE block_id = 'split-b'"),
    ))
    .await
    .unwrap();

    assert_eq!(
        migrations::initialize(&db).await.unwrap(),
        SchemaVersion::CURRENT
    );
    assert_eq!(
        migrations::get_option(&db, DB_VERSION_OPTION).await.unwrap().as_deref(),
        Some("1.1.0")
    );
    assert!(manager.has_index(LEDGER_TABLE, UNIQ_POLL_TOKEN).await.unwrap());
    assert_eq!(snapshot(&db).await.1.len(), 4);
}

#[tokio::test]
async fn test_current_version_is_noop() {
    let db = sqlite_memory().await.unwrap();

    let version = migrations::migrate(&db, SchemaVersion::CURRENT).await.unwrap();
    assert_eq!(version, SchemaVersion::CURRENT);

    let manager = SchemaManager::new(&db);
    assert!(!manager.has_table(LEDGER_TABLE).await.unwrap());
}

#[tokio::test]
async fn test_legacy_flag_removed_and_version_recorded() {
    let db = legacy_store().await;
    migrations::initialize(&db).await.unwrap();
    migrations::set_option(&db, LEGACY_MIGRATION_OPTION, "1")
        .await
        .unwrap();
    migrations::set_option(&db, DB_VERSION_OPTION, "1.0.0")
        .await
        .unwrap();

    migrations::initialize(&db).await.unwrap();

    assert_eq!(
        migrations::get_option(&db, DB_VERSION_OPTION).await.unwrap().as_deref(),
        Some("1.1.0")
    );
    assert!(
        migrations::get_option(&db, LEGACY_MIGRATION_OPTION)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_unparsable_version_migrates() {
    let db = legacy_store().await;
    migrations::initialize(&db).await.unwrap();
    migrations::set_option(&db, DB_VERSION_OPTION, "garbage")
        .await
        .unwrap();

    assert_eq!(
        migrations::installed_version(&db).await.unwrap(),
        SchemaVersion::NONE
    );
    assert_eq!(
        migrations::initialize(&db).await.unwrap(),
        SchemaVersion::CURRENT
    );
}

#[tokio::test]
async fn test_uninstall_drops_everything() {
    let db = sqlite_memory().await.unwrap();
    migrations::initialize(&db).await.unwrap();

    migrations::uninstall(&db).await.unwrap();

    let manager = SchemaManager::new(&db);
    assert!(!manager.has_table(LEDGER_TABLE).await.unwrap());
    assert!(!manager.has_table("content_poll_options").await.unwrap());
}
