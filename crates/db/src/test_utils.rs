//! Test utilities for database operations.
//!
//! Behavioural tests run against an in-memory `SQLite` database (enable the
//! `sqlx-sqlite` feature of `sea-orm` and `sea-orm-migration` in
//! dev-dependencies). Helpers for the
//! optional `PostgreSQL` suite are configured through `TEST_DB_*` variables.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{ColumnDef, Index, Query, Table};
use sea_orm::{
    ActiveValue::Set, ConnectOptions, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, DbErr, EntityTrait, Schema, Statement,
};
use tracing::info;

use crate::entities::{Post, post};
use crate::migrations::{IDX_BLOCK_OPTION, UNIQ_BLOCK_TOKEN, VoteBlockSubmissions};

/// Connect to a fresh in-memory `SQLite` database.
///
/// The pool is pinned to one connection; every new connection would see
/// its own empty database.
pub async fn sqlite_memory() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(opt).await
}

/// Create the host `posts` table from its entity definition.
pub async fn create_posts_table(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let stmt = Schema::new(backend).create_table_from_entity(Post);
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Insert a host post.
pub async fn insert_post(
    db: &DatabaseConnection,
    id: i64,
    title: &str,
    content: &str,
    status: &str,
) -> Result<(), DbErr> {
    let model = post::ActiveModel {
        id: Set(id),
        title: Set(title.to_string()),
        content: Set(content.to_string()),
        status: Set(status.to_string()),
        post_type: Set("post".to_string()),
    };
    Post::insert(model).exec_without_returning(db).await?;
    Ok(())
}

/// Create the ledger in its pre-1.1.0 shape: no `poll_id`, unique on
/// `(block_id, hashed_token)`.
pub async fn create_legacy_ledger(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    let table = Table::create()
        .table(VoteBlockSubmissions::Table)
        .col(
            ColumnDef::new(VoteBlockSubmissions::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(VoteBlockSubmissions::BlockId)
                .string_len(64)
                .not_null(),
        )
        .col(
            ColumnDef::new(VoteBlockSubmissions::PostId)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(VoteBlockSubmissions::OptionIndex)
                .small_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(VoteBlockSubmissions::HashedToken)
                .char_len(64)
                .not_null(),
        )
        .col(
            ColumnDef::new(VoteBlockSubmissions::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned();
    db.execute(backend.build(&table)).await?;

    let unique = Index::create()
        .name(UNIQ_BLOCK_TOKEN)
        .table(VoteBlockSubmissions::Table)
        .col(VoteBlockSubmissions::BlockId)
        .col(VoteBlockSubmissions::HashedToken)
        .unique()
        .to_owned();
    db.execute(backend.build(&unique)).await?;

    let option = Index::create()
        .name(IDX_BLOCK_OPTION)
        .table(VoteBlockSubmissions::Table)
        .col(VoteBlockSubmissions::BlockId)
        .col(VoteBlockSubmissions::OptionIndex)
        .to_owned();
    db.execute(backend.build(&option)).await?;

    Ok(())
}

/// Insert a row into the pre-1.1.0 ledger.
pub async fn insert_legacy_vote(
    db: &DatabaseConnection,
    block_id: &str,
    post_id: i64,
    option_index: i16,
    hashed_token: &str,
    created_at: DateTime<Utc>,
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let insert = Query::insert()
        .into_table(VoteBlockSubmissions::Table)
        .columns([
            VoteBlockSubmissions::BlockId,
            VoteBlockSubmissions::PostId,
            VoteBlockSubmissions::OptionIndex,
            VoteBlockSubmissions::HashedToken,
            VoteBlockSubmissions::CreatedAt,
        ])
        .values([
            block_id.into(),
            post_id.into(),
            option_index.into(),
            hashed_token.into(),
            created_at.into(),
        ])
        .map_err(|e| DbErr::Custom(e.to_string()))?
        .to_owned();
    db.execute(backend.build(&insert)).await?;
    Ok(())
}

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER")
                .unwrap_or_else(|_| "content_poll_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "content_poll_test".to_string()),
            database: std::env::var("TEST_DB_NAME")
                .unwrap_or_else(|_| "content_poll_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// A connection to the shared `PostgreSQL` test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect using `TEST_DB_*` configuration.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with custom configuration.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        info!(database = %config.database, "Connected to test database");
        Ok(Self { conn, config })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Drop every table in the public schema.
    pub async fn reset(&self) -> Result<(), DbErr> {
        let tables = self
            .conn
            .query_all(Statement::from_string(
                DatabaseBackend::Postgres,
                "SELECT tablename FROM pg_tables WHERE schemaname = 'public'".to_string(),
            ))
            .await?;

        for row in tables {
            if let Ok(table_name) = row.try_get::<String>("", "tablename") {
                let drop = format!("DROP TABLE IF EXISTS \"{table_name}\" CASCADE");
                self.conn
                    .execute(Statement::from_string(DatabaseBackend::Postgres, drop))
                    .await?;
            }
        }

        info!("Reset test database");
        Ok(())
    }
}
