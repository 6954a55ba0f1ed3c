//! Schema migrator.
//!
//! The ledger schema is tracked by a persisted version flag rather than a
//! migration history table. [`initialize`] reads the flag and, when it is
//! behind [`SchemaVersion::CURRENT`], runs [`migrate`] and records the new
//! version. A failed run leaves the flag untouched so the next start retries;
//! every step is safe to repeat.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use content_poll_common::{AppError, AppResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use sea_orm_migration::prelude::{MigrationTrait, SchemaManager};
use tracing::{debug, info, warn};

use crate::entities::{PluginOption, plugin_option};

mod m20250101_000001_create_options_table;
mod m20250101_000002_create_vote_ledger;
mod m20250101_000003_poll_id_identity;

pub use m20250101_000002_create_vote_ledger::{
    IDX_BLOCK_OPTION, IDX_POLL_OPTION, UNIQ_BLOCK_TOKEN, UNIQ_POLL_TOKEN,
};
pub use m20250101_000003_poll_id_identity::Step;

pub(crate) use m20250101_000002_create_vote_ledger::VoteBlockSubmissions;

/// Ledger table name.
pub const LEDGER_TABLE: &str = "vote_block_submissions";

/// Flag holding the installed schema version.
pub const DB_VERSION_OPTION: &str = "content_poll_db_version";

/// Flag written by releases that tracked the `poll_id` migration separately.
pub const LEGACY_MIGRATION_OPTION: &str = "content_poll_poll_id_migrated";

/// Dotted `major.minor.patch` schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    /// Nothing installed.
    pub const NONE: Self = Self::new(0, 0, 0);
    /// Ledger keyed by `poll_id`.
    pub const POLL_ID: Self = Self::new(1, 1, 0);
    /// Version produced by [`migrate`].
    pub const CURRENT: Self = Self::POLL_ID;

    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = AppError;

    /// Missing trailing components read as zero, so `1.1` equals `1.1.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Migration(format!("unparsable schema version: {s}"));
        let mut parts = [0u32; 3];
        for (i, part) in s.trim().split('.').enumerate() {
            let slot = parts.get_mut(i).ok_or_else(invalid)?;
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

fn migration_error(e: DbErr) -> AppError {
    AppError::Migration(e.to_string())
}

/// Bring the ledger from `from` up to [`SchemaVersion::CURRENT`].
///
/// Stateless: reads and writes no version flag. A missing ledger is created
/// directly in its current shape; an existing one goes through the 1.1.0
/// steps.
pub async fn migrate(db: &DatabaseConnection, from: SchemaVersion) -> AppResult<SchemaVersion> {
    if from >= SchemaVersion::CURRENT {
        return Ok(from);
    }

    let manager = SchemaManager::new(db);
    let exists = manager
        .has_table(LEDGER_TABLE)
        .await
        .map_err(migration_error)?;

    if exists {
        info!(from = %from, to = %SchemaVersion::CURRENT, "Migrating vote ledger");
        m20250101_000003_poll_id_identity::Migration
            .up(&manager)
            .await
            .map_err(migration_error)?;
    } else {
        info!(version = %SchemaVersion::CURRENT, "Creating vote ledger");
        m20250101_000002_create_vote_ledger::Migration
            .up(&manager)
            .await
            .map_err(migration_error)?;
    }

    Ok(SchemaVersion::CURRENT)
}

/// Read the installed version, migrating and recording it when behind.
///
/// Safe to call on every start. Failures are logged and returned; the
/// ledger stays usable in whatever shape it had.
pub async fn initialize(db: &DatabaseConnection) -> AppResult<SchemaVersion> {
    let manager = SchemaManager::new(db);
    m20250101_000001_create_options_table::Migration
        .up(&manager)
        .await
        .map_err(migration_error)?;

    let installed = installed_version(db).await?;
    if installed >= SchemaVersion::CURRENT {
        debug!(version = %installed, "Schema up to date");
        return Ok(installed);
    }

    let version = match migrate(db, installed).await {
        Ok(version) => version,
        Err(e) => {
            warn!(error = %e, from = %installed, "Schema migration incomplete, will retry on next start");
            return Err(e);
        }
    };

    set_option(db, DB_VERSION_OPTION, &version.to_string()).await?;
    delete_option(db, LEGACY_MIGRATION_OPTION).await?;
    info!(version = %version, "Schema version recorded");

    Ok(version)
}

/// Installed schema version; [`SchemaVersion::NONE`] when unset or unreadable.
pub async fn installed_version(db: &DatabaseConnection) -> AppResult<SchemaVersion> {
    let Some(raw) = get_option(db, DB_VERSION_OPTION).await? else {
        return Ok(SchemaVersion::NONE);
    };
    Ok(raw.parse().unwrap_or_else(|e: AppError| {
        warn!(error = %e, "Ignoring stored schema version");
        SchemaVersion::NONE
    }))
}

/// Drop the ledger and every stored flag.
pub async fn uninstall(db: &DatabaseConnection) -> AppResult<()> {
    let manager = SchemaManager::new(db);
    m20250101_000002_create_vote_ledger::Migration
        .down(&manager)
        .await
        .map_err(migration_error)?;
    m20250101_000001_create_options_table::Migration
        .down(&manager)
        .await
        .map_err(migration_error)?;
    info!("Removed vote ledger and options");
    Ok(())
}

/// Read a stored flag.
pub async fn get_option(db: &DatabaseConnection, name: &str) -> AppResult<Option<String>> {
    PluginOption::find_by_id(name.to_string())
        .one(db)
        .await
        .map(|row| row.map(|m| m.value))
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Write a stored flag, replacing any previous value.
pub async fn set_option(db: &DatabaseConnection, name: &str, value: &str) -> AppResult<()> {
    let model = plugin_option::ActiveModel {
        name: Set(name.to_string()),
        value: Set(value.to_string()),
    };
    PluginOption::insert(model)
        .on_conflict(
            OnConflict::column(plugin_option::Column::Name)
                .update_column(plugin_option::Column::Value)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Remove a stored flag. Removing a missing flag is a no-op.
pub async fn delete_option(db: &DatabaseConnection, name: &str) -> AppResult<()> {
    PluginOption::delete_many()
        .filter(plugin_option::Column::Name.eq(name))
        .exec(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        assert_eq!("1.1.0".parse::<SchemaVersion>().unwrap(), SchemaVersion::POLL_ID);
        assert_eq!("1.1".parse::<SchemaVersion>().unwrap(), SchemaVersion::new(1, 1, 0));
        assert_eq!("0.0.0".parse::<SchemaVersion>().unwrap(), SchemaVersion::NONE);
        assert!("".parse::<SchemaVersion>().is_err());
        assert!("1.x".parse::<SchemaVersion>().is_err());
        assert!("1.2.3.4".parse::<SchemaVersion>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(SchemaVersion::new(1, 0, 9) < SchemaVersion::CURRENT);
        assert!(SchemaVersion::new(0, 9, 0) < SchemaVersion::new(1, 0, 0));
        assert!(SchemaVersion::new(1, 2, 0) > SchemaVersion::CURRENT);
        assert_eq!(SchemaVersion::CURRENT.to_string(), "1.1.0");
    }

    #[test]
    fn test_step_order() {
        let names: Vec<_> = Step::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "add_poll_id_column",
                "backfill_poll_id",
                "drop_uniq_block_token",
                "add_uniq_poll_token",
                "add_idx_poll_option",
                "add_idx_block_option",
            ]
        );
    }
}
