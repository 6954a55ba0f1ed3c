//! Move ledger identity from `block_id` to `poll_id` (schema 1.1.0).
//!
//! Every step checks whether it is already done before acting, so an
//! interrupted run resumes cleanly on the next start.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;
use tracing::{debug, info};

use super::m20250101_000002_create_vote_ledger::{
    IDX_BLOCK_OPTION, IDX_POLL_OPTION, UNIQ_BLOCK_TOKEN, UNIQ_POLL_TOKEN, VoteBlockSubmissions,
};
use super::LEDGER_TABLE;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for step in Step::ALL {
            let applied = step
                .apply(manager)
                .await
                .map_err(|e| DbErr::Migration(format!("{}: {e}", step.name())))?;

            if applied {
                info!(step = step.name(), "Migration step applied");
            } else {
                debug!(step = step.name(), "Migration step already done");
            }
        }
        Ok(())
    }
}

/// One resumable unit of the 1.1.0 migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AddPollIdColumn,
    BackfillPollId,
    DropBlockTokenIndex,
    AddPollTokenIndex,
    AddPollOptionIndex,
    AddBlockOptionIndex,
}

impl Step {
    /// Steps in execution order.
    pub const ALL: [Self; 6] = [
        Self::AddPollIdColumn,
        Self::BackfillPollId,
        Self::DropBlockTokenIndex,
        Self::AddPollTokenIndex,
        Self::AddPollOptionIndex,
        Self::AddBlockOptionIndex,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AddPollIdColumn => "add_poll_id_column",
            Self::BackfillPollId => "backfill_poll_id",
            Self::DropBlockTokenIndex => "drop_uniq_block_token",
            Self::AddPollTokenIndex => "add_uniq_poll_token",
            Self::AddPollOptionIndex => "add_idx_poll_option",
            Self::AddBlockOptionIndex => "add_idx_block_option",
        }
    }

    /// Run the step. Returns `false` when there was nothing to do.
    pub async fn apply(self, manager: &SchemaManager<'_>) -> Result<bool, DbErr> {
        match self {
            Self::AddPollIdColumn => {
                if manager.has_column(LEDGER_TABLE, "poll_id").await? {
                    return Ok(false);
                }
                manager
                    .alter_table(
                        Table::alter()
                            .table(VoteBlockSubmissions::Table)
                            .add_column(
                                ColumnDef::new(VoteBlockSubmissions::PollId)
                                    .string_len(64)
                                    .not_null()
                                    .default(""),
                            )
                            .to_owned(),
                    )
                    .await?;
                Ok(true)
            }
            Self::BackfillPollId => {
                let update = Query::update()
                    .table(VoteBlockSubmissions::Table)
                    .value(
                        VoteBlockSubmissions::PollId,
                        Expr::col(VoteBlockSubmissions::BlockId),
                    )
                    .and_where(Expr::col(VoteBlockSubmissions::PollId).eq(""))
                    .to_owned();

                let backend = manager.get_database_backend();
                let result = manager
                    .get_connection()
                    .execute(backend.build(&update))
                    .await?;

                let rows = result.rows_affected();
                if rows > 0 {
                    info!(rows, "Backfilled poll_id from block_id");
                }
                Ok(rows > 0)
            }
            Self::DropBlockTokenIndex => {
                if !manager.has_index(LEDGER_TABLE, UNIQ_BLOCK_TOKEN).await? {
                    return Ok(false);
                }
                manager
                    .drop_index(
                        Index::drop()
                            .name(UNIQ_BLOCK_TOKEN)
                            .table(VoteBlockSubmissions::Table)
                            .to_owned(),
                    )
                    .await?;
                Ok(true)
            }
            Self::AddPollTokenIndex => {
                create_index_if_absent(
                    manager,
                    UNIQ_POLL_TOKEN,
                    Index::create()
                        .name(UNIQ_POLL_TOKEN)
                        .table(VoteBlockSubmissions::Table)
                        .col(VoteBlockSubmissions::PollId)
                        .col(VoteBlockSubmissions::HashedToken)
                        .unique()
                        .to_owned(),
                )
                .await
            }
            Self::AddPollOptionIndex => {
                create_index_if_absent(
                    manager,
                    IDX_POLL_OPTION,
                    Index::create()
                        .name(IDX_POLL_OPTION)
                        .table(VoteBlockSubmissions::Table)
                        .col(VoteBlockSubmissions::PollId)
                        .col(VoteBlockSubmissions::OptionIndex)
                        .to_owned(),
                )
                .await
            }
            Self::AddBlockOptionIndex => {
                create_index_if_absent(
                    manager,
                    IDX_BLOCK_OPTION,
                    Index::create()
                        .name(IDX_BLOCK_OPTION)
                        .table(VoteBlockSubmissions::Table)
                        .col(VoteBlockSubmissions::BlockId)
                        .col(VoteBlockSubmissions::OptionIndex)
                        .to_owned(),
                )
                .await
            }
        }
    }
}

async fn create_index_if_absent(
    manager: &SchemaManager<'_>,
    name: &str,
    index: IndexCreateStatement,
) -> Result<bool, DbErr> {
    if manager.has_index(LEDGER_TABLE, name).await? {
        return Ok(false);
    }
    manager.create_index(index).await?;
    Ok(true)
}
