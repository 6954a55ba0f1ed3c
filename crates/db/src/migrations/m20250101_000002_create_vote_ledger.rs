//! Create the vote ledger with `poll_id` as the identity from the start.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VoteBlockSubmissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VoteBlockSubmissions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VoteBlockSubmissions::PollId)
                            .string_len(64)
                            .not_null(),
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
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(UNIQ_POLL_TOKEN)
                    .table(VoteBlockSubmissions::Table)
                    .col(VoteBlockSubmissions::PollId)
                    .col(VoteBlockSubmissions::HashedToken)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_POLL_OPTION)
                    .table(VoteBlockSubmissions::Table)
                    .col(VoteBlockSubmissions::PollId)
                    .col(VoteBlockSubmissions::OptionIndex)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_BLOCK_OPTION)
                    .table(VoteBlockSubmissions::Table)
                    .col(VoteBlockSubmissions::BlockId)
                    .col(VoteBlockSubmissions::OptionIndex)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(VoteBlockSubmissions::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

/// Unique index backing the vote-once guarantee.
pub const UNIQ_POLL_TOKEN: &str = "uniq_poll_token";
/// Unique index of the pre-1.1.0 schema.
pub const UNIQ_BLOCK_TOKEN: &str = "uniq_block_token";
pub const IDX_POLL_OPTION: &str = "idx_poll_option";
pub const IDX_BLOCK_OPTION: &str = "idx_block_option";

#[derive(DeriveIden)]
pub enum VoteBlockSubmissions {
    Table,
    Id,
    PollId,
    BlockId,
    PostId,
    OptionIndex,
    HashedToken,
    CreatedAt,
}
