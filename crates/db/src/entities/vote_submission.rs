//! Vote ledger entity: one row per accepted vote.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote_block_submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Canonical poll identifier
    #[sea_orm(indexed)]
    pub poll_id: String,

    /// Legacy alias of `poll_id`; identical for every row written since 1.1.0
    #[sea_orm(indexed)]
    pub block_id: String,

    /// Post the poll was embedded in at vote time; 0 for legacy rows
    pub post_id: i64,

    /// Selected option (0..=5)
    pub option_index: i16,

    /// Hex SHA-256 of the voter token and server secret
    pub hashed_token: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
