//! Host-owned post entity. Read-only from this crate's point of view.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub title: String,

    /// Raw block markup
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// `publish`, `draft`, `future`, `trash`, ...
    pub status: String,

    pub post_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
