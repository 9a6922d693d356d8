//! Block list entity
//!
//! One row per active rule. Rules of kind `block` and `hide` store the
//! target user's UUID in `value`, `tag` stores the decimal tag id, and
//! `keyword`/`regex` store the text as entered.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rule kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(10))")]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    #[sea_orm(string_value = "block")]
    Block,
    #[sea_orm(string_value = "hide")]
    Hide,
    #[sea_orm(string_value = "keyword")]
    Keyword,
    #[sea_orm(string_value = "tag")]
    Tag,
    #[sea_orm(string_value = "regex")]
    Regex,
}

impl BlockKind {
    /// Stable lowercase name, matches the stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Block => "block",
            BlockKind::Hide => "hide",
            BlockKind::Keyword => "keyword",
            BlockKind::Tag => "tag",
            BlockKind::Regex => "regex",
        }
    }

    /// Returns true for kinds whose value is a user UUID
    pub fn targets_user(&self) -> bool {
        matches!(self, BlockKind::Block | BlockKind::Hide)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "block_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub kind: BlockKind,
    pub value: String,
    pub operator_id: i32,
    pub operator_uuid: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OperatorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Operator,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operator.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
