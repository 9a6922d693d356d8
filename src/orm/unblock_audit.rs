//! Audit trail of reversed block rules
//!
//! Append-only. Rows are written in the same transaction that deletes the
//! matching `block_entries` row and are never updated afterwards.

use super::block_entries::BlockKind;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "unblock_audit")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub kind: BlockKind,
    pub value: String,
    pub operator_id: i32,
    pub operator_uuid: String,
    pub created_at: DateTime,
    pub reversing_operator_id: i32,
    pub reversing_operator_uuid: String,
    pub reversed_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
