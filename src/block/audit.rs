//! Append-only ledger of reversed rules.

use crate::orm::{block_entries, block_entries::BlockKind, unblock_audit};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr, PaginatorTrait};

/// Who performed a reversal.
#[derive(Clone, Debug)]
pub struct Reverser<'a> {
    pub id: i32,
    pub uuid: &'a str,
}

/// Write a frozen copy of `entry`.
///
/// Must be called on the transaction that deletes `entry`; the ledger row and
/// the deletion commit or roll back together.
pub async fn record<C>(
    conn: &C,
    entry: &block_entries::Model,
    reverser: Reverser<'_>,
) -> Result<unblock_audit::Model, DbErr>
where
    C: ConnectionTrait,
{
    unblock_audit::ActiveModel {
        kind: Set(entry.kind),
        value: Set(entry.value.clone()),
        operator_id: Set(entry.operator_id),
        operator_uuid: Set(entry.operator_uuid.clone()),
        created_at: Set(entry.created_at),
        reversing_operator_id: Set(reverser.id),
        reversing_operator_uuid: Set(reverser.uuid.to_owned()),
        reversed_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

/// One page of an operator's reversals, newest first, with the total count.
pub async fn history<C>(
    conn: &C,
    operator_uuid: &str,
    kind: Option<BlockKind>,
    offset: u64,
    limit: u64,
) -> Result<(Vec<unblock_audit::Model>, u64), DbErr>
where
    C: ConnectionTrait,
{
    let mut select = unblock_audit::Entity::find()
        .filter(unblock_audit::Column::OperatorUuid.eq(operator_uuid));
    if let Some(kind) = kind {
        select = select.filter(unblock_audit::Column::Kind.eq(kind));
    }

    let total = select.clone().count(conn).await? as u64;
    let items = select
        .order_by_desc(unblock_audit::Column::ReversedAt)
        .order_by_desc(unblock_audit::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(conn)
        .await?;

    Ok((items, total))
}
