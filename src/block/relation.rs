//! Point queries for a single viewer/target pair and the precedence that
//! combines them.

use crate::orm::{block_entries, block_entries::BlockKind};
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use serde::Serialize;

/// What the viewer's own rules say about the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerRules {
    pub is_blocked: bool,
    pub is_hidden: bool,
}

/// Whether the viewer has blocked or hidden `target_uuid`.
pub async fn is_target_blocked_by_viewer<C>(
    conn: &C,
    target_uuid: &str,
    viewer_uuid: &str,
) -> Result<ViewerRules, DbErr>
where
    C: ConnectionTrait,
{
    let entries = block_entries::Entity::find()
        .filter(block_entries::Column::OperatorUuid.eq(viewer_uuid))
        .filter(block_entries::Column::Value.eq(target_uuid))
        .filter(block_entries::Column::Kind.is_in([BlockKind::Block, BlockKind::Hide]))
        .all(conn)
        .await?;

    Ok(ViewerRules {
        is_blocked: entries.iter().any(|e| e.kind == BlockKind::Block),
        is_hidden: entries.iter().any(|e| e.kind == BlockKind::Hide),
    })
}

/// Whether `target_uuid` has blocked the viewer.
pub async fn is_viewer_blocked_by_target<C>(
    conn: &C,
    target_uuid: &str,
    viewer_uuid: &str,
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    Ok(block_entries::Entity::find()
        .filter(block_entries::Column::OperatorUuid.eq(target_uuid))
        .filter(block_entries::Column::Value.eq(viewer_uuid))
        .filter(block_entries::Column::Kind.eq(BlockKind::Block))
        .one(conn)
        .await?
        .is_some())
}

/// Combined block state between a viewer and a target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Relationship {
    /// Both users blocked each other.
    MutuallyBlocked,
    /// The viewer blocked the target.
    Blocked,
    /// Only the target blocked the viewer. Content still renders.
    BlockedByOther,
    #[default]
    Visible,
}

/// Result of a point lookup, ready to serialize into a profile or video
/// detail response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationView {
    pub relationship: Relationship,
    pub is_blocked: bool,
    pub is_blocked_by_other: bool,
    /// Only ever reported to the hiding party.
    pub is_hidden: bool,
}

impl RelationView {
    /// Apply the fixed precedence: mutual block, then the viewer's block,
    /// then the target's block. Hiding is independent of all three.
    pub fn resolve(viewer: ViewerRules, blocked_by_other: bool) -> Self {
        let relationship = match (viewer.is_blocked, blocked_by_other) {
            (true, true) => Relationship::MutuallyBlocked,
            (true, false) => Relationship::Blocked,
            (false, true) => Relationship::BlockedByOther,
            (false, false) => Relationship::Visible,
        };

        Self {
            relationship,
            is_blocked: viewer.is_blocked,
            is_blocked_by_other: blocked_by_other,
            is_hidden: viewer.is_hidden,
        }
    }

    pub fn is_mutually_blocked(&self) -> bool {
        self.relationship == Relationship::MutuallyBlocked
    }

    /// Whether the target's content should render for the viewer.
    pub fn is_visible(&self) -> bool {
        matches!(
            self.relationship,
            Relationship::Visible | Relationship::BlockedByOther
        ) && !self.is_hidden
    }
}
