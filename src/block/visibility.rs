//! Per-request visibility filter.
//!
//! A [`VisibilityFilter`] is a snapshot of one viewer's rules. Call sites
//! describe which of their columns hold an uploader UUID, a title, a tag id
//! and so on with [`FieldBinding`]s, then splice [`VisibilityFilter::condition`]
//! into their query and run [`VisibilityFilter::permits`] over the rows it
//! returns. Keyword and regex rules are only evaluated in-process because
//! the supported backends share no case-insensitive regex operator.

use super::error::BlockError;
use super::relation::{self, RelationView};
use super::validate;
use crate::identity::{Credential, CredentialVerifier, DatabaseIdentity, UserDirectory};
use crate::orm::{block_entries, block_entries::BlockKind, video_tags};
use futures::future::try_join;
use regex::Regex;
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{
    entity::*, query::*, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    ModelTrait, Value,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Tag-link tables a content query can be filtered through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagLink {
    /// `video_tags(video_id, tag_id)`
    VideoTags,
}

impl TagLink {
    /// Ids of owners linked to any of `tags`.
    fn owners_tagged_with(&self, tags: &BTreeSet<i32>) -> SelectStatement {
        match self {
            TagLink::VideoTags => Query::select()
                .column(video_tags::Column::VideoId)
                .from(video_tags::Entity)
                .and_where(video_tags::Column::TagId.is_in(tags.iter().copied()))
                .to_owned(),
        }
    }
}

/// Which rule category a column of the caller's entity answers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldBinding<C> {
    /// Column holds a user UUID; rows owned by users the viewer blocked are
    /// excluded and rows owned by users who blocked the viewer are flagged.
    BlockedUser(C),
    /// Column holds a user UUID; rows owned by hidden users are excluded.
    HiddenUser(C),
    /// Text column matched against the keyword union.
    Keyword(C),
    /// Text column matched against each custom pattern.
    Regex(C),
    /// Column holds a single tag id.
    Tag(C),
    /// `id` is the row's key and tags live in a link table.
    TaggedVia { id: C, link: TagLink },
}

/// Snapshot of one viewer's rules.
#[derive(Clone, Debug, Default)]
pub struct VisibilityFilter {
    viewer: Option<String>,
    blocked_users: BTreeSet<String>,
    hidden_users: BTreeSet<String>,
    keyword_pattern: Option<Regex>,
    blocked_tags: BTreeSet<i32>,
    regexes: Vec<Regex>,
    blocked_by: BTreeSet<String>,
}

impl PartialEq for VisibilityFilter {
    fn eq(&self, other: &Self) -> bool {
        self.viewer == other.viewer
            && self.blocked_users == other.blocked_users
            && self.hidden_users == other.hidden_users
            && self.keyword_pattern.as_ref().map(Regex::as_str)
                == other.keyword_pattern.as_ref().map(Regex::as_str)
            && self.blocked_tags == other.blocked_tags
            && self
                .regexes
                .iter()
                .map(Regex::as_str)
                .eq(other.regexes.iter().map(Regex::as_str))
            && self.blocked_by == other.blocked_by
    }
}

fn string_value(value: Value) -> Option<String> {
    match value {
        Value::String(Some(s)) => Some(*s),
        _ => None,
    }
}

fn tag_value(value: Value) -> Option<i32> {
    match value {
        Value::Int(Some(i)) => Some(i),
        Value::BigInt(Some(i)) => i32::try_from(i).ok(),
        Value::String(Some(s)) => s.parse().ok(),
        _ => None,
    }
}

impl VisibilityFilter {
    /// A filter that lets everything through.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Partition a viewer's rules. `blocked_by` lists the UUIDs of users who
    /// have blocked the viewer.
    pub fn from_entries(
        viewer_uuid: &str,
        entries: &[block_entries::Model],
        blocked_by: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut filter = Self {
            viewer: Some(viewer_uuid.to_owned()),
            blocked_by: blocked_by.into_iter().collect(),
            ..Default::default()
        };
        let mut keywords = Vec::new();

        for entry in entries {
            match entry.kind {
                BlockKind::Block => {
                    filter.blocked_users.insert(entry.value.clone());
                }
                BlockKind::Hide => {
                    filter.hidden_users.insert(entry.value.clone());
                }
                BlockKind::Keyword => keywords.push(entry.value.as_str()),
                BlockKind::Tag => match entry.value.parse::<i32>() {
                    Ok(id) if id > 0 => {
                        filter.blocked_tags.insert(id);
                    }
                    _ => log::warn!("Ignoring malformed tag rule {}", entry.id),
                },
                BlockKind::Regex => {
                    if let Some(re) = validate::compile_rule_regex(&entry.value) {
                        filter.regexes.push(re);
                    }
                }
            }
        }

        filter.keyword_pattern = validate::keyword_union(keywords);
        filter
    }

    pub fn viewer(&self) -> Option<&str> {
        self.viewer.as_deref()
    }

    /// True when keyword or regex rules are present. These are only ever
    /// evaluated by [`permits`](Self::permits).
    pub fn has_text_rules(&self) -> bool {
        self.keyword_pattern.is_some() || !self.regexes.is_empty()
    }

    /// True when no rule would exclude or flag anything.
    pub fn is_empty(&self) -> bool {
        self.blocked_users.is_empty()
            && self.hidden_users.is_empty()
            && self.keyword_pattern.is_none()
            && self.blocked_tags.is_empty()
            && self.regexes.is_empty()
            && self.blocked_by.is_empty()
    }

    pub fn blocked_users(&self) -> &BTreeSet<String> {
        &self.blocked_users
    }

    pub fn hidden_users(&self) -> &BTreeSet<String> {
        &self.hidden_users
    }

    pub fn blocked_tags(&self) -> &BTreeSet<i32> {
        &self.blocked_tags
    }

    pub fn keyword_pattern(&self) -> Option<&Regex> {
        self.keyword_pattern.as_ref()
    }

    pub fn regexes(&self) -> &[Regex] {
        &self.regexes
    }

    pub fn is_blocked_by(&self, uuid: &str) -> bool {
        self.blocked_by.contains(uuid)
    }

    pub fn matches_keyword(&self, text: &str) -> bool {
        self.keyword_pattern
            .as_ref()
            .map_or(false, |re| re.is_match(text))
    }

    pub fn matches_regex(&self, text: &str) -> bool {
        self.regexes.iter().any(|re| re.is_match(text))
    }

    /// SQL exclusions for the block, hide and tag bindings.
    pub fn condition<C>(&self, bindings: &[FieldBinding<C>]) -> Condition
    where
        C: ColumnTrait,
    {
        let mut cond = Condition::all();

        for binding in bindings {
            match binding {
                FieldBinding::BlockedUser(col) if !self.blocked_users.is_empty() => {
                    cond = cond.add(col.is_not_in(self.blocked_users.iter().cloned()));
                }
                FieldBinding::HiddenUser(col) if !self.hidden_users.is_empty() => {
                    cond = cond.add(col.is_not_in(self.hidden_users.iter().cloned()));
                }
                FieldBinding::Tag(col) if !self.blocked_tags.is_empty() => {
                    cond = cond.add(col.is_not_in(self.blocked_tags.iter().copied()));
                }
                FieldBinding::TaggedVia { id, link } if !self.blocked_tags.is_empty() => {
                    cond = cond.add(id.not_in_subquery(link.owners_tagged_with(&self.blocked_tags)));
                }
                _ => {}
            }
        }

        cond
    }

    /// In-process check of every binding readable from `model`.
    /// `TaggedVia` bindings need the link table and are only applied in SQL.
    pub fn permits<M>(
        &self,
        model: &M,
        bindings: &[FieldBinding<<M::Entity as EntityTrait>::Column>],
    ) -> bool
    where
        M: ModelTrait,
    {
        bindings.iter().all(|binding| match binding {
            FieldBinding::BlockedUser(col) => string_value(model.get(*col))
                .map_or(true, |uuid| !self.blocked_users.contains(&uuid)),
            FieldBinding::HiddenUser(col) => string_value(model.get(*col))
                .map_or(true, |uuid| !self.hidden_users.contains(&uuid)),
            FieldBinding::Keyword(col) => {
                string_value(model.get(*col)).map_or(true, |text| !self.matches_keyword(&text))
            }
            FieldBinding::Regex(col) => {
                string_value(model.get(*col)).map_or(true, |text| !self.matches_regex(&text))
            }
            FieldBinding::Tag(col) => {
                tag_value(model.get(*col)).map_or(true, |id| !self.blocked_tags.contains(&id))
            }
            FieldBinding::TaggedVia { .. } => true,
        })
    }

    /// The `isBlockedByOther` projection: true when a `BlockedUser` column of
    /// `model` names someone who has blocked the viewer.
    pub fn is_blocked_by_other<M>(
        &self,
        model: &M,
        bindings: &[FieldBinding<<M::Entity as EntityTrait>::Column>],
    ) -> bool
    where
        M: ModelTrait,
    {
        bindings.iter().any(|binding| match binding {
            FieldBinding::BlockedUser(col) => {
                string_value(model.get(*col)).map_or(false, |uuid| self.blocked_by.contains(&uuid))
            }
            _ => false,
        })
    }
}

/// All active rules owned by `viewer_uuid`, oldest first.
async fn rules_of<C>(conn: &C, viewer_uuid: &str) -> Result<Vec<block_entries::Model>, DbErr>
where
    C: ConnectionTrait,
{
    block_entries::Entity::find()
        .filter(block_entries::Column::OperatorUuid.eq(viewer_uuid))
        .order_by_asc(block_entries::Column::Id)
        .all(conn)
        .await
}

/// UUIDs of users who have blocked `viewer_uuid`.
async fn blockers_of<C>(conn: &C, viewer_uuid: &str) -> Result<Vec<String>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(block_entries::Entity::find()
        .filter(block_entries::Column::Kind.eq(BlockKind::Block))
        .filter(block_entries::Column::Value.eq(viewer_uuid))
        .all(conn)
        .await?
        .into_iter()
        .map(|entry| entry.operator_uuid)
        .collect())
}

/// Builds filters and answers point queries for content listings.
#[derive(Clone)]
pub struct VisibilityFilterBuilder {
    db: DatabaseConnection,
    verifier: Arc<dyn CredentialVerifier>,
    directory: Arc<dyn UserDirectory>,
}

impl VisibilityFilterBuilder {
    pub fn new(
        db: DatabaseConnection,
        verifier: Arc<dyn CredentialVerifier>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            db,
            verifier,
            directory,
        }
    }

    pub fn with_database_identity(db: DatabaseConnection) -> Self {
        let identity = Arc::new(DatabaseIdentity::new(db.clone()));
        Self::new(db, identity.clone(), identity)
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The viewer's UUID when the credential verifies, `None` otherwise.
    ///
    /// Anonymous and unverified viewers are treated alike: they see
    /// everything. Store failures still propagate.
    pub async fn authenticated_viewer<'a>(
        &self,
        viewer: Option<&'a Credential>,
    ) -> Result<Option<&'a str>, BlockError> {
        let credential = match viewer {
            Some(credential) => credential,
            None => return Ok(None),
        };

        if self
            .verifier
            .verify_credential(&credential.uuid, &credential.token)
            .await?
        {
            Ok(Some(credential.uuid.as_str()))
        } else {
            log::debug!(
                "Viewer {} failed authentication, serving unfiltered content",
                credential.uuid
            );
            Ok(None)
        }
    }

    /// Snapshot the viewer's rules.
    pub async fn build(&self, viewer: Option<&Credential>) -> Result<VisibilityFilter, BlockError> {
        let viewer_uuid = match self.authenticated_viewer(viewer).await? {
            Some(uuid) => uuid,
            None => return Ok(VisibilityFilter::empty()),
        };

        let (entries, blocked_by) = try_join(
            rules_of(&self.db, viewer_uuid),
            blockers_of(&self.db, viewer_uuid),
        )
        .await?;

        Ok(VisibilityFilter::from_entries(
            viewer_uuid,
            &entries,
            blocked_by,
        ))
    }

    /// Relationship between the viewer and the user with numeric id `target_id`.
    pub async fn relation_to(
        &self,
        viewer: Option<&Credential>,
        target_id: i32,
    ) -> Result<RelationView, BlockError> {
        let target_uuid = self
            .directory
            .resolve_identifier(target_id)
            .await?
            .ok_or_else(|| BlockError::NotFound(format!("user {}", target_id)))?;

        self.relation_to_uuid(viewer, &target_uuid).await
    }

    /// Relationship between the viewer and the user `target_uuid`.
    pub async fn relation_to_uuid(
        &self,
        viewer: Option<&Credential>,
        target_uuid: &str,
    ) -> Result<RelationView, BlockError> {
        let viewer_uuid = match self.authenticated_viewer(viewer).await? {
            Some(uuid) if uuid != target_uuid => uuid,
            _ => return Ok(RelationView::default()),
        };

        let (outgoing, incoming) = try_join(
            relation::is_target_blocked_by_viewer(&self.db, target_uuid, viewer_uuid),
            relation::is_viewer_blocked_by_target(&self.db, target_uuid, viewer_uuid),
        )
        .await?;

        Ok(RelationView::resolve(outgoing, incoming))
    }
}
