//! Persistent block rules.
//!
//! Every rule kind shares one code path: structural validation, credential
//! check, duplicate check, cap check, insert. The last three run inside a
//! transaction and the `(kind, value, operator_uuid)` unique index turns a
//! racing double submit into a [`BlockError::Conflict`].

use super::audit::{self, Reverser};
use super::error::{is_unique_violation, BlockError};
use super::validate;
use crate::app_config::BlockLimits;
use crate::identity::{CredentialVerifier, Credential, DatabaseIdentity, UserDirectory, UserSummary};
use crate::orm::{block_entries, block_entries::BlockKind, tags, unblock_audit};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr, PaginatorTrait,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A rule as submitted by an operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    Block { target_id: i32 },
    Hide { target_id: i32 },
    Keyword(String),
    Tag(i32),
    Regex(String),
}

impl Rule {
    pub fn kind(&self) -> BlockKind {
        match self {
            Rule::Block { .. } => BlockKind::Block,
            Rule::Hide { .. } => BlockKind::Hide,
            Rule::Keyword(_) => BlockKind::Keyword,
            Rule::Tag(_) => BlockKind::Tag,
            Rule::Regex(_) => BlockKind::Regex,
        }
    }
}

/// Tag fields joined into tag rule listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    pub id: i32,
    pub name: String,
}

/// A listed rule with its joined target.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleView {
    pub id: i32,
    pub kind: BlockKind,
    pub value: String,
    pub created_at: NaiveDateTime,
    /// Target profile for block and hide rules
    pub target: Option<UserSummary>,
    /// Tag metadata for tag rules, when the tag exists
    pub tag: Option<TagSummary>,
}

impl From<block_entries::Model> for RuleView {
    fn from(entry: block_entries::Model) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind,
            value: entry.value,
            created_at: entry.created_at,
            target: None,
            tag: None,
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Look up one active rule.
pub async fn find_rule<C>(
    conn: &C,
    kind: BlockKind,
    value: &str,
    operator_uuid: &str,
) -> Result<Option<block_entries::Model>, DbErr>
where
    C: ConnectionTrait,
{
    block_entries::Entity::find()
        .filter(block_entries::Column::Kind.eq(kind))
        .filter(block_entries::Column::Value.eq(value))
        .filter(block_entries::Column::OperatorUuid.eq(operator_uuid))
        .one(conn)
        .await
}

/// Number of active rules of one kind owned by an operator.
pub async fn count_rules_on<C>(conn: &C, operator_uuid: &str, kind: BlockKind) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let count = block_entries::Entity::find()
        .filter(block_entries::Column::OperatorUuid.eq(operator_uuid))
        .filter(block_entries::Column::Kind.eq(kind))
        .count(conn)
        .await?;
    Ok(count as u64)
}

/// Insert one rule row. A unique index hit becomes [`BlockError::Conflict`].
pub async fn insert_entry<C>(
    conn: &C,
    kind: BlockKind,
    value: &str,
    operator_id: i32,
    operator_uuid: &str,
) -> Result<block_entries::Model, BlockError>
where
    C: ConnectionTrait,
{
    block_entries::ActiveModel {
        kind: Set(kind),
        value: Set(value.to_owned()),
        operator_id: Set(operator_id),
        operator_uuid: Set(operator_uuid.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            BlockError::Conflict {
                kind,
                value: value.to_owned(),
            }
        } else {
            BlockError::Store(e)
        }
    })
}

/// Block list store.
#[derive(Clone)]
pub struct BlockListStore {
    db: DatabaseConnection,
    limits: BlockLimits,
    verifier: Arc<dyn CredentialVerifier>,
    directory: Arc<dyn UserDirectory>,
}

impl BlockListStore {
    pub fn new(
        db: DatabaseConnection,
        limits: BlockLimits,
        verifier: Arc<dyn CredentialVerifier>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            db,
            limits,
            verifier,
            directory,
        }
    }

    /// Store whose collaborators read the shared database directly.
    pub fn with_database_identity(db: DatabaseConnection, limits: BlockLimits) -> Self {
        let identity = Arc::new(DatabaseIdentity::new(db.clone()));
        Self::new(db, limits, identity.clone(), identity)
    }

    pub fn limits(&self) -> &BlockLimits {
        &self.limits
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Verify the credential and return the operator's numeric id.
    async fn authenticate(&self, credential: &Credential) -> Result<i32, BlockError> {
        if !self
            .verifier
            .verify_credential(&credential.uuid, &credential.token)
            .await?
        {
            return Err(BlockError::Unauthorized);
        }

        self.directory
            .resolve_numeric_id(&credential.uuid)
            .await?
            .ok_or(BlockError::Unauthorized)
    }

    /// Resolve a user target to its UUID, refusing self-targeting.
    async fn resolve_target(
        &self,
        credential: &Credential,
        kind: BlockKind,
        target_id: i32,
    ) -> Result<String, BlockError> {
        validate::validate_user_id(target_id)?;

        let target_uuid = self
            .directory
            .resolve_identifier(target_id)
            .await?
            .ok_or_else(|| BlockError::NotFound(format!("user {}", target_id)))?;

        if target_uuid == credential.uuid {
            return Err(BlockError::validation(format!("cannot {} self", kind)));
        }

        Ok(target_uuid)
    }

    /// Validate `rule` and produce the string stored in `value`.
    async fn validated_value(
        &self,
        credential: &Credential,
        rule: &Rule,
    ) -> Result<String, BlockError> {
        match rule {
            Rule::Block { target_id } | Rule::Hide { target_id } => {
                self.resolve_target(credential, rule.kind(), *target_id)
                    .await
            }
            Rule::Keyword(keyword) => {
                validate::validate_keyword(keyword, &self.limits)?;
                Ok(keyword.to_owned())
            }
            Rule::Tag(tag_id) => {
                validate::validate_tag(*tag_id)?;
                Ok(tag_id.to_string())
            }
            Rule::Regex(pattern) => {
                validate::validate_regex(pattern, &self.limits)?;
                Ok(pattern.to_owned())
            }
        }
    }

    /// Stored value for a removal lookup. No structural validation; a value
    /// that was never valid simply matches nothing.
    async fn lookup_value(&self, rule: &Rule) -> Result<String, BlockError> {
        match rule {
            Rule::Block { target_id } | Rule::Hide { target_id } => self
                .directory
                .resolve_identifier(*target_id)
                .await?
                .ok_or_else(|| BlockError::NotFound(format!("user {}", target_id))),
            Rule::Keyword(text) | Rule::Regex(text) => Ok(text.to_owned()),
            Rule::Tag(tag_id) => Ok(tag_id.to_string()),
        }
    }

    /// Add a rule for the credential's owner.
    pub async fn add_rule(
        &self,
        credential: &Credential,
        rule: &Rule,
    ) -> Result<block_entries::Model, BlockError> {
        let result = self.insert_rule(credential, rule).await;
        match &result {
            Ok(entry) => log::info!(
                "User {} added {} rule {}",
                entry.operator_uuid,
                entry.kind,
                entry.id
            ),
            Err(BlockError::Store(e)) => {
                log::error!("Failed to add {} rule: {}", rule.kind(), e)
            }
            Err(e) => log::debug!(
                "Rejected {} rule from {}: {}",
                rule.kind(),
                credential.uuid,
                e
            ),
        }
        result
    }

    async fn insert_rule(
        &self,
        credential: &Credential,
        rule: &Rule,
    ) -> Result<block_entries::Model, BlockError> {
        let kind = rule.kind();
        let value = self.validated_value(credential, rule).await?;
        let operator_id = self.authenticate(credential).await?;

        let txn = self.db.begin().await?;

        if find_rule(&txn, kind, &value, &credential.uuid)
            .await?
            .is_some()
        {
            return Err(BlockError::Conflict { kind, value });
        }

        // Adds of different values can each pass this count concurrently
        // under read committed, so the cap is a soft limit.
        let cap = self.limits.cap(kind);
        if count_rules_on(&txn, &credential.uuid, kind).await? >= cap {
            return Err(BlockError::Capacity { kind, cap });
        }

        let entry = insert_entry(&txn, kind, &value, operator_id, &credential.uuid).await?;

        txn.commit().await?;

        Ok(entry)
    }

    /// Remove a rule, moving it to the audit ledger in the same transaction.
    pub async fn remove_rule(
        &self,
        credential: &Credential,
        rule: &Rule,
    ) -> Result<unblock_audit::Model, BlockError> {
        let result = self.reverse_rule(credential, rule).await;
        match &result {
            Ok(record) => log::info!(
                "User {} removed {} rule '{}'",
                record.reversing_operator_uuid,
                record.kind,
                record.value
            ),
            Err(BlockError::Store(e)) => {
                log::error!("Failed to remove {} rule: {}", rule.kind(), e)
            }
            Err(e) => log::debug!(
                "Rejected {} removal from {}: {}",
                rule.kind(),
                credential.uuid,
                e
            ),
        }
        result
    }

    async fn reverse_rule(
        &self,
        credential: &Credential,
        rule: &Rule,
    ) -> Result<unblock_audit::Model, BlockError> {
        let kind = rule.kind();
        let operator_id = self.authenticate(credential).await?;
        let value = self.lookup_value(rule).await?;

        let txn = self.db.begin().await?;

        let entry = find_rule(&txn, kind, &value, &credential.uuid)
            .await?
            .ok_or_else(|| BlockError::NotFound(format!("{} rule '{}'", kind, value)))?;

        let record = audit::record(
            &txn,
            &entry,
            Reverser {
                id: operator_id,
                uuid: &credential.uuid,
            },
        )
        .await?;

        block_entries::Entity::delete_by_id(entry.id)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(record)
    }

    fn clamp_page(&self, page: u64, page_size: u64) -> (u64, u64) {
        (page.max(1), page_size.clamp(1, self.limits.max_page_size.max(1)))
    }

    /// List the credential owner's rules of one kind, newest first.
    pub async fn list_rules(
        &self,
        credential: &Credential,
        kind: BlockKind,
        page: u64,
        page_size: u64,
    ) -> Result<Page<RuleView>, BlockError> {
        self.authenticate(credential).await?;
        let (page, page_size) = self.clamp_page(page, page_size);

        let select = block_entries::Entity::find()
            .filter(block_entries::Column::OperatorUuid.eq(credential.uuid.as_str()))
            .filter(block_entries::Column::Kind.eq(kind));

        let total = select.clone().count(&self.db).await? as u64;
        let entries = select
            .order_by_desc(block_entries::Column::CreatedAt)
            .order_by_desc(block_entries::Column::Id)
            .offset((page - 1) * page_size)
            .limit(page_size)
            .all(&self.db)
            .await?;

        let mut items: Vec<RuleView> = entries.into_iter().map(RuleView::from).collect();
        if kind.targets_user() {
            self.join_targets(&mut items).await?;
        } else if kind == BlockKind::Tag {
            self.join_tags(&mut items).await?;
        }

        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    async fn join_targets(&self, items: &mut [RuleView]) -> Result<(), DbErr> {
        let uuids: Vec<String> = items.iter().map(|item| item.value.clone()).collect();
        let mut profiles: HashMap<String, UserSummary> = self
            .directory
            .find_summaries(&uuids)
            .await?
            .into_iter()
            .map(|profile| (profile.uuid.clone(), profile))
            .collect();

        for item in items.iter_mut() {
            item.target = profiles.remove(&item.value);
        }
        Ok(())
    }

    async fn join_tags(&self, items: &mut [RuleView]) -> Result<(), DbErr> {
        let ids: Vec<i32> = items
            .iter()
            .filter_map(|item| item.value.parse().ok())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let names: HashMap<i32, String> = tags::Entity::find()
            .filter(tags::Column::Id.is_in(ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|tag| (tag.id, tag.name))
            .collect();

        for item in items.iter_mut() {
            item.tag = item.value.parse::<i32>().ok().and_then(|id| {
                names.get(&id).map(|name| TagSummary {
                    id,
                    name: name.clone(),
                })
            });
        }
        Ok(())
    }

    /// Count an operator's rules of one kind. Store failures propagate.
    pub async fn count_rules(&self, operator_uuid: &str, kind: BlockKind) -> Result<u64, BlockError> {
        Ok(count_rules_on(&self.db, operator_uuid, kind).await?)
    }

    /// The credential owner's reversed rules, newest first.
    pub async fn reversal_history(
        &self,
        credential: &Credential,
        kind: Option<BlockKind>,
        page: u64,
        page_size: u64,
    ) -> Result<Page<unblock_audit::Model>, BlockError> {
        self.authenticate(credential).await?;
        let (page, page_size) = self.clamp_page(page, page_size);

        let (items, total) = audit::history(
            &self.db,
            &credential.uuid,
            kind,
            (page - 1) * page_size,
            page_size,
        )
        .await?;

        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }
}
