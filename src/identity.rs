//! Collaborator contracts for the session and user-directory services.
//!
//! The block list never issues or refreshes credentials. It only asks
//! whether a `(uuid, token)` pair is currently valid and translates between
//! numeric user ids and stable UUIDs.

use crate::orm::{user_sessions, users};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use serde::{Deserialize, Serialize};

/// A user's stable identifier plus the session token presented with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub uuid: String,
    pub token: String,
}

impl Credential {
    pub fn new(uuid: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            token: token.into(),
        }
    }
}

/// Public profile fields joined into block list responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub uuid: String,
    pub username: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

impl From<users::Model> for UserSummary {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid,
            username: user.username,
            nickname: user.nickname,
            avatar: user.avatar,
        }
    }
}

/// Session service contract.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns true when `token` is a live session for `uuid`.
    async fn verify_credential(&self, uuid: &str, token: &str) -> Result<bool, DbErr>;
}

/// User directory contract.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Numeric id to UUID.
    async fn resolve_identifier(&self, id: i32) -> Result<Option<String>, DbErr>;

    /// UUID to numeric id.
    async fn resolve_numeric_id(&self, uuid: &str) -> Result<Option<i32>, DbErr>;

    /// Profiles for a batch of UUIDs. Unknown UUIDs are skipped.
    async fn find_summaries(&self, uuids: &[String]) -> Result<Vec<UserSummary>, DbErr>;
}

/// Directory and session lookups backed by the shared database.
#[derive(Clone, Debug)]
pub struct DatabaseIdentity {
    db: DatabaseConnection,
}

impl DatabaseIdentity {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialVerifier for DatabaseIdentity {
    async fn verify_credential(&self, uuid: &str, token: &str) -> Result<bool, DbErr> {
        if uuid.is_empty() || token.is_empty() {
            return Ok(false);
        }

        let session = user_sessions::Entity::find_by_id(token.to_owned())
            .filter(user_sessions::Column::UserUuid.eq(uuid))
            .filter(user_sessions::Column::ExpiresAt.gt(Utc::now().naive_utc()))
            .one(&self.db)
            .await?;

        Ok(session.is_some())
    }
}

#[async_trait]
impl UserDirectory for DatabaseIdentity {
    async fn resolve_identifier(&self, id: i32) -> Result<Option<String>, DbErr> {
        Ok(users::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|user| user.uuid))
    }

    async fn resolve_numeric_id(&self, uuid: &str) -> Result<Option<i32>, DbErr> {
        Ok(users::Entity::find()
            .filter(users::Column::Uuid.eq(uuid))
            .one(&self.db)
            .await?
            .map(|user| user.id))
    }

    async fn find_summaries(&self, uuids: &[String]) -> Result<Vec<UserSummary>, DbErr> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(users::Entity::find()
            .filter(users::Column::Uuid.is_in(uuids.iter().cloned()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(UserSummary::from)
            .collect())
    }
}
