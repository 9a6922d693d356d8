//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::{Duration, Utc};
use kirakira::identity::Credential;
use kirakira::orm::{tags, user_sessions, users, video_tags, videos};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Test user fixture
pub struct TestUser {
    pub id: i32,
    pub uuid: String,
    pub username: String,
    /// Live session token
    pub token: String,
}

impl TestUser {
    pub fn credential(&self) -> Credential {
        Credential::new(self.uuid.clone(), self.token.clone())
    }

    /// Same UUID, token that was never issued.
    pub fn forged_credential(&self) -> Credential {
        Credential::new(self.uuid.clone(), "not-a-session")
    }
}

/// Create a user with a session that expires tomorrow
pub async fn create_test_user(db: &DatabaseConnection, username: &str) -> Result<TestUser, DbErr> {
    let uuid = format!("uuid-{}", username);
    let token = format!("token-{}", username);

    let user = users::ActiveModel {
        uuid: Set(uuid.clone()),
        username: Set(username.to_owned()),
        nickname: Set(Some(format!("{} nick", username))),
        avatar: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    create_session(db, &uuid, &token, Duration::days(1)).await?;

    Ok(TestUser {
        id: user.id,
        uuid,
        username: username.to_owned(),
        token,
    })
}

/// Create a session for `user_uuid` that expires `ttl` from now. A negative
/// `ttl` produces an already expired session.
pub async fn create_session(
    db: &DatabaseConnection,
    user_uuid: &str,
    token: &str,
    ttl: Duration,
) -> Result<user_sessions::Model, DbErr> {
    user_sessions::ActiveModel {
        token: Set(token.to_owned()),
        user_uuid: Set(user_uuid.to_owned()),
        expires_at: Set((Utc::now() + ttl).naive_utc()),
    }
    .insert(db)
    .await
}

pub async fn create_test_tag(db: &DatabaseConnection, name: &str) -> Result<tags::Model, DbErr> {
    tags::ActiveModel {
        name: Set(name.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a video uploaded by `uploader`, linked to `tag_ids`
pub async fn create_test_video(
    db: &DatabaseConnection,
    uploader: &TestUser,
    title: &str,
    tag_ids: &[i32],
) -> Result<videos::Model, DbErr> {
    let video = videos::ActiveModel {
        title: Set(title.to_owned()),
        description: Set(Some(format!("About {}", title))),
        uploader_id: Set(uploader.id),
        uploader_uuid: Set(uploader.uuid.clone()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for tag_id in tag_ids {
        video_tags::ActiveModel {
            video_id: Set(video.id),
            tag_id: Set(*tag_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(video)
}
