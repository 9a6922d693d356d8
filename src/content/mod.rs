//! Content lookups that honour the viewer's block list.
//!
//! Each call site declares how its columns map to rule categories; the
//! filter logic itself lives in [`crate::block::visibility`].

use crate::block::{
    BlockError, FieldBinding, Page, RelationView, TagLink, TagSummary, VisibilityFilter,
    VisibilityFilterBuilder,
};
use crate::identity::{Credential, UserSummary};
use crate::orm::{tags, users, video_tags, videos};
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, PaginatorTrait};
use serde::Serialize;

/// How the home feed's columns map to rule categories.
pub const HOME_FEED_BINDINGS: [FieldBinding<videos::Column>; 5] = [
    FieldBinding::BlockedUser(videos::Column::UploaderUuid),
    FieldBinding::HiddenUser(videos::Column::UploaderUuid),
    FieldBinding::Keyword(videos::Column::Title),
    FieldBinding::Regex(videos::Column::Title),
    FieldBinding::TaggedVia {
        id: videos::Column::Id,
        link: TagLink::VideoTags,
    },
];

/// A video in a listing.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCard {
    pub id: i32,
    pub title: String,
    pub uploader_id: i32,
    pub uploader_uuid: String,
    pub created_at: NaiveDateTime,
    pub is_blocked_by_other: bool,
}

/// Rows fetched per round trip when text rules force an in-process scan.
const FEED_SCAN_BATCH: usize = 200;

fn video_card(filter: &VisibilityFilter, video: videos::Model) -> VideoCard {
    VideoCard {
        is_blocked_by_other: filter.is_blocked_by_other(&video, &HOME_FEED_BINDINGS),
        id: video.id,
        title: video.title,
        uploader_id: video.uploader_id,
        uploader_uuid: video.uploader_uuid,
        created_at: video.created_at,
    }
}

/// Newest videos the viewer may see.
///
/// Block, hide and tag rules are applied in SQL. Keyword and regex rules
/// have no portable SQL form, so when the viewer has any, the SQL-filtered
/// rows are walked newest first and pagination and `total` are computed
/// over the rows that pass.
pub async fn home_feed(
    db: &DatabaseConnection,
    filter: &VisibilityFilter,
    page: u64,
    page_size: u64,
) -> Result<Page<VideoCard>, DbErr> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let skip = (page - 1) * page_size;

    let select = videos::Entity::find()
        .filter(filter.condition(&HOME_FEED_BINDINGS))
        .order_by_desc(videos::Column::CreatedAt)
        .order_by_desc(videos::Column::Id);

    if !filter.has_text_rules() {
        let total = select.clone().count(db).await? as u64;
        let items = select
            .offset(skip)
            .limit(page_size)
            .all(db)
            .await?
            .into_iter()
            .map(|video| video_card(filter, video))
            .collect();

        return Ok(Page {
            items,
            total,
            page,
            page_size,
        });
    }

    let mut items = Vec::new();
    let mut total = 0u64;
    let mut batches = select.paginate(db, FEED_SCAN_BATCH);
    while let Some(batch) = batches.fetch_and_next().await? {
        for video in batch {
            if !filter.permits(&video, &HOME_FEED_BINDINGS) {
                continue;
            }
            if total >= skip && (items.len() as u64) < page_size {
                items.push(video_card(filter, video));
            }
            total += 1;
        }
    }

    Ok(Page {
        items,
        total,
        page,
        page_size,
    })
}

/// Body of a video, withheld when the uploader is not visible to the viewer.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoBody {
    pub title: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub tags: Vec<TagSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub id: i32,
    pub uploader_id: i32,
    pub relation: RelationView,
    pub video: Option<VideoBody>,
}

async fn tags_of(db: &DatabaseConnection, video_id: i32) -> Result<Vec<TagSummary>, DbErr> {
    let ids: Vec<i32> = video_tags::Entity::find()
        .filter(video_tags::Column::VideoId.eq(video_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.tag_id)
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(tags::Entity::find()
        .filter(tags::Column::Id.is_in(ids))
        .order_by_asc(tags::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|tag| TagSummary {
            id: tag.id,
            name: tag.name,
        })
        .collect())
}

/// One video with the viewer's relationship to its uploader.
pub async fn video_detail(
    builder: &VisibilityFilterBuilder,
    viewer: Option<&Credential>,
    video_id: i32,
) -> Result<VideoDetail, BlockError> {
    let db = builder.db();
    let video = videos::Entity::find_by_id(video_id)
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("video {}", video_id)))?;

    let relation = builder.relation_to_uuid(viewer, &video.uploader_uuid).await?;
    let body = if relation.is_visible() {
        Some(VideoBody {
            tags: tags_of(db, video.id).await?,
            title: video.title,
            description: video.description,
            created_at: video.created_at,
        })
    } else {
        None
    };

    Ok(VideoDetail {
        id: video.id,
        uploader_id: video.uploader_id,
        relation,
        video: body,
    })
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: i32,
    pub relation: RelationView,
    /// Withheld when the user is not visible to the viewer.
    pub user: Option<UserSummary>,
}

/// A user's public profile with the viewer's relationship to them.
pub async fn user_profile(
    builder: &VisibilityFilterBuilder,
    viewer: Option<&Credential>,
    uid: i32,
) -> Result<UserProfile, BlockError> {
    let user = users::Entity::find_by_id(uid)
        .one(builder.db())
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("user {}", uid)))?;

    let relation = builder.relation_to_uuid(viewer, &user.uuid).await?;

    Ok(UserProfile {
        uid: user.id,
        relation,
        user: relation.is_visible().then(|| UserSummary::from(user)),
    })
}
