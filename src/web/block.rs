//! Block list endpoints.

use super::error::{invalid_payload, ApiResponse};
use crate::block::{BlockError, BlockKind, BlockListStore, Rule, VisibilityFilterBuilder};
use crate::identity::Credential;
use crate::middleware::Viewer;
use crate::orm::unblock_audit;
use actix_web::{get, post, web, HttpResponse};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(block_user)
        .service(hide_user)
        .service(add_keyword)
        .service(add_tag)
        .service(add_regex)
        .service(unblock_user)
        .service(unhide_user)
        .service(remove_keyword)
        .service(remove_tag)
        .service(remove_regex)
        .service(list_rules)
        .service(view_history)
        .service(check_user);
}

#[derive(Deserialize, Validate)]
pub struct UserTargetForm {
    #[validate(range(min = 1))]
    pub uid: i32,
}

#[derive(Deserialize, Validate)]
pub struct KeywordForm {
    #[validate(length(min = 1))]
    pub keyword: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TagForm {
    #[validate(range(min = 1))]
    pub tag_id: i32,
}

#[derive(Deserialize, Validate)]
pub struct RegexForm {
    #[validate(length(min = 1))]
    pub regex: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub kind: BlockKind,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub kind: Option<BlockKind>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Deserialize)]
pub struct CheckQuery {
    pub uid: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddedRule {
    id: i32,
    kind: BlockKind,
    value: String,
    created_at: NaiveDateTime,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReversedRule {
    kind: BlockKind,
    value: String,
    created_at: NaiveDateTime,
    reversed_at: NaiveDateTime,
}

impl From<unblock_audit::Model> for ReversedRule {
    fn from(record: unblock_audit::Model) -> Self {
        Self {
            kind: record.kind,
            value: record.value,
            created_at: record.created_at,
            reversed_at: record.reversed_at,
        }
    }
}

fn require_credential(viewer: &Viewer) -> Result<&Credential, BlockError> {
    viewer.credential().ok_or(BlockError::Unauthorized)
}

async fn add(store: &BlockListStore, viewer: &Viewer, rule: Rule) -> Result<HttpResponse, BlockError> {
    let entry = store.add_rule(require_credential(viewer)?, &rule).await?;
    Ok(ApiResponse::ok(
        format!("Added {} rule", entry.kind),
        AddedRule {
            id: entry.id,
            kind: entry.kind,
            value: entry.value,
            created_at: entry.created_at,
        },
    ))
}

async fn remove(
    store: &BlockListStore,
    viewer: &Viewer,
    rule: Rule,
) -> Result<HttpResponse, BlockError> {
    let record = store.remove_rule(require_credential(viewer)?, &rule).await?;
    Ok(ApiResponse::ok(
        format!("Removed {} rule", record.kind),
        ReversedRule::from(record),
    ))
}

#[post("/block/user")]
pub async fn block_user(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<UserTargetForm>,
) -> Result<HttpResponse, BlockError> {
    form.validate().map_err(invalid_payload)?;
    add(&store, &viewer, Rule::Block { target_id: form.uid }).await
}

#[post("/block/hide")]
pub async fn hide_user(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<UserTargetForm>,
) -> Result<HttpResponse, BlockError> {
    form.validate().map_err(invalid_payload)?;
    add(&store, &viewer, Rule::Hide { target_id: form.uid }).await
}

#[post("/block/keyword")]
pub async fn add_keyword(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<KeywordForm>,
) -> Result<HttpResponse, BlockError> {
    form.validate().map_err(invalid_payload)?;
    let form = form.into_inner();
    add(&store, &viewer, Rule::Keyword(form.keyword)).await
}

#[post("/block/tag")]
pub async fn add_tag(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<TagForm>,
) -> Result<HttpResponse, BlockError> {
    form.validate().map_err(invalid_payload)?;
    add(&store, &viewer, Rule::Tag(form.tag_id)).await
}

#[post("/block/regex")]
pub async fn add_regex(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<RegexForm>,
) -> Result<HttpResponse, BlockError> {
    form.validate().map_err(invalid_payload)?;
    let form = form.into_inner();
    add(&store, &viewer, Rule::Regex(form.regex)).await
}

#[post("/block/user/delete")]
pub async fn unblock_user(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<UserTargetForm>,
) -> Result<HttpResponse, BlockError> {
    remove(&store, &viewer, Rule::Block { target_id: form.uid }).await
}

#[post("/block/hide/delete")]
pub async fn unhide_user(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<UserTargetForm>,
) -> Result<HttpResponse, BlockError> {
    remove(&store, &viewer, Rule::Hide { target_id: form.uid }).await
}

#[post("/block/keyword/delete")]
pub async fn remove_keyword(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<KeywordForm>,
) -> Result<HttpResponse, BlockError> {
    let form = form.into_inner();
    remove(&store, &viewer, Rule::Keyword(form.keyword)).await
}

#[post("/block/tag/delete")]
pub async fn remove_tag(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<TagForm>,
) -> Result<HttpResponse, BlockError> {
    remove(&store, &viewer, Rule::Tag(form.tag_id)).await
}

#[post("/block/regex/delete")]
pub async fn remove_regex(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    form: web::Json<RegexForm>,
) -> Result<HttpResponse, BlockError> {
    let form = form.into_inner();
    remove(&store, &viewer, Rule::Regex(form.regex)).await
}

#[get("/block/list")]
pub async fn list_rules(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, BlockError> {
    let page = store
        .list_rules(
            require_credential(&viewer)?,
            query.kind,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(20),
        )
        .await?;
    Ok(ApiResponse::ok("Block list", page))
}

#[get("/block/history")]
pub async fn view_history(
    store: web::Data<BlockListStore>,
    viewer: Viewer,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, BlockError> {
    let page = store
        .reversal_history(
            require_credential(&viewer)?,
            query.kind,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(20),
        )
        .await?;

    let items: Vec<ReversedRule> = page.items.into_iter().map(ReversedRule::from).collect();
    Ok(ApiResponse::ok(
        "Reversal history",
        crate::block::Page {
            items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        },
    ))
}

/// Relationship between the caller and another user.
#[get("/block/check")]
pub async fn check_user(
    filters: web::Data<VisibilityFilterBuilder>,
    viewer: Viewer,
    query: web::Query<CheckQuery>,
) -> Result<HttpResponse, BlockError> {
    let relation = filters.relation_to(viewer.credential(), query.uid).await?;
    Ok(ApiResponse::ok("Relationship", relation))
}
