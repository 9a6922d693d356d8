use super::error::ApiResponse;
use crate::block::{BlockError, VisibilityFilterBuilder};
use crate::content::home_feed;
use crate::middleware::Viewer;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

/// Page size when the client does not ask for one.
const FEED_PAGE_SIZE: u64 = 20;
/// Hard upper bound on a single feed page.
const FEED_PAGE_SIZE_MAX: u64 = 100;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_home_feed);
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Newest videos, with the viewer's block list applied.
#[get("/feed/home")]
pub async fn view_home_feed(
    filters: web::Data<VisibilityFilterBuilder>,
    viewer: Viewer,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse, BlockError> {
    let filter = filters.build(viewer.credential()).await?;
    let page_size = query
        .page_size
        .unwrap_or(FEED_PAGE_SIZE)
        .clamp(1, FEED_PAGE_SIZE_MAX);

    let page = home_feed(filters.db(), &filter, query.page.unwrap_or(1), page_size).await?;
    Ok(ApiResponse::ok("Home feed", page))
}
