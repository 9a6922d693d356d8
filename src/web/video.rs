use super::error::ApiResponse;
use crate::block::{BlockError, VisibilityFilterBuilder};
use crate::content::video_detail;
use crate::middleware::Viewer;
use actix_web::{get, web, HttpResponse};

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_video);
}

/// A video page. The body is withheld when its uploader is blocked or hidden.
#[get("/video/{video_id}")]
pub async fn view_video(
    filters: web::Data<VisibilityFilterBuilder>,
    viewer: Viewer,
    path: web::Path<(i32,)>,
) -> Result<HttpResponse, BlockError> {
    let video_id = path.into_inner().0;
    let detail = video_detail(&filters, viewer.credential(), video_id).await?;
    Ok(ApiResponse::ok("Video", detail))
}
