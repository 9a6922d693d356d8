use super::error::ApiResponse;
use crate::block::{BlockError, VisibilityFilterBuilder};
use crate::content::user_profile;
use crate::middleware::Viewer;
use actix_web::{get, web, HttpResponse};

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_member);
}

#[get("/user/{user_id}")]
pub async fn view_member(
    filters: web::Data<VisibilityFilterBuilder>,
    viewer: Viewer,
    path: web::Path<(i32,)>,
) -> Result<HttpResponse, BlockError> {
    let user_id = path.into_inner().0;
    let profile = user_profile(&filters, viewer.credential(), user_id).await?;
    Ok(ApiResponse::ok("User profile", profile))
}
