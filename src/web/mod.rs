pub mod block;
pub mod error;
pub mod feed;
pub mod member;
pub mod video;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    block::configure(conf);
    feed::configure(conf);
    member::configure(conf);
    video::configure(conf);
}
