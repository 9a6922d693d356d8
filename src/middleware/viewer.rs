//! Request extractor for the caller's session cookies.

use crate::identity::Credential;
use actix_web::dev::Payload;
use actix_web::{Error, FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// Cookie holding the user's UUID.
pub const UUID_COOKIE: &str = "uuid";
/// Cookie holding the session token.
pub const TOKEN_COOKIE: &str = "token";

/// The credential presented with a request, if both cookies are set.
///
/// Nothing is verified here; the block list verifies on use so anonymous
/// and unverified viewers can share content routes.
#[derive(Clone, Debug, Default)]
pub struct Viewer(pub Option<Credential>);

impl Viewer {
    pub fn from_request_cookies(req: &HttpRequest) -> Self {
        let uuid = req.cookie(UUID_COOKIE).map(|c| c.value().to_owned());
        let token = req.cookie(TOKEN_COOKIE).map(|c| c.value().to_owned());

        match (uuid, token) {
            (Some(uuid), Some(token)) if !uuid.is_empty() && !token.is_empty() => {
                Viewer(Some(Credential::new(uuid, token)))
            }
            _ => Viewer(None),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.0.as_ref()
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Viewer::from_request_cookies(req)))
    }
}
