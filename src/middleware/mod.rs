mod viewer;

pub use viewer::{Viewer, TOKEN_COOKIE, UUID_COOKIE};
