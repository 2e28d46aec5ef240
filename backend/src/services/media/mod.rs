//! `POST /api/media`: stores an uploaded file (typically a client logo) and
//! returns its media record. The file is then served from `/media/<stored>`.

mod upload;

use actix_web::web::{post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/media";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("", post().to(upload::process))
}
