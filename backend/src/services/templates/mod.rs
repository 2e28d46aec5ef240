//! # Template Service Module
//!
//! Routes under `/api/templates`:
//!
//! *   **`POST /`** (`create`): multipart upload with a `json` part describing
//!     the template and a `file` part holding its zip archive. The archive is
//!     stored as media, extracted under `/templates/<token>/` and the record is
//!     created with the extracted text files and entry point.
//! *   **`PUT /{template_id}/archive`** (`replace_archive`): uploads a new
//!     archive for an existing template. Files, dependencies, entry point and
//!     preview URL are recomputed; slug and status are kept.
//! *   **`GET /`** (`list`): all templates, or only active ones with `?active=true`.
//! *   **`GET /{template_id}`** (`get`): a single template.

mod create;
mod get;
mod list;
mod replace_archive;

use actix_web::web::{get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/templates";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("", get().to(list::process))
        .route("/{template_id}", get().to(get::process))
        .route("/{template_id}/archive", put().to(replace_archive::process))
}
