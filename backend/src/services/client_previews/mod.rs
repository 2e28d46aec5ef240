//! # Client Preview Service Module
//!
//! Routes under `/api/client-previews`:
//!
//! *   **`POST /`** (`create`): creates a preview of a template for one client
//!     and builds it at once.
//! *   **`PUT /{preview_id}/customizations`** (`update`): replaces the
//!     customizations and rebuilds the same namespace.
//! *   **`GET /{preview_id}`** (`get`): the preview record with its build and
//!     deployment state.
//!
//! Builds are awaited by the request: the record moves to `building`, the
//! pipeline runs on the blocking pool, and the record ends `built` (with its
//! preview URL) or `failed` (with the error message).

mod build;
mod create;
mod get;
mod update;

use actix_web::web::{get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/client-previews";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("/{preview_id}", get().to(get::process))
        .route("/{preview_id}/customizations", put().to(update::process))
}
