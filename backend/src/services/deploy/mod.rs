//! Deployment of built previews.
//!
//! - `POST /api/deploy`: checks that the preview is built and not already
//!   deploying, marks it `deploying` and starts a background job. Returns
//!   `{ "job_id": ... }` at once.
//! - `GET /api/deploy/status/{job_id}`: the job's current `JobStatus`.
//!
//! The job creates the repository, records its URL on the preview, deploys it
//! and records the deployment URL (and custom domain). Any failure marks the
//! preview's deployment `failed` and the job `Failed`.

mod get_status;
mod start;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/deploy";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(start::process))
        .route("/status/{job_id}", get().to(get_status::process))
}
