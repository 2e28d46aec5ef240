//! `PUT /api/templates/{template_id}/archive`: re-runs extraction and
//! classification with a new archive. Slug and status are left as they are.

use super::create::save_archive;
use crate::error::ServiceError;
use crate::pipeline::register_template;
use crate::services::uploads::field_name;
use crate::services::{failure, AppState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::template::Template;
use futures_util::StreamExt;

pub async fn process(
    state: web::Data<AppState>,
    template_id: web::Path<String>,
    payload: Multipart,
) -> impl Responder {
    match replace_archive(&state, &template_id, payload).await {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => failure("Template archive replacement failed", e),
    }
}

async fn replace_archive(
    state: &AppState,
    template_id: &str,
    mut payload: Multipart,
) -> Result<Template, ServiceError> {
    let mut template = state
        .store
        .get_template(template_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("Template {}", template_id)))?;

    let mut archive = None;
    while let Some(item) = payload.next().await {
        let mut field = item?;
        if field_name(&field).as_deref() == Some("file") {
            archive = Some(save_archive(state, &mut field).await?);
            break;
        }
    }
    let archive = archive.ok_or_else(|| ServiceError::BadRequest("Missing file part".into()))?;

    let layout = state.layout.clone();
    let archive_path = state.media_root.join(&archive.stored_filename);
    let name = template.name.clone();
    let kind = template.kind;
    let build =
        tokio::task::spawn_blocking(move || register_template(&layout, &archive_path, &name, kind))
            .await??;

    template.archive_id = archive.id;
    template.files = build.files;
    template.dependencies = build.dependencies;
    template.main_entry = build.main_entry;
    template.preview_url = build.preview_url;
    state.store.update_template(&template)?;

    log::info!(
        "Replaced archive of template '{}', entry point {}",
        template.name,
        template.main_entry
    );
    Ok(template)
}
