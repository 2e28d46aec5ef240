//! # Template Upload
//!
//! 1.  The `json` part is parsed into a `CreateTemplateRequest`; the `file` part
//!     must be a `.zip` and is streamed into the media root.
//! 2.  The slug (given or derived from the name) is checked for uniqueness
//!     before anything is extracted.
//! 3.  `pipeline::register_template` runs on the blocking pool and the record is
//!     persisted with the extracted text files.
//!
//! A failed extraction leaves the stored archive and any partially written tree
//! on disk; no template record is created.

use crate::error::ServiceError;
use crate::pipeline::materialize::normalize_namespace;
use crate::pipeline::register_template;
use crate::services::uploads::{field_filename, field_name, read_field, save_media};
use crate::services::{failure, AppState};
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse, Responder};
use common::model::media::MediaAsset;
use common::model::template::Template;
use common::requests::CreateTemplateRequest;
use futures_util::StreamExt;

pub async fn process(state: web::Data<AppState>, payload: Multipart) -> impl Responder {
    match create_template(&state, payload).await {
        Ok(template) => HttpResponse::Created().json(template),
        Err(e) => failure("Template upload failed", e),
    }
}

async fn create_template(
    state: &AppState,
    mut payload: Multipart,
) -> Result<Template, ServiceError> {
    let mut request: Option<CreateTemplateRequest> = None;
    let mut archive: Option<MediaAsset> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        match field_name(&field).as_deref() {
            Some("json") => {
                let bytes = read_field(&mut field, state.upload_limit_bytes).await?;
                request = Some(serde_json::from_slice(&bytes).map_err(|e| {
                    ServiceError::BadRequest(format!("Invalid template description: {}", e))
                })?);
            }
            Some("file") => archive = Some(save_archive(state, &mut field).await?),
            _ => {}
        }
    }

    let request = request.ok_or_else(|| ServiceError::BadRequest("Missing json part".into()))?;
    let archive = archive.ok_or_else(|| ServiceError::BadRequest("Missing file part".into()))?;

    let name = request.name;
    if name.trim().is_empty() {
        return Err(ServiceError::BadRequest("Template name is required".into()));
    }
    let slug = request
        .slug
        .as_deref()
        .map(normalize_namespace)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| normalize_namespace(&name));
    if state.store.get_template_by_slug(&slug)?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "A template with slug '{}' already exists",
            slug
        )));
    }

    let layout = state.layout.clone();
    let archive_path = state.media_root.join(&archive.stored_filename);
    let kind = request.kind;
    let build = {
        let name = name.clone();
        tokio::task::spawn_blocking(move || {
            register_template(&layout, &archive_path, &name, kind)
        })
        .await??
    };

    let template = Template {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        slug,
        description: request.description,
        kind,
        category: request.category,
        archive_id: archive.id,
        files: build.files,
        dependencies: build.dependencies,
        main_entry: build.main_entry,
        preview_url: build.preview_url,
        status: request.status,
        is_active: request.is_active.unwrap_or(true),
        metadata: request
            .metadata
            .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
    };
    state.store.insert_template(&template)?;
    log::info!(
        "Registered template '{}' ({}) with entry point {}",
        template.name,
        template.id,
        template.main_entry
    );
    Ok(template)
}

/// Accepts only `.zip` file parts.
pub(super) async fn save_archive(
    state: &AppState,
    field: &mut Field,
) -> Result<MediaAsset, ServiceError> {
    let is_zip = field_filename(field)
        .map(|f| f.to_ascii_lowercase().ends_with(".zip"))
        .unwrap_or(false);
    if !is_zip {
        return Err(ServiceError::BadRequest(
            "The template archive must be a .zip file".into(),
        ));
    }
    save_media(field, state).await
}
