//! Multipart plumbing shared by the upload endpoints.

use crate::error::ServiceError;
use crate::services::AppState;
use actix_multipart::Field;
use common::model::media::MediaAsset;
use futures_util::StreamExt;
use md5::Context;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub(crate) fn field_name(field: &Field) -> Option<String> {
    field
        .content_disposition()
        .and_then(|cd| cd.get_name().map(|n| n.to_string()))
}

pub(crate) fn field_filename(field: &Field) -> Option<String> {
    field
        .content_disposition()
        .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
        .filter(|f| !f.trim().is_empty())
}

/// Buffers a small part in memory, rejecting it once it passes `limit` bytes.
pub(crate) async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, ServiceError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if bytes.len() + chunk.len() > limit {
            return Err(ServiceError::BadRequest(format!(
                "Form fields are limited to {} bytes",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Streams a file part into the media root as `<md5>.<ext>` and records it.
///
/// Identical uploads land on the same stored name; each still gets its own
/// media record.
pub(crate) async fn save_media(
    field: &mut Field,
    state: &AppState,
) -> Result<MediaAsset, ServiceError> {
    let media_root = state.media_root.as_path();
    let original_filename = field_filename(field)
        .ok_or_else(|| ServiceError::BadRequest("The file part has no filename".into()))?;

    fs::create_dir_all(media_root)?;
    let mut temp = NamedTempFile::new_in(media_root)?;
    let mut hasher = Context::new();
    let mut size = 0;
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        size += chunk.len();
        if size > state.upload_limit_bytes {
            return Err(ServiceError::BadRequest(format!(
                "Uploads are limited to {} bytes",
                state.upload_limit_bytes
            )));
        }
        hasher.consume(&chunk);
        temp.write_all(&chunk)?;
    }
    temp.as_file().sync_all()?;

    let md5 = format!("{:x}", hasher.finalize());
    let extension = Path::new(&original_filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    let stored_filename = format!("{}.{}", md5, extension);
    temp.persist(media_root.join(&stored_filename))
        .map_err(|e| ServiceError::Io(e.error))?;

    let asset = MediaAsset {
        id: uuid::Uuid::new_v4().to_string(),
        mime_type: mime_guess::from_path(&original_filename)
            .first_or_octet_stream()
            .to_string(),
        original_filename,
        stored_filename,
        md5,
    };
    state.store.insert_media(&asset)?;
    log::info!(
        "Stored upload '{}' as {}",
        asset.original_filename,
        asset.stored_filename
    );
    Ok(asset)
}
