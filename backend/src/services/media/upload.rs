use crate::error::ServiceError;
use crate::services::uploads::{field_name, save_media};
use crate::services::{failure, AppState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::media::MediaAsset;
use futures_util::StreamExt;

pub async fn process(state: web::Data<AppState>, payload: Multipart) -> impl Responder {
    match upload_media(&state, payload).await {
        Ok(asset) => HttpResponse::Created().json(serde_json::json!({
            "url": asset.url(),
            "media": asset,
        })),
        Err(e) => failure("Media upload failed", e),
    }
}

async fn upload_media(
    state: &AppState,
    mut payload: Multipart,
) -> Result<MediaAsset, ServiceError> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        if field_name(&field).as_deref() == Some("file") {
            return save_media(&mut field, state).await;
        }
    }
    Err(ServiceError::BadRequest("Missing file part".into()))
}
