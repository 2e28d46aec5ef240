use crate::error::ServiceError;
use crate::services::{failure, AppState};
use actix_web::{web, HttpResponse, Responder};

pub async fn process(state: web::Data<AppState>, preview_id: web::Path<String>) -> impl Responder {
    match state.store.get_preview(&preview_id) {
        Ok(Some(preview)) => HttpResponse::Ok().json(preview),
        Ok(None) => failure(
            "Client preview lookup failed",
            ServiceError::NotFound(format!("Client preview {}", preview_id)),
        ),
        Err(e) => failure("Client preview lookup failed", e.into()),
    }
}
