use crate::error::ServiceError;
use crate::services::{failure, AppState};
use actix_web::{web, HttpResponse, Responder};

pub async fn process(state: web::Data<AppState>, template_id: web::Path<String>) -> impl Responder {
    match state.store.get_template(&template_id) {
        Ok(Some(template)) => HttpResponse::Ok().json(template),
        Ok(None) => failure(
            "Template lookup failed",
            ServiceError::NotFound(format!("Template {}", template_id)),
        ),
        Err(e) => failure("Template lookup failed", e.into()),
    }
}
