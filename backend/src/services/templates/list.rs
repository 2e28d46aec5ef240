use crate::services::{failure, AppState};
use actix_web::{web, HttpResponse, Responder};
use common::requests::ListTemplatesQuery;

pub async fn process(
    state: web::Data<AppState>,
    query: web::Query<ListTemplatesQuery>,
) -> impl Responder {
    match state.store.list_templates(query.active) {
        Ok(templates) => HttpResponse::Ok().json(templates),
        Err(e) => failure("Template listing failed", e.into()),
    }
}
