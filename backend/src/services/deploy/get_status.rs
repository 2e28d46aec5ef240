use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};

pub async fn process(job_id: web::Path<String>, jobs: web::Data<JobsState>) -> impl Responder {
    match jobs.status(&job_id).await {
        Some(status) => HttpResponse::Ok().json(status),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Job ID not found",
            "kind": "not_found",
        })),
    }
}
