use super::build::{rebuild, validate_customizations};
use crate::error::ServiceError;
use crate::services::{failure, AppState};
use actix_web::{web, HttpResponse, Responder};
use common::model::client_preview::{BuildStatus, ClientPreview, DeploymentStatus};
use common::requests::CreatePreviewRequest;

pub async fn process(
    state: web::Data<AppState>,
    payload: web::Json<CreatePreviewRequest>,
) -> impl Responder {
    match create_preview(&state, payload.into_inner()).await {
        Ok(preview) => HttpResponse::Created().json(preview),
        Err(e) => failure("Client preview creation failed", e),
    }
}

async fn create_preview(
    state: &AppState,
    request: CreatePreviewRequest,
) -> Result<ClientPreview, ServiceError> {
    let client_name = request.client_name;
    if client_name.trim().is_empty() {
        return Err(ServiceError::BadRequest("Client name is required".into()));
    }
    validate_customizations(&request.customizations)?;

    let template = state
        .store
        .get_template(&request.template_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("Template {}", request.template_id)))?;

    let preview = ClientPreview {
        id: uuid::Uuid::new_v4().to_string(),
        template_id: template.id.clone(),
        client_name,
        customizations: request.customizations,
        preview_url: None,
        build_status: BuildStatus::NotBuilt,
        build_error: None,
        deployment_status: DeploymentStatus::NotDeployed,
        github_repo: None,
        deployment_url: None,
        custom_domain: None,
    };
    state.store.insert_preview(&preview)?;

    rebuild(state, preview, &template).await
}
