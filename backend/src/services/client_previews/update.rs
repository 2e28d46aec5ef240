use super::build::{rebuild, validate_customizations};
use crate::error::ServiceError;
use crate::services::{failure, AppState};
use actix_web::{web, HttpResponse, Responder};
use common::model::client_preview::ClientPreview;
use common::requests::UpdateCustomizationsRequest;

pub async fn process(
    state: web::Data<AppState>,
    preview_id: web::Path<String>,
    payload: web::Json<UpdateCustomizationsRequest>,
) -> impl Responder {
    match update_customizations(&state, &preview_id, payload.into_inner()).await {
        Ok(preview) => HttpResponse::Ok().json(preview),
        Err(e) => failure("Client preview rebuild failed", e),
    }
}

async fn update_customizations(
    state: &AppState,
    preview_id: &str,
    request: UpdateCustomizationsRequest,
) -> Result<ClientPreview, ServiceError> {
    validate_customizations(&request.customizations)?;

    let mut preview = state
        .store
        .get_preview(preview_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("Client preview {}", preview_id)))?;
    let template = state
        .store
        .get_template(&preview.template_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("Template {}", preview.template_id)))?;

    state
        .store
        .save_customizations(&preview.id, &request.customizations)?;
    preview.customizations = request.customizations;

    rebuild(state, preview, &template).await
}

#[cfg(test)]
mod tests {
    use crate::services::test_support::*;
    use actix_web::{http::header, test};
    use std::fs;

    #[actix_web::test]
    async fn rebuilding_overwrites_the_same_namespace() {
        let env = TestEnv::new();
        let app = test::init_service(env.app()).await;

        let archive = zip_bytes(&[("index.html", b"<title>T</title><h1>{{headline}}</h1>")]);
        let req = test::TestRequest::post()
            .uri("/api/templates")
            .insert_header((header::CONTENT_TYPE, multipart_content_type()))
            .set_payload(multipart_body(&[
                ("json", None, br#"{"name":"Plain","kind":"static"}"#),
                ("file", Some("plain.zip"), &archive),
            ]))
            .to_request();
        let template: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/client-previews")
            .set_json(serde_json::json!({
                "template_id": template["id"],
                "client_name": "Acme Corp",
                "customizations": { "business_name": "Acme", "extra": { "headline": "Hello" } }
            }))
            .to_request();
        let preview: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = preview["id"].as_str().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/client-previews/{}/customizations", id))
            .set_json(serde_json::json!({
                "customizations": { "business_name": "Acme Ltd", "extra": { "headline": "Welcome" } }
            }))
            .to_request();
        let rebuilt: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rebuilt["build_status"], "built");
        assert_eq!(rebuilt["customizations"]["business_name"], "Acme Ltd");

        let html = fs::read_to_string(
            env.dir
                .path()
                .join("public/client-previews/acme-corp/index.html"),
        )
        .unwrap();
        assert_eq!(html, "<title>Acme Ltd</title><h1>Welcome</h1>");

        let req = test::TestRequest::get()
            .uri(&format!("/api/client-previews/{}", id))
            .to_request();
        let stored: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stored["customizations"]["extra"]["headline"], "Welcome");
        assert_eq!(stored["deployment_status"], "not-deployed");
    }

    #[actix_web::test]
    async fn a_build_already_running_is_a_conflict() {
        let env = TestEnv::new();
        let app = test::init_service(env.app()).await;

        let archive = zip_bytes(&[("index.html", b"<title>T</title>")]);
        let req = test::TestRequest::post()
            .uri("/api/templates")
            .insert_header((header::CONTENT_TYPE, multipart_content_type()))
            .set_payload(multipart_body(&[
                ("json", None, br#"{"name":"Plain","kind":"static"}"#),
                ("file", Some("plain.zip"), &archive),
            ]))
            .to_request();
        let template: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/client-previews")
            .set_json(serde_json::json!({
                "template_id": template["id"],
                "client_name": "Acme",
                "customizations": { "business_name": "Acme" }
            }))
            .to_request();
        let preview: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = preview["id"].as_str().unwrap();

        assert!(env.state.store.begin_build(id).unwrap());

        let req = test::TestRequest::put()
            .uri(&format!("/api/client-previews/{}/customizations", id))
            .set_json(serde_json::json!({ "customizations": { "business_name": "Acme Ltd" } }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 409);
    }
}
