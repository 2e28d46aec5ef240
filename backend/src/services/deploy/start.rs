//! # Deployment Job Start
//!
//! 1.  The preview must exist, be `built`, and its deployment must be allowed
//!     to move to `deploying` (so two jobs never run for one preview).
//! 2.  A job is registered as `Pending` and its id returned.
//! 3.  A Tokio task drives the `Deployer`, reporting progress through
//!     `JobsState` and persisting each outcome on the preview.

use crate::deploy::{DeployTarget, Deployer};
use crate::error::{PipelineError, ServiceError};
use crate::job_controller::state::JobsState;
use crate::pipeline::materialize::NamespaceKind;
use crate::services::{failure, AppState};
use crate::store::Store;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobStatus;
use common::model::client_preview::{BuildStatus, DeploymentStatus};
use common::requests::StartDeployRequest;
use std::sync::Arc;

pub async fn process(
    state: web::Data<AppState>,
    jobs: web::Data<JobsState>,
    payload: web::Json<StartDeployRequest>,
) -> impl Responder {
    match schedule_deployment(&state, &jobs, payload.into_inner()).await {
        Ok(job_id) => HttpResponse::Accepted().json(serde_json::json!({ "job_id": job_id })),
        Err(e) => failure("Deployment could not start", e),
    }
}

async fn schedule_deployment(
    state: &AppState,
    jobs: &JobsState,
    request: StartDeployRequest,
) -> Result<String, ServiceError> {
    let preview = state
        .store
        .get_preview(&request.preview_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("Client preview {}", request.preview_id)))?;

    if preview.build_status != BuildStatus::Built {
        return Err(ServiceError::Conflict(format!(
            "Preview {} has not been built",
            preview.id
        )));
    }
    if !preview
        .deployment_status
        .can_transition_to(DeploymentStatus::Deploying)
    {
        return Err(ServiceError::Conflict(format!(
            "Preview {} is already being deployed",
            preview.id
        )));
    }

    let (_, tree) = state
        .layout
        .namespace_dir(NamespaceKind::ClientPreviews, &preview.client_name)
        .map_err(PipelineError::from)?;
    let target = DeployTarget {
        preview_id: preview.id.clone(),
        client_name: preview.client_name.clone(),
        custom_domain: request
            .custom_domain
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        tree,
    };

    if !state.store.begin_deployment(&preview.id)? {
        return Err(ServiceError::Conflict(format!(
            "Preview {} is already being deployed",
            preview.id
        )));
    }
    let job_id = jobs.register().await;
    log::info!("Deployment job {} started for preview {}", job_id, preview.id);

    let store = state.store.clone();
    let deployer = state.deployer.clone();
    let jobs = jobs.clone();
    let id = job_id.clone();
    tokio::spawn(async move {
        run_deployment(store, deployer, jobs, id, target).await;
    });

    Ok(job_id)
}

pub(crate) async fn run_deployment(
    store: Store,
    deployer: Arc<dyn Deployer>,
    jobs: JobsState,
    job_id: String,
    target: DeployTarget,
) {
    jobs.report(&job_id, JobStatus::InProgress(10)).await;

    let status = match deploy_preview(&store, deployer.as_ref(), &jobs, &job_id, &target).await {
        Ok(url) => {
            log::info!("Preview {} deployed at {}", target.preview_id, url);
            JobStatus::Completed(url)
        }
        Err(message) => {
            log::error!("Deployment job {} failed: {}", job_id, message);
            if let Err(e) = store.set_deployment_status(&target.preview_id, DeploymentStatus::Failed)
            {
                log::error!("Could not record failed deployment: {}", e);
            }
            JobStatus::Failed(message)
        }
    };
    jobs.report(&job_id, status).await;
}

async fn deploy_preview(
    store: &Store,
    deployer: &dyn Deployer,
    jobs: &JobsState,
    job_id: &str,
    target: &DeployTarget,
) -> Result<String, String> {
    let repository = deployer
        .create_repository(target)
        .await
        .map_err(|e| e.to_string())?;
    store
        .set_github_repo(&target.preview_id, &repository.html_url)
        .map_err(|e| e.to_string())?;
    jobs.report(job_id, JobStatus::InProgress(60)).await;

    let url = deployer
        .deploy(target, &repository)
        .await
        .map_err(|e| e.to_string())?;
    store
        .set_deployment_result(&target.preview_id, &url, target.custom_domain.as_deref())
        .map_err(|e| e.to_string())?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use crate::services::test_support::*;
    use actix_web::{http::header, test};
    use common::jobs::JobStatus;
    use std::sync::Arc;
    use std::time::Duration;

    async fn wait_for_finish(env: &TestEnv, job_id: &str) -> JobStatus {
        for _ in 0..100 {
            match env.jobs.status(job_id).await {
                Some(status @ (JobStatus::Completed(_) | JobStatus::Failed(_))) => return status,
                _ => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        panic!("job {} never finished", job_id);
    }

    async fn built_preview(env: &TestEnv) -> String {
        let app = test::init_service(env.app()).await;
        let archive = zip_bytes(&[("index.html", b"<title>T</title>")]);
        let req = test::TestRequest::post()
            .uri("/api/templates")
            .insert_header((header::CONTENT_TYPE, multipart_content_type()))
            .set_payload(multipart_body(&[
                ("json", None, br#"{"name":"Base","kind":"static"}"#),
                ("file", Some("base.zip"), &archive),
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
        preview["id"].as_str().unwrap().to_string()
    }

    #[actix_web::test]
    async fn a_deployment_records_repository_and_url() {
        let deployer = Arc::new(FakeDeployer::default());
        let env = TestEnv::with_deployer(deployer.clone());
        let preview_id = built_preview(&env).await;
        let app = test::init_service(env.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/deploy")
            .set_json(serde_json::json!({
                "preview_id": preview_id,
                "custom_domain": "acme.example"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 202);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let job_id = body["job_id"].as_str().unwrap();

        assert_eq!(
            wait_for_finish(&env, job_id).await,
            JobStatus::Completed("https://client-acme.vercel.app".into())
        );

        let preview = env.state.store.get_preview(&preview_id).unwrap().unwrap();
        assert_eq!(preview.deployment_status.as_str(), "deployed");
        assert_eq!(
            preview.github_repo.as_deref(),
            Some("https://github.com/acme/client-acme")
        );
        assert_eq!(preview.custom_domain.as_deref(), Some("acme.example"));

        let seen = deployer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].tree.ends_with("public/client-previews/acme"));
    }

    #[actix_web::test]
    async fn a_failed_deployment_is_recorded() {
        let deployer = Arc::new(FakeDeployer {
            fail_deploy: true,
            ..Default::default()
        });
        let env = TestEnv::with_deployer(deployer);
        let preview_id = built_preview(&env).await;
        let app = test::init_service(env.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/deploy")
            .set_json(serde_json::json!({ "preview_id": preview_id }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let job_id = body["job_id"].as_str().unwrap();

        assert!(matches!(
            wait_for_finish(&env, job_id).await,
            JobStatus::Failed(_)
        ));
        let preview = env.state.store.get_preview(&preview_id).unwrap().unwrap();
        assert_eq!(preview.deployment_status.as_str(), "failed");
        assert!(preview.github_repo.is_some());
        assert!(preview.deployment_url.is_none());

        let req = test::TestRequest::get()
            .uri(&format!("/api/deploy/status/{}", job_id))
            .to_request();
        let status: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(status.get("Failed").is_some());
    }

    #[actix_web::test]
    async fn unbuilt_or_unknown_previews_cannot_deploy() {
        let env = TestEnv::new();
        let app = test::init_service(env.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/deploy")
            .set_json(serde_json::json!({ "preview_id": "missing" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::get()
            .uri("/api/deploy/status/unknown-job")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }
}
