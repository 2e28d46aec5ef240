//! HTTP surface of the service.
//!
//! Every JSON API lives under `/api`; the materialized trees and uploaded media
//! are served as static files from `/templates`, `/client-previews` and
//! `/media`.

pub mod client_previews;
pub mod deploy;
pub mod media;
pub mod sites;
pub mod templates;

mod uploads;

use crate::deploy::Deployer;
use crate::error::ServiceError;
use crate::pipeline::materialize::OutputLayout;
use crate::store::Store;
use actix_web::{web, HttpResponse, ResponseError};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared by every handler as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub layout: OutputLayout,
    pub media_root: PathBuf,
    /// Largest accepted file part.
    pub upload_limit_bytes: usize,
    pub deployer: Arc<dyn Deployer>,
}

/// Registers every route. Used by the server and by the route tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(templates::configure_routes())
        .service(media::configure_routes())
        .service(client_previews::configure_routes())
        .service(deploy::configure_routes())
        .service(sites::media_routes())
        .service(sites::template_routes())
        .service(sites::preview_routes());
}

/// Logs the full error and answers with its generic JSON form.
pub(crate) fn failure(context: &str, error: ServiceError) -> HttpResponse {
    if error.status_code().is_server_error() {
        log::error!("{}: {}", context, error);
    } else {
        log::warn!("{}: {}", context, error);
    }
    error.error_response()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::deploy::{DeployTarget, Repository, RepositoryOwner};
    use crate::error::DeployError;
    use crate::job_controller::state::{start_job_updater, JobsState};
    use actix_web::body::MessageBody;
    use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
    use actix_web::App;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;

    pub const BOUNDARY: &str = "sitesmith-test-boundary";

    /// Records what it was asked to deploy and answers with fixed URLs.
    #[derive(Default)]
    pub struct FakeDeployer {
        pub fail_deploy: bool,
        pub seen: Mutex<Vec<DeployTarget>>,
    }

    #[async_trait]
    impl Deployer for FakeDeployer {
        async fn create_repository(
            &self,
            target: &DeployTarget,
        ) -> Result<Repository, DeployError> {
            self.seen.lock().unwrap().push(target.clone());
            let name = target.project_name();
            Ok(Repository {
                html_url: format!("https://github.com/acme/{}", name),
                full_name: format!("acme/{}", name),
                name,
                owner: RepositoryOwner {
                    login: "acme".into(),
                },
            })
        }

        async fn deploy(
            &self,
            _target: &DeployTarget,
            repository: &Repository,
        ) -> Result<String, DeployError> {
            if self.fail_deploy {
                return Err(DeployError::Remote {
                    service: "vercel",
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(format!("https://{}.vercel.app", repository.name))
        }
    }

    pub struct TestEnv {
        pub dir: TempDir,
        pub state: AppState,
        pub jobs: JobsState,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self::with_deployer(Arc::new(FakeDeployer::default()))
        }

        pub fn with_deployer(deployer: Arc<dyn Deployer>) -> Self {
            let dir = TempDir::new().unwrap();
            let state = AppState {
                store: Store::open(dir.path().join("test.sqlite")).unwrap(),
                layout: OutputLayout::new(
                    dir.path().join("public/templates"),
                    dir.path().join("public/client-previews"),
                ),
                media_root: dir.path().join("media"),
                upload_limit_bytes: 1024 * 1024,
                deployer,
            };
            let (jobs, rx) = JobsState::new(16);
            tokio::spawn(start_job_updater(jobs.clone(), rx));
            TestEnv { dir, state, jobs }
        }

        pub fn app(
            &self,
        ) -> App<
            impl ServiceFactory<
                ServiceRequest,
                Config = (),
                Response = ServiceResponse<impl MessageBody>,
                Error = actix_web::Error,
                InitError = (),
            >,
        > {
            App::new()
                .app_data(web::Data::new(self.state.clone()))
                .app_data(web::Data::new(self.jobs.clone()))
                .configure(configure)
        }
    }

    pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(name.to_string(), options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// A multipart/form-data body; parts with a filename are sent as files.
    pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    pub fn multipart_content_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }
}
