//! Hands a built preview to GitHub and Vercel.
//!
//! The pipeline only supplies the materialized tree; everything remote sits
//! behind [`Deployer`] so the job runner can be exercised without network
//! access.

use crate::error::DeployError;
use crate::pipeline::materialize::normalize_namespace;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

const GITHUB_API: &str = "https://api.github.com";
const VERCEL_API: &str = "https://api.vercel.com";
const USER_AGENT: &str = concat!("sitesmith/", env!("CARGO_PKG_VERSION"));

/// What a deployment needs to know about one preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub preview_id: String,
    pub client_name: String,
    pub custom_domain: Option<String>,
    /// Materialized preview directory.
    pub tree: PathBuf,
}

impl DeployTarget {
    /// `client-<token>`, restricted to the characters GitHub accepts in repo names.
    pub fn project_name(&self) -> String {
        let token: String = normalize_namespace(&self.client_name)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        format!("client-{}", token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub html_url: String,
    pub full_name: String,
    pub name: String,
    pub owner: RepositoryOwner,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

#[async_trait]
pub trait Deployer: Send + Sync {
    /// Creates the repository and publishes the preview tree into it.
    async fn create_repository(&self, target: &DeployTarget) -> Result<Repository, DeployError>;

    /// Deploys `repository` and returns the public deployment URL.
    async fn deploy(
        &self,
        target: &DeployTarget,
        repository: &Repository,
    ) -> Result<String, DeployError>;
}

/// GitHub + Vercel over their REST APIs.
pub struct RestDeployer {
    client: reqwest::Client,
    github_token: Option<String>,
    vercel_token: Option<String>,
    github_api: String,
    vercel_api: String,
}

#[derive(Deserialize)]
struct VercelDeployment {
    url: String,
}

impl RestDeployer {
    pub fn new(github_token: Option<String>, vercel_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            github_token,
            vercel_token,
            github_api: GITHUB_API.to_string(),
            vercel_api: VERCEL_API.to_string(),
        }
    }

    fn github_token(&self) -> Result<&str, DeployError> {
        self.github_token
            .as_deref()
            .ok_or(DeployError::MissingToken("GITHUB_TOKEN"))
    }

    fn vercel_token(&self) -> Result<&str, DeployError> {
        self.vercel_token
            .as_deref()
            .ok_or(DeployError::MissingToken("VERCEL_TOKEN"))
    }

    fn github(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, DeployError> {
        Ok(self
            .client
            .request(method, format!("{}{}", self.github_api, path))
            .bearer_auth(self.github_token()?)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json"))
    }

    fn vercel(&self, path: &str) -> Result<reqwest::RequestBuilder, DeployError> {
        Ok(self
            .client
            .post(format!("{}{}", self.vercel_api, path))
            .bearer_auth(self.vercel_token()?))
    }

    /// Commits every file of the preview tree through the contents API.
    async fn publish_tree(
        &self,
        target: &DeployTarget,
        repository: &Repository,
    ) -> Result<usize, DeployError> {
        let mut published = 0;
        for entry in WalkDir::new(&target.tree).sort_by_file_name() {
            let entry = entry.map_err(|e| DeployError::Tree {
                path: target.tree.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&target.tree) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = fs::read(entry.path()).map_err(|source| DeployError::Tree {
                path: entry.path().to_path_buf(),
                source,
            })?;

            let response = self
                .github(
                    reqwest::Method::PUT,
                    &format!("/repos/{}/contents/{}", repository.full_name, relative),
                )?
                .json(&serde_json::json!({
                    "message": format!("Add {}", relative),
                    "content": STANDARD.encode(&bytes),
                }))
                .send()
                .await?;
            ensure_success("github", response).await?;
            published += 1;
        }
        Ok(published)
    }
}

#[async_trait]
impl Deployer for RestDeployer {
    async fn create_repository(&self, target: &DeployTarget) -> Result<Repository, DeployError> {
        let response = self
            .github(reqwest::Method::POST, "/user/repos")?
            .json(&serde_json::json!({
                "name": target.project_name(),
                "private": false,
                // An initial commit gives the contents API a branch to write to.
                "auto_init": true,
            }))
            .send()
            .await?;
        let repository: Repository = ensure_success("github", response).await?.json().await?;
        log::info!("Created repository {}", repository.html_url);

        let published = self.publish_tree(target, &repository).await?;
        log::info!("Published {} file(s) to {}", published, repository.full_name);
        Ok(repository)
    }

    async fn deploy(
        &self,
        target: &DeployTarget,
        repository: &Repository,
    ) -> Result<String, DeployError> {
        let project = target.project_name();
        let response = self
            .vercel("/v13/deployments")?
            .json(&serde_json::json!({
                "name": project,
                "gitSource": {
                    "type": "github",
                    "org": repository.owner.login,
                    "repo": repository.name,
                    "ref": "main",
                },
            }))
            .send()
            .await?;
        let deployment: VercelDeployment =
            ensure_success("vercel", response).await?.json().await?;

        if let Some(domain) = target.custom_domain.as_deref() {
            let response = self
                .vercel(&format!("/v10/projects/{}/domains", project))?
                .json(&serde_json::json!({ "name": domain }))
                .send()
                .await?;
            ensure_success("vercel", response).await?;
            log::info!("Attached domain {} to {}", domain, project);
        }

        Ok(with_scheme(&deployment.url))
    }
}

async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, DeployError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DeployError::Remote {
        service,
        status: status.as_u16(),
        body,
    })
}

/// Vercel reports bare hostnames.
fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
