use crate::model::template::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Per-client personalisation applied on top of a template's files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Customizations {
    /// Replaces the `<title>` of every markup file. Required for a build.
    #[serde(default)]
    pub business_name: String,
    /// Media asset id of the client's logo.
    #[serde(default)]
    pub logo: Option<String>,
    /// `{{key}}` placeholder substitutions applied to every text file.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStatus {
    #[default]
    NotBuilt,
    Building,
    Built,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStatus {
    #[default]
    NotDeployed,
    Deploying,
    Deployed,
    Failed,
}

/// A customized copy of a template materialized for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPreview {
    pub id: String,
    pub template_id: String,
    pub client_name: String,
    pub customizations: Customizations,
    pub preview_url: Option<String>,
    pub build_status: BuildStatus,
    pub build_error: Option<String>,
    pub deployment_status: DeploymentStatus,
    pub github_repo: Option<String>,
    pub deployment_url: Option<String>,
    pub custom_domain: Option<String>,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::NotBuilt => "not-built",
            BuildStatus::Building => "building",
            BuildStatus::Built => "built",
            BuildStatus::Failed => "failed",
        }
    }

    /// `not-built -> building -> built | failed`; finished builds may be rebuilt.
    pub fn can_transition_to(&self, next: BuildStatus) -> bool {
        matches!(
            (self, next),
            (BuildStatus::NotBuilt, BuildStatus::Building)
                | (BuildStatus::Building, BuildStatus::Built)
                | (BuildStatus::Building, BuildStatus::Failed)
                | (BuildStatus::Built, BuildStatus::Building)
                | (BuildStatus::Failed, BuildStatus::Building)
        )
    }
}

impl FromStr for BuildStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-built" => Ok(BuildStatus::NotBuilt),
            "building" => Ok(BuildStatus::Building),
            "built" => Ok(BuildStatus::Built),
            "failed" => Ok(BuildStatus::Failed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::NotDeployed => "not-deployed",
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Failed => "failed",
        }
    }

    /// `not-deployed -> deploying -> deployed | failed`; a finished deployment can be retried.
    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        matches!(
            (self, next),
            (DeploymentStatus::NotDeployed, DeploymentStatus::Deploying)
                | (DeploymentStatus::Deploying, DeploymentStatus::Deployed)
                | (DeploymentStatus::Deploying, DeploymentStatus::Failed)
                | (DeploymentStatus::Deployed, DeploymentStatus::Deploying)
                | (DeploymentStatus::Failed, DeploymentStatus::Deploying)
        )
    }
}

impl FromStr for DeploymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-deployed" => Ok(DeploymentStatus::NotDeployed),
            "deploying" => Ok(DeploymentStatus::Deploying),
            "deployed" => Ok(DeploymentStatus::Deployed),
            "failed" => Ok(DeploymentStatus::Failed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_track_follows_state_machine() {
        assert!(BuildStatus::NotBuilt.can_transition_to(BuildStatus::Building));
        assert!(BuildStatus::Building.can_transition_to(BuildStatus::Built));
        assert!(BuildStatus::Building.can_transition_to(BuildStatus::Failed));
        assert!(!BuildStatus::NotBuilt.can_transition_to(BuildStatus::Built));
        assert!(!BuildStatus::Built.can_transition_to(BuildStatus::Failed));
    }

    #[test]
    fn deployment_track_follows_state_machine() {
        assert!(DeploymentStatus::NotDeployed.can_transition_to(DeploymentStatus::Deploying));
        assert!(DeploymentStatus::Deploying.can_transition_to(DeploymentStatus::Deployed));
        assert!(!DeploymentStatus::NotDeployed.can_transition_to(DeploymentStatus::Deployed));
    }

    #[test]
    fn statuses_use_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&BuildStatus::NotBuilt).unwrap();
        assert_eq!(json, "\"not-built\"");
        let parsed: DeploymentStatus = serde_json::from_str("\"not-deployed\"").unwrap();
        assert_eq!(parsed, DeploymentStatus::NotDeployed);
        assert_eq!("built".parse::<BuildStatus>().unwrap(), BuildStatus::Built);
    }

    #[test]
    fn customizations_default_missing_fields() {
        let parsed: Customizations =
            serde_json::from_str(r#"{"business_name":"Acme"}"#).unwrap();
        assert_eq!(parsed.business_name, "Acme");
        assert!(parsed.logo.is_none());
        assert!(parsed.extra.is_empty());
    }
}
