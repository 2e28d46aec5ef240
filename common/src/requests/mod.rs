use crate::model::client_preview::Customizations;
use crate::model::template::{TemplateCategory, TemplateKind, TemplateStatus};
use serde::Deserialize;

/// The `json` part of a template upload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub kind: TemplateKind,
    pub category: Option<TemplateCategory>,
    #[serde(default)]
    pub status: TemplateStatus,
    pub is_active: Option<bool>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePreviewRequest {
    pub template_id: String,
    pub client_name: String,
    pub customizations: Customizations,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCustomizationsRequest {
    pub customizations: Customizations,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartDeployRequest {
    pub preview_id: String,
    pub custom_domain: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListTemplatesQuery {
    #[serde(default)]
    pub active: bool,
}
