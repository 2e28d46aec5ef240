use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a template's sources are laid out, which decides its preview entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Plain markup site served from `index.html`.
    #[serde(alias = "html")]
    Static,
    /// Component-based (React) site whose entry module is discovered on upload.
    #[serde(alias = "react")]
    Component,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Business,
    Ecommerce,
    Blog,
    Portfolio,
    Landing,
    Other,
}

/// One text entry of an extracted archive, as kept on the template record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub path: String,
    pub content: String,
}

/// A `name -> version` pair read from the archive's `package.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

/// A website template registered from an uploaded zip archive.
///
/// `files`, `dependencies`, `main_entry` and `preview_url` are recomputed on
/// every archive upload; `slug` and `status` survive re-uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub kind: TemplateKind,
    pub category: Option<TemplateCategory>,
    /// Media asset id of the uploaded archive.
    pub archive_id: String,
    pub files: Vec<TemplateFile>,
    pub dependencies: Vec<Dependency>,
    pub main_entry: String,
    pub preview_url: String,
    pub status: TemplateStatus,
    pub is_active: bool,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Static => "static",
            TemplateKind::Component => "component",
        }
    }
}

impl FromStr for TemplateKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" | "html" => Ok(TemplateKind::Static),
            "component" | "react" => Ok(TemplateKind::Component),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Draft => "draft",
            TemplateStatus::Published => "published",
        }
    }
}

impl FromStr for TemplateStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TemplateStatus::Draft),
            "published" => Ok(TemplateStatus::Published),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl TemplateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::Business => "business",
            TemplateCategory::Ecommerce => "ecommerce",
            TemplateCategory::Blog => "blog",
            TemplateCategory::Portfolio => "portfolio",
            TemplateCategory::Landing => "landing",
            TemplateCategory::Other => "other",
        }
    }
}

impl FromStr for TemplateCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business" => Ok(TemplateCategory::Business),
            "ecommerce" => Ok(TemplateCategory::Ecommerce),
            "blog" => Ok(TemplateCategory::Blog),
            "portfolio" => Ok(TemplateCategory::Portfolio),
            "landing" => Ok(TemplateCategory::Landing),
            "other" => Ok(TemplateCategory::Other),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}
