//! SQLite-backed records for templates, client previews and media assets.
//!
//! A connection is opened per call, the same way the HTTP handlers have always
//! talked to `rusqlite`; the file lives at the configured database path. Lists
//! and maps (files, dependencies, metadata, customizations) are stored as JSON
//! text columns.

use crate::error::StoreError;
use common::model::client_preview::{BuildStatus, ClientPreview, Customizations, DeploymentStatus};
use common::model::media::MediaAsset;
use common::model::template::{Template, TemplateCategory};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS media (
    id TEXT PRIMARY KEY,
    original_filename TEXT NOT NULL,
    stored_filename TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    md5 TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    kind TEXT NOT NULL,
    category TEXT,
    archive_id TEXT NOT NULL,
    files TEXT NOT NULL,
    dependencies TEXT NOT NULL,
    main_entry TEXT NOT NULL,
    preview_url TEXT NOT NULL,
    status TEXT NOT NULL,
    is_active INTEGER NOT NULL,
    metadata TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS client_previews (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL REFERENCES templates(id),
    client_name TEXT NOT NULL,
    customizations TEXT NOT NULL,
    preview_url TEXT,
    build_status TEXT NOT NULL,
    build_error TEXT,
    deployment_status TEXT NOT NULL,
    github_repo TEXT,
    deployment_url TEXT,
    custom_domain TEXT
);
";

const TEMPLATE_COLUMNS: &str = "id, name, slug, description, kind, category, archive_id, files, \
     dependencies, main_entry, preview_url, status, is_active, metadata";

const PREVIEW_COLUMNS: &str = "id, template_id, client_name, customizations, preview_url, \
     build_status, build_error, deployment_status, github_repo, deployment_url, custom_domain";

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Opens (creating if needed) the database and its tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Store {
            path: path.as_ref().to_path_buf(),
        };
        store.connect()?.execute_batch(SCHEMA)?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.path)?)
    }

    pub fn insert_media(&self, asset: &MediaAsset) -> Result<(), StoreError> {
        self.connect()?.execute(
            "INSERT INTO media (id, original_filename, stored_filename, mime_type, md5)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                asset.id,
                asset.original_filename,
                asset.stored_filename,
                asset.mime_type,
                asset.md5
            ],
        )?;
        Ok(())
    }

    pub fn get_media(&self, id: &str) -> Result<Option<MediaAsset>, StoreError> {
        let asset = self
            .connect()?
            .query_row(
                "SELECT id, original_filename, stored_filename, mime_type, md5
                 FROM media WHERE id = ?1",
                params![id],
                |row| {
                    Ok(MediaAsset {
                        id: row.get(0)?,
                        original_filename: row.get(1)?,
                        stored_filename: row.get(2)?,
                        mime_type: row.get(3)?,
                        md5: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(asset)
    }

    pub fn insert_template(&self, template: &Template) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let result = conn.execute(
            &format!(
                "INSERT INTO templates ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                TEMPLATE_COLUMNS
            ),
            params![
                template.id,
                template.name,
                template.slug,
                template.description,
                template.kind.as_str(),
                template.category.map(|c| c.as_str()),
                template.archive_id,
                serde_json::to_string(&template.files)?,
                serde_json::to_string(&template.dependencies)?,
                template.main_entry,
                template.preview_url,
                template.status.as_str(),
                template.is_active,
                serde_json::to_string(&template.metadata)?,
            ],
        );
        map_unique(result, || format!("slug '{}' is already taken", template.slug))
    }

    /// Replaces every column of an existing template.
    pub fn update_template(&self, template: &Template) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let result = conn.execute(
            "UPDATE templates SET name = ?2, slug = ?3, description = ?4, kind = ?5,
                 category = ?6, archive_id = ?7, files = ?8, dependencies = ?9,
                 main_entry = ?10, preview_url = ?11, status = ?12, is_active = ?13,
                 metadata = ?14
             WHERE id = ?1",
            params![
                template.id,
                template.name,
                template.slug,
                template.description,
                template.kind.as_str(),
                template.category.map(|c| c.as_str()),
                template.archive_id,
                serde_json::to_string(&template.files)?,
                serde_json::to_string(&template.dependencies)?,
                template.main_entry,
                template.preview_url,
                template.status.as_str(),
                template.is_active,
                serde_json::to_string(&template.metadata)?,
            ],
        );
        map_unique(result, || format!("slug '{}' is already taken", template.slug))
    }

    pub fn get_template(&self, id: &str) -> Result<Option<Template>, StoreError> {
        let template = self
            .connect()?
            .query_row(
                &format!("SELECT {} FROM templates WHERE id = ?1", TEMPLATE_COLUMNS),
                params![id],
                template_from_row,
            )
            .optional()?;
        Ok(template)
    }

    pub fn get_template_by_slug(&self, slug: &str) -> Result<Option<Template>, StoreError> {
        let template = self
            .connect()?
            .query_row(
                &format!("SELECT {} FROM templates WHERE slug = ?1", TEMPLATE_COLUMNS),
                params![slug],
                template_from_row,
            )
            .optional()?;
        Ok(template)
    }

    pub fn list_templates(&self, active_only: bool) -> Result<Vec<Template>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM templates WHERE (?1 = 0 OR is_active = 1) ORDER BY name",
            TEMPLATE_COLUMNS
        ))?;
        let templates = stmt
            .query_map(params![active_only], template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    pub fn insert_preview(&self, preview: &ClientPreview) -> Result<(), StoreError> {
        self.connect()?.execute(
            &format!(
                "INSERT INTO client_previews ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                PREVIEW_COLUMNS
            ),
            params![
                preview.id,
                preview.template_id,
                preview.client_name,
                serde_json::to_string(&preview.customizations)?,
                preview.preview_url,
                preview.build_status.as_str(),
                preview.build_error,
                preview.deployment_status.as_str(),
                preview.github_repo,
                preview.deployment_url,
                preview.custom_domain,
            ],
        )?;
        Ok(())
    }

    pub fn get_preview(&self, id: &str) -> Result<Option<ClientPreview>, StoreError> {
        let preview = self
            .connect()?
            .query_row(
                &format!(
                    "SELECT {} FROM client_previews WHERE id = ?1",
                    PREVIEW_COLUMNS
                ),
                params![id],
                preview_from_row,
            )
            .optional()?;
        Ok(preview)
    }

    pub fn save_customizations(
        &self,
        id: &str,
        customizations: &Customizations,
    ) -> Result<(), StoreError> {
        self.connect()?.execute(
            "UPDATE client_previews SET customizations = ?2 WHERE id = ?1",
            params![id, serde_json::to_string(customizations)?],
        )?;
        Ok(())
    }

    /// Records a build transition. `preview_url` is only overwritten when given.
    pub fn set_build_status(
        &self,
        id: &str,
        status: BuildStatus,
        preview_url: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        self.connect()?.execute(
            "UPDATE client_previews
             SET build_status = ?2, preview_url = COALESCE(?3, preview_url), build_error = ?4
             WHERE id = ?1",
            params![id, status.as_str(), preview_url, error],
        )?;
        Ok(())
    }

    /// Moves a preview into `building` unless a build is already running.
    ///
    /// The check and the write are one statement, so of two concurrent
    /// callers exactly one gets `true`.
    pub fn begin_build(&self, id: &str) -> Result<bool, StoreError> {
        let changed = self.connect()?.execute(
            "UPDATE client_previews
             SET build_status = ?2, build_error = NULL
             WHERE id = ?1 AND build_status != ?2",
            params![id, BuildStatus::Building.as_str()],
        )?;
        Ok(changed == 1)
    }

    /// Moves a built preview into `deploying` unless a deployment is running.
    pub fn begin_deployment(&self, id: &str) -> Result<bool, StoreError> {
        let changed = self.connect()?.execute(
            "UPDATE client_previews
             SET deployment_status = ?2
             WHERE id = ?1 AND build_status = ?3 AND deployment_status != ?2",
            params![
                id,
                DeploymentStatus::Deploying.as_str(),
                BuildStatus::Built.as_str()
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn set_deployment_status(
        &self,
        id: &str,
        status: DeploymentStatus,
    ) -> Result<(), StoreError> {
        self.connect()?.execute(
            "UPDATE client_previews SET deployment_status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(())
    }

    pub fn set_github_repo(&self, id: &str, repo_url: &str) -> Result<(), StoreError> {
        self.connect()?.execute(
            "UPDATE client_previews SET github_repo = ?2 WHERE id = ?1",
            params![id, repo_url],
        )?;
        Ok(())
    }

    pub fn set_deployment_result(
        &self,
        id: &str,
        deployment_url: &str,
        custom_domain: Option<&str>,
    ) -> Result<(), StoreError> {
        self.connect()?.execute(
            "UPDATE client_previews
             SET deployment_status = ?2, deployment_url = ?3, custom_domain = ?4
             WHERE id = ?1",
            params![
                id,
                DeploymentStatus::Deployed.as_str(),
                deployment_url,
                custom_domain
            ],
        )?;
        Ok(())
    }
}

fn map_unique(
    result: rusqlite::Result<usize>,
    message: impl FnOnce() -> String,
) -> Result<(), StoreError> {
    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(StoreError::Conflict(message()))
        }
        Err(e) => Err(e.into()),
    }
}

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn template_from_row(row: &Row) -> rusqlite::Result<Template> {
    let category: Option<String> = row.get(5)?;
    let category = category
        .map(|c| c.parse::<TemplateCategory>())
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        kind: parsed_column(row, 4)?,
        category,
        archive_id: row.get(6)?,
        files: json_column(row, 7)?,
        dependencies: json_column(row, 8)?,
        main_entry: row.get(9)?,
        preview_url: row.get(10)?,
        status: parsed_column(row, 11)?,
        is_active: row.get(12)?,
        metadata: json_column(row, 13)?,
    })
}

fn preview_from_row(row: &Row) -> rusqlite::Result<ClientPreview> {
    Ok(ClientPreview {
        id: row.get(0)?,
        template_id: row.get(1)?,
        client_name: row.get(2)?,
        customizations: json_column(row, 3)?,
        preview_url: row.get(4)?,
        build_status: parsed_column(row, 5)?,
        build_error: row.get(6)?,
        deployment_status: parsed_column(row, 7)?,
        github_repo: row.get(8)?,
        deployment_url: row.get(9)?,
        custom_domain: row.get(10)?,
    })
}
