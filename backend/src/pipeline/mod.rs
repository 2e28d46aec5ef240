//! # Template Materialization Pipeline
//!
//! Turns an uploaded zip archive into a served template, and a template plus a
//! client's customizations into a served preview.
//!
//! ## Workflow
//!
//! 1.  **Template upload** (`register_template`): the archive is extracted
//!     straight into `templates_root/<token>`, the entry point is classified
//!     once, and the text members are projected into the record that the
//!     caller persists.
//!
//! 2.  **Preview creation** (`build_client_preview`): the template's files go
//!     through the customization engine and the result is materialized under
//!     `previews_root/<token>`. The template's entry point is reused as-is.
//!
//! Nothing here persists records or locks namespaces. Two builds racing on the
//! same token interleave per file; callers that need isolation serialize.

pub mod classify;
pub mod customize;
pub mod extract;
pub mod fs_utils;
pub mod materialize;

use crate::error::PipelineError;
use common::model::template::{Dependency, TemplateFile, TemplateKind};
use customize::Customization;
use materialize::{Materialized, NamespaceKind, OutputLayout};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(text) => text.as_bytes(),
            FileContent::Binary(bytes) => bytes,
        }
    }
}

/// One file of a template or preview tree, keyed by its relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    pub path: String,
    pub content: FileContent,
}

impl From<&TemplateFile> for SiteFile {
    fn from(file: &TemplateFile) -> Self {
        SiteFile {
            path: file.path.clone(),
            content: FileContent::Text(file.content.clone()),
        }
    }
}

/// Everything a template record needs after an archive upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBuild {
    pub namespace: String,
    pub directory: PathBuf,
    /// Text members only, in archive order.
    pub files: Vec<TemplateFile>,
    pub dependencies: Vec<Dependency>,
    pub main_entry: String,
    pub preview_url: String,
    /// Every non-directory member, binary ones included.
    pub extracted_count: usize,
}

/// Runs on every template archive upload, first or repeated.
pub fn register_template(
    layout: &OutputLayout,
    archive_path: &Path,
    name: &str,
    kind: TemplateKind,
) -> Result<TemplateBuild, PipelineError> {
    let (namespace, directory) = layout.namespace_dir(NamespaceKind::Templates, name)?;
    log::info!(
        "Extracting {} into {}",
        archive_path.display(),
        directory.display()
    );

    let extraction = extract::extract_archive_file(archive_path, &directory)?;

    let paths: Vec<&str> = extraction.files.iter().map(|f| f.path.as_str()).collect();
    let main_entry = classify::classify_entry_point(kind, &paths);

    let files: Vec<TemplateFile> = extraction
        .files
        .iter()
        .filter(|f| f.is_text())
        .map(|f| TemplateFile {
            path: f.path.clone(),
            content: f.text().into_owned(),
        })
        .collect();

    log::info!(
        "Template '{}' extracted {} file(s), {} text, entry point {}",
        namespace,
        extraction.files.len(),
        files.len(),
        main_entry
    );

    Ok(TemplateBuild {
        preview_url: materialize::preview_url(NamespaceKind::Templates, &namespace, &main_entry),
        namespace,
        directory,
        extracted_count: extraction.files.len(),
        files,
        dependencies: extraction.dependencies.unwrap_or_default(),
        main_entry,
    })
}

/// Customizes a template's files for one client and writes the preview tree.
pub fn build_client_preview(
    layout: &OutputLayout,
    client_name: &str,
    base_files: &[SiteFile],
    customization: &Customization,
    main_entry: &str,
) -> Result<Materialized, PipelineError> {
    let customized = customize::customize(base_files, customization)?;
    let materialized = materialize::materialize(
        layout,
        NamespaceKind::ClientPreviews,
        client_name,
        &customized,
        main_entry,
    )?;
    Ok(materialized)
}

/// Assembles the file set a preview is built from.
///
/// The record's text files come first, in record order. Binary assets are not
/// kept on the record, so they are picked up from the template's extracted
/// tree afterwards, sorted by path.
pub fn load_base_files(
    template_dir: &Path,
    record: &[TemplateFile],
) -> Result<Vec<SiteFile>, PipelineError> {
    let mut files: Vec<SiteFile> = record.iter().map(SiteFile::from).collect();

    if !template_dir.is_dir() {
        log::warn!(
            "Template tree {} is missing; building from the record only",
            template_dir.display()
        );
        return Ok(files);
    }

    let known: HashSet<&str> = record.iter().map(|f| f.path.as_str()).collect();
    let mut binaries = Vec::new();

    for entry in WalkDir::new(template_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| PipelineError::TemplateTree {
            path: template_dir.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(template_dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if known.contains(relative.as_str()) {
            continue;
        }

        let bytes = fs::read(entry.path()).map_err(|source| PipelineError::TemplateTree {
            path: entry.path().to_path_buf(),
            source,
        })?;
        // Text files missing from the record belong to an older upload.
        if std::str::from_utf8(&bytes).is_err() {
            binaries.push(SiteFile {
                path: relative,
                content: FileContent::Binary(bytes),
            });
        }
    }

    files.extend(binaries);
    Ok(files)
}
