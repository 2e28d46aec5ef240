use crate::error::MaterializationError;
use crate::pipeline::fs_utils::{safe_relative_path, write_atomic};
use crate::pipeline::SiteFile;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Which output root a namespace lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    Templates,
    ClientPreviews,
}

impl NamespaceKind {
    /// First segment of the preview URLs served for this kind.
    pub fn url_segment(&self) -> &'static str {
        match self {
            NamespaceKind::Templates => "templates",
            NamespaceKind::ClientPreviews => "client-previews",
        }
    }
}

/// On-disk roots shared by the pipeline and the static file routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub templates_root: PathBuf,
    pub previews_root: PathBuf,
}

/// Outcome of writing one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub namespace: String,
    pub directory: PathBuf,
    pub files_written: usize,
    pub preview_url: String,
}

/// Maps a display name to its directory token: lowercased, with every
/// whitespace run turned into a single `-`. Nothing is trimmed, so edge
/// whitespace becomes a leading or trailing `-`.
///
/// `"Acme  Corp"` and `"acme-corp"` both give `acme-corp`, so the two share a
/// directory and the later write wins.
pub fn normalize_namespace(name: &str) -> String {
    WHITESPACE_RE
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

pub fn preview_url(kind: NamespaceKind, namespace: &str, main_entry: &str) -> String {
    format!(
        "/{}/{}/{}",
        kind.url_segment(),
        namespace,
        main_entry.trim_start_matches('/')
    )
}

impl OutputLayout {
    pub fn new(templates_root: impl Into<PathBuf>, previews_root: impl Into<PathBuf>) -> Self {
        Self {
            templates_root: templates_root.into(),
            previews_root: previews_root.into(),
        }
    }

    pub fn root(&self, kind: NamespaceKind) -> &Path {
        match kind {
            NamespaceKind::Templates => &self.templates_root,
            NamespaceKind::ClientPreviews => &self.previews_root,
        }
    }

    /// Normalizes `name` and returns the token with its directory.
    pub fn namespace_dir(
        &self,
        kind: NamespaceKind,
        name: &str,
    ) -> Result<(String, PathBuf), MaterializationError> {
        let token = normalize_namespace(name);
        if token.is_empty() || token == "." || token == ".." || token.contains(['/', '\\']) {
            return Err(MaterializationError::InvalidNamespace(name.to_string()));
        }
        let dir = self.root(kind).join(&token);
        Ok((token, dir))
    }

    /// Looks up an already-normalized token, as received from a URL.
    pub fn resolve_token(&self, kind: NamespaceKind, token: &str) -> Option<PathBuf> {
        if token.is_empty() || token != normalize_namespace(token) {
            return None;
        }
        safe_relative_path(token)
            .filter(|p| p.components().count() == 1)
            .map(|p| self.root(kind).join(p))
    }
}

/// Writes `files` below the namespace derived from `name`.
///
/// Existing files are overwritten and files absent from `files` are left in
/// place. Each file is replaced atomically, but the tree as a whole is not: a
/// failure part-way keeps whatever was already written.
pub fn materialize(
    layout: &OutputLayout,
    kind: NamespaceKind,
    name: &str,
    files: &[SiteFile],
    main_entry: &str,
) -> Result<Materialized, MaterializationError> {
    let (namespace, directory) = layout.namespace_dir(kind, name)?;
    create_dir(&directory)?;

    for file in files {
        let relative = safe_relative_path(&file.path)
            .ok_or_else(|| MaterializationError::UnsafePath(file.path.clone()))?;
        let target = directory.join(relative);
        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }
        write_atomic(&target, file.content.as_bytes()).map_err(|source| {
            MaterializationError::Io {
                path: target.clone(),
                source,
            }
        })?;
    }

    log::info!(
        "Materialized {} file(s) under {}",
        files.len(),
        directory.display()
    );

    Ok(Materialized {
        preview_url: preview_url(kind, &namespace, main_entry),
        namespace,
        directory,
        files_written: files.len(),
    })
}

fn create_dir(path: &Path) -> Result<(), MaterializationError> {
    fs::create_dir_all(path).map_err(|source| MaterializationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FileContent;
    use tempfile::TempDir;

    fn layout(dir: &TempDir) -> OutputLayout {
        OutputLayout::new(dir.path().join("templates"), dir.path().join("previews"))
    }

    fn text(path: &str, content: &str) -> SiteFile {
        SiteFile {
            path: path.into(),
            content: FileContent::Text(content.into()),
        }
    }

    #[test]
    fn normalization_collapses_whitespace_and_case() {
        assert_eq!(normalize_namespace("Acme  Corp"), "acme-corp");
        assert_eq!(normalize_namespace("acme-corp"), "acme-corp");
        assert_eq!(normalize_namespace("Bob's Shop"), "bob's-shop");
        assert_eq!(normalize_namespace("Tab\tSeparated \n Name"), "tab-separated-name");
    }

    #[test]
    fn edge_whitespace_becomes_dashes() {
        assert_eq!(normalize_namespace(" Acme Corp "), "-acme-corp-");
        assert_eq!(normalize_namespace("\tAcme"), "-acme");
        assert_ne!(normalize_namespace(" Acme "), normalize_namespace("acme"));
    }

    #[test]
    fn writes_tree_and_returns_preview_url() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            text("index.html", "<p>home</p>"),
            text("css/site.css", "body{}"),
            SiteFile {
                path: "img/a.png".into(),
                content: FileContent::Binary(vec![1, 2, 3]),
            },
        ];

        let out = materialize(
            &layout(&dir),
            NamespaceKind::ClientPreviews,
            "Acme Corp",
            &files,
            "index.html",
        )
        .unwrap();

        assert_eq!(out.namespace, "acme-corp");
        assert_eq!(out.files_written, 3);
        assert_eq!(out.preview_url, "/client-previews/acme-corp/index.html");
        let root = dir.path().join("previews/acme-corp");
        assert_eq!(out.directory, root);
        assert_eq!(fs::read_to_string(root.join("css/site.css")).unwrap(), "body{}");
        assert_eq!(fs::read(root.join("img/a.png")).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn materializing_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let files = vec![text("index.html", "v1"), text("a/b/c.txt", "deep")];
        let layout = layout(&dir);

        materialize(&layout, NamespaceKind::Templates, "Site", &files, "index.html").unwrap();
        let first = fs::read_to_string(dir.path().join("templates/site/a/b/c.txt")).unwrap();
        materialize(&layout, NamespaceKind::Templates, "Site", &files, "index.html").unwrap();
        let second = fs::read_to_string(dir.path().join("templates/site/a/b/c.txt")).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            fs::read_to_string(dir.path().join("templates/site/index.html")).unwrap(),
            "v1"
        );
    }

    #[test]
    fn colliding_names_overwrite_and_keep_stale_files() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);

        materialize(
            &layout,
            NamespaceKind::ClientPreviews,
            "Acme  Corp",
            &[text("index.html", "first"), text("old.html", "stale")],
            "index.html",
        )
        .unwrap();
        materialize(
            &layout,
            NamespaceKind::ClientPreviews,
            "acme-corp",
            &[text("index.html", "second")],
            "index.html",
        )
        .unwrap();

        let root = dir.path().join("previews/acme-corp");
        assert_eq!(fs::read_to_string(root.join("index.html")).unwrap(), "second");
        assert_eq!(fs::read_to_string(root.join("old.html")).unwrap(), "stale");
    }

    #[test]
    fn escaping_paths_and_empty_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);

        let escape = materialize(
            &layout,
            NamespaceKind::Templates,
            "site",
            &[text("../outside.html", "x")],
            "index.html",
        );
        assert!(matches!(escape, Err(MaterializationError::UnsafePath(_))));
        assert!(!dir.path().join("templates/outside.html").exists());

        let blank = materialize(&layout, NamespaceKind::Templates, "   ", &[], "index.html");
        assert!(matches!(blank, Err(MaterializationError::InvalidNamespace(_))));

        let slash = layout.namespace_dir(NamespaceKind::Templates, "a/b");
        assert!(matches!(slash, Err(MaterializationError::InvalidNamespace(_))));
    }

    #[test]
    fn url_tokens_must_already_be_normalized() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        assert_eq!(
            layout.resolve_token(NamespaceKind::Templates, "acme-corp"),
            Some(dir.path().join("templates/acme-corp"))
        );
        assert_eq!(layout.resolve_token(NamespaceKind::Templates, ".."), None);
        assert_eq!(layout.resolve_token(NamespaceKind::Templates, "Acme"), None);
    }
}
