//! Serves materialized trees and uploaded media from disk.
//!
//! - `/templates/{token}/{path..}` and `/client-previews/{token}/{path..}`
//!   answer with the file at `path` inside the namespace. Without a path,
//!   `index.html` is served, or the first `.html` file when there is none.
//! - On the template route, script sources (`.js`, `.jsx`, `.ts`, `.tsx`) are
//!   wrapped in an HTML page that loads React and Babel from a CDN and
//!   renders the module's `App`, so a component template previews in place.
//! - `/media/{file}` serves an uploaded file by its stored name.

use crate::pipeline::fs_utils::safe_relative_path;
use crate::pipeline::materialize::NamespaceKind;
use crate::services::AppState;
use actix_web::web::{get, scope};
use actix_web::{web, HttpRequest, HttpResponse, Scope};
use std::fs;
use std::path::{Path, PathBuf};

const SCRIPT_EXTENSIONS: [&str; 5] = ["js", "jsx", "ts", "tsx", "mjs"];
const COMPONENT_EXTENSIONS: [&str; 4] = ["js", "jsx", "ts", "tsx"];

pub fn template_routes() -> Scope {
    scope("/templates")
        .route("/{token}", get().to(serve_template))
        .route("/{token}/{tail:.*}", get().to(serve_template))
}

pub fn preview_routes() -> Scope {
    scope("/client-previews")
        .route("/{token}", get().to(serve_preview))
        .route("/{token}/{tail:.*}", get().to(serve_preview))
}

pub fn media_routes() -> Scope {
    scope("/media").route("/{file}", get().to(serve_media))
}

async fn serve_template(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    serve_namespace(&req, &state, NamespaceKind::Templates)
}

async fn serve_preview(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    serve_namespace(&req, &state, NamespaceKind::ClientPreviews)
}

fn serve_namespace(req: &HttpRequest, state: &AppState, kind: NamespaceKind) -> HttpResponse {
    let token = req.match_info().query("token");
    let tail = req.match_info().get("tail").unwrap_or("");

    let Some(root) = state.layout.resolve_token(kind, token) else {
        return not_found();
    };
    let Some(file) = resolve_file(&root, tail) else {
        return not_found();
    };

    match fs::read(&file) {
        Ok(bytes) => {
            if kind == NamespaceKind::Templates && has_extension(&file, &COMPONENT_EXTENSIONS) {
                let source = String::from_utf8_lossy(&bytes);
                return HttpResponse::Ok()
                    .content_type("text/html; charset=utf-8")
                    .body(component_shell(token, &source));
            }
            HttpResponse::Ok()
                .content_type(content_type(&file))
                .body(bytes)
        }
        Err(e) => {
            log::error!("Failed to read {}: {}", file.display(), e);
            HttpResponse::InternalServerError().body("The operation failed")
        }
    }
}

async fn serve_media(file: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    let Some(relative) = safe_relative_path(&file).filter(|p| p.components().count() == 1) else {
        return not_found();
    };
    let path = state.media_root.join(relative);
    match fs::read(&path) {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(content_type(&path))
            .body(bytes),
        Err(_) => not_found(),
    }
}

/// Picks the file a request path refers to inside `root`.
fn resolve_file(root: &Path, tail: &str) -> Option<PathBuf> {
    let tail = tail.trim_matches('/');
    let dir = if tail.is_empty() {
        root.to_path_buf()
    } else {
        let candidate = root.join(safe_relative_path(tail)?);
        if candidate.is_file() {
            return Some(candidate);
        }
        candidate
    };
    if !dir.is_dir() {
        return None;
    }

    let index = dir.join("index.html");
    if index.is_file() {
        return Some(index);
    }
    let mut pages: Vec<PathBuf> = fs::read_dir(&dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_extension(path, &["html"]))
        .collect();
    pages.sort();
    pages.into_iter().next()
}

fn content_type(path: &Path) -> String {
    if has_extension(path, &SCRIPT_EXTENSIONS) {
        return "application/javascript".to_string();
    }
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Module syntax is stripped since the shell evaluates the source as a
/// classic Babel script.
fn component_shell(title: &str, source: &str) -> String {
    let body: String = source
        .lines()
        .filter(|line| !line.trim_start().starts_with("import "))
        .map(|line| {
            line.replacen("export default ", "", 1)
                .replacen("export ", "", 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .replace("</script", "<\\/script");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <script crossorigin src="https://unpkg.com/react@18/umd/react.development.js"></script>
  <script crossorigin src="https://unpkg.com/react-dom@18/umd/react-dom.development.js"></script>
  <script src="https://unpkg.com/@babel/standalone/babel.min.js"></script>
</head>
<body>
  <div id="root"></div>
  <script type="text/babel" data-presets="env,react,typescript" data-filename="App.tsx">
{body}
const root = ReactDOM.createRoot(document.getElementById('root'));
root.render(<App />);
  </script>
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "Not found",
        "kind": "not_found",
    }))
}
