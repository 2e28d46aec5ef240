//! # Customization Engine
//!
//! Personalises a template's file set for one client. The transform is pure:
//! it never touches the disk and always returns owned copies, one output file
//! per input file, in the same order.
//!
//! ## Substitutions
//!
//! 1.  **Placeholders**: in every text file, `{{key}}` tokens whose key is in
//!     the substitution map are replaced by the mapped value. Tokens with no
//!     mapping are left as they are. Replacement happens in a single pass, so
//!     inserted values are never scanned again.
//!
//! 2.  **Markup**: in `.html` / `.htm` files the first `<title>` element gets the
//!     business name as its text, and the first `<img>` carrying a `logo` class
//!     token gets its `src` pointed at the resolved logo URL.
//!
//! Binary files pass through unchanged.

use crate::error::CustomizationError;
use crate::pipeline::{FileContent, SiteFile};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid placeholder regex"));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<title\b[^>]*>)(.*?)(</title\s*>)").expect("valid title regex")
});
static IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid img regex"));
static CLASS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid class regex")
});
static SRC_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(\s)src\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+)"#).expect("valid src regex")
});

/// Class token marking the image to swap for the client's logo.
const LOGO_CLASS: &str = "logo";

/// What to apply to a template for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customization {
    /// Required; a missing or blank name fails the whole customization.
    pub business_name: Option<String>,
    /// Already resolved to a served URL by the caller.
    pub logo_url: Option<String>,
    pub substitutions: BTreeMap<String, String>,
}

pub fn customize(
    files: &[SiteFile],
    customization: &Customization,
) -> Result<Vec<SiteFile>, CustomizationError> {
    let business_name = customization
        .business_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .ok_or(CustomizationError::MissingBusinessName)?;

    let customized = files
        .iter()
        .map(|file| {
            let content = match &file.content {
                FileContent::Text(text) => {
                    let mut text = substitute_placeholders(text, &customization.substitutions);
                    if is_markup(&file.path) {
                        text = replace_title(&text, business_name);
                        if let Some(logo_url) = customization.logo_url.as_deref() {
                            text = replace_logo(&text, logo_url);
                        }
                    }
                    FileContent::Text(text)
                }
                FileContent::Binary(bytes) => FileContent::Binary(bytes.clone()),
            };
            SiteFile {
                path: file.path.clone(),
                content,
            }
        })
        .collect();

    Ok(customized)
}

pub fn is_markup(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

pub fn substitute_placeholders(text: &str, substitutions: &BTreeMap<String, String>) -> String {
    if substitutions.is_empty() {
        return text.to_string();
    }
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures| match substitutions.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn replace_title(html: &str, business_name: &str) -> String {
    TITLE_RE
        .replacen(html, 1, |caps: &Captures| {
            format!("{}{}{}", &caps[1], business_name, &caps[3])
        })
        .into_owned()
}

fn replace_logo(html: &str, logo_url: &str) -> String {
    let Some(tag) = IMG_RE.find_iter(html).find(|m| has_logo_class(m.as_str())) else {
        return html.to_string();
    };

    let src = format!("src=\"{}\"", logo_url.replace('"', "&quot;"));
    let original = tag.as_str();
    let rewritten = if SRC_ATTR_RE.is_match(original) {
        SRC_ATTR_RE
            .replacen(original, 1, |caps: &Captures| format!("{}{}", &caps[1], src))
            .into_owned()
    } else {
        // `<img` is four bytes; keep whatever follows it.
        format!("<img {}{}", src, &original[4..])
    };

    let mut out = String::with_capacity(html.len() + rewritten.len());
    out.push_str(&html[..tag.start()]);
    out.push_str(&rewritten);
    out.push_str(&html[tag.end()..]);
    out
}

fn has_logo_class(tag: &str) -> bool {
    CLASS_ATTR_RE.captures(tag).is_some_and(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .is_some_and(|value| {
                value
                    .as_str()
                    .split_whitespace()
                    .any(|token| token.eq_ignore_ascii_case(LOGO_CLASS))
            })
    })
}
