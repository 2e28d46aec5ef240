use common::model::template::TemplateKind;

/// Root document of every static template, and the fallback for component ones.
pub const DEFAULT_ENTRY: &str = "index.html";

/// Conventional entry modules of a component template, most preferred first.
pub const COMPONENT_ENTRY_PRIORITY: [&str; 8] = [
    "index.js",
    "index.jsx",
    "index.ts",
    "index.tsx",
    "App.js",
    "App.jsx",
    "App.ts",
    "App.tsx",
];

/// Picks the file served as a template's preview root.
///
/// Static templates always use `index.html`; whether it exists is checked at
/// serve time. Component templates take the path whose basename comes first in
/// [`COMPONENT_ENTRY_PRIORITY`], ties going to the earliest path in `paths`.
pub fn classify_entry_point<S: AsRef<str>>(kind: TemplateKind, paths: &[S]) -> String {
    if kind == TemplateKind::Static {
        return DEFAULT_ENTRY.to_string();
    }

    COMPONENT_ENTRY_PRIORITY
        .iter()
        .find_map(|candidate| {
            paths
                .iter()
                .map(|path| path.as_ref())
                .find(|path| basename(path) == *candidate)
        })
        .unwrap_or(DEFAULT_ENTRY)
        .to_string()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_templates_always_use_index_html() {
        assert_eq!(classify_entry_point::<&str>(TemplateKind::Static, &[]), "index.html");
        assert_eq!(
            classify_entry_point(TemplateKind::Static, &["src/App.tsx", "home.html"]),
            "index.html"
        );
    }

    #[test]
    fn index_module_beats_app_module_in_any_order() {
        let forward = ["index.js", "App.tsx"];
        let backward = ["App.tsx", "index.js"];
        assert_eq!(classify_entry_point(TemplateKind::Component, &forward), "index.js");
        assert_eq!(classify_entry_point(TemplateKind::Component, &backward), "index.js");
    }

    #[test]
    fn javascript_beats_typescript_and_full_path_is_kept() {
        let paths = ["src/index.tsx", "src/App.js", "src/index.jsx"];
        assert_eq!(
            classify_entry_point(TemplateKind::Component, &paths),
            "src/index.jsx"
        );
    }

    #[test]
    fn first_path_wins_between_equal_basenames() {
        let paths = ["b/App.jsx", "a/App.jsx"];
        assert_eq!(classify_entry_point(TemplateKind::Component, &paths), "b/App.jsx");
    }

    #[test]
    fn component_without_entry_module_falls_back() {
        let paths = ["main.js", "lib/application.tsx"];
        assert_eq!(classify_entry_point(TemplateKind::Component, &paths), "index.html");
    }
}
