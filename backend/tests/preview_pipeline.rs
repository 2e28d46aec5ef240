use common::model::template::TemplateKind;
use sitesmith::pipeline::customize::Customization;
use sitesmith::pipeline::materialize::{NamespaceKind, OutputLayout};
use sitesmith::pipeline::{build_client_preview, load_base_files, register_template};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<head><title>Template Name</title><link rel="stylesheet" href="style.css"></head>
<body><img class="logo" src="placeholder.png" alt="Logo"><h1>Welcome</h1></body>
</html>"#;

const STYLE: &str = "body { color: #333; }\n";

fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    let mut writer = zip::ZipWriter::new(fs::File::create(path).unwrap());
    for (name, content) in entries {
        writer
            .start_file(name.to_string(), zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn static_template_becomes_a_customized_preview() {
    let dir = TempDir::new().unwrap();
    let layout = OutputLayout::new(dir.path().join("templates"), dir.path().join("previews"));
    let archive = dir.path().join("starter.zip");
    write_archive(&archive, &[("index.html", INDEX), ("style.css", STYLE)]);

    let template = register_template(&layout, &archive, "Starter", TemplateKind::Static).unwrap();
    assert_eq!(template.main_entry, "index.html");
    assert_eq!(template.preview_url, "/templates/starter/index.html");
    assert_eq!(template.files.len(), 2);

    let base = load_base_files(&template.directory, &template.files).unwrap();
    let customization = Customization {
        business_name: Some("Bob's Shop".into()),
        ..Default::default()
    };
    let preview =
        build_client_preview(&layout, "Bob's Shop", &base, &customization, &template.main_entry)
            .unwrap();

    let (token, tree) = layout
        .namespace_dir(NamespaceKind::ClientPreviews, "Bob's Shop")
        .unwrap();
    assert_eq!(token, "bob's-shop");
    assert_eq!(preview.directory, tree);
    assert!(preview.preview_url.ends_with("/index.html"));

    let html = fs::read_to_string(tree.join("index.html")).unwrap();
    assert!(html.contains("<title>Bob's Shop</title>"));
    // No logo was supplied, so the logo image keeps its source.
    assert!(html.contains(r#"<img class="logo" src="placeholder.png" alt="Logo">"#));
    assert_eq!(fs::read_to_string(tree.join("style.css")).unwrap(), STYLE);

    // The template tree is untouched by the preview build.
    assert_eq!(
        fs::read_to_string(template.directory.join("index.html")).unwrap(),
        INDEX
    );
}

#[test]
fn uploading_again_overwrites_in_place() {
    let dir = TempDir::new().unwrap();
    let layout = OutputLayout::new(dir.path().join("templates"), dir.path().join("previews"));

    let first = dir.path().join("v1.zip");
    write_archive(&first, &[("index.html", "<p>v1</p>"), ("old.css", "a{}")]);
    register_template(&layout, &first, "Acme  Corp", TemplateKind::Static).unwrap();

    let second = dir.path().join("v2.zip");
    write_archive(&second, &[("index.html", "<p>v2</p>")]);
    let build = register_template(&layout, &second, "acme-corp", TemplateKind::Static).unwrap();

    assert_eq!(build.namespace, "acme-corp");
    assert_eq!(
        fs::read_to_string(build.directory.join("index.html")).unwrap(),
        "<p>v2</p>"
    );
    // Files absent from the newer archive are not cleaned up.
    assert!(build.directory.join("old.css").exists());
}
