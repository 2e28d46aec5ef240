use crate::error::ExtractionError;
use crate::pipeline::fs_utils::write_atomic;
use common::model::template::Dependency;
use std::borrow::Cow;
use std::fs;
use std::io::{self, Read, Seek};
use std::path::Path;

/// Archive member holding the template's npm dependencies.
pub const MANIFEST_ENTRY: &str = "package.json";

/// Largest decompressed member accepted by [`extract_archive`].
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Upper bound on buffer preallocation; header sizes are not trusted beyond it.
const PREALLOCATION_CAP: u64 = 1024 * 1024;

/// One non-directory archive member, as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Relative path inside the archive, `/`-separated.
    pub path: String,
    pub bytes: Vec<u8>,
}

impl ExtractedFile {
    /// Best-effort text view; binary members come back mangled.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn is_text(&self) -> bool {
        std::str::from_utf8(&self.bytes).is_ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Members in archive order.
    pub files: Vec<ExtractedFile>,
    /// `None` when the archive has no usable manifest.
    pub dependencies: Option<Vec<Dependency>>,
}

pub fn extract_archive_file(
    archive_path: &Path,
    destination_root: &Path,
) -> Result<Extraction, ExtractionError> {
    let file = fs::File::open(archive_path).map_err(|source| ExtractionError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    extract_archive(io::BufReader::new(file), destination_root)
}

/// Extracts every member of a zip stream below `destination_root`.
///
/// Directories are created as needed and existing ones are reused, so running
/// the same archive twice is safe. A failure part-way leaves what was already
/// written on disk.
pub fn extract_archive<R: Read + Seek>(
    source: R,
    destination_root: &Path,
) -> Result<Extraction, ExtractionError> {
    extract_archive_with_limit(source, destination_root, MAX_ENTRY_BYTES)
}

/// As [`extract_archive`], failing on any member that decompresses to more
/// than `max_entry_bytes`.
pub fn extract_archive_with_limit<R: Read + Seek>(
    source: R,
    destination_root: &Path,
    max_entry_bytes: u64,
) -> Result<Extraction, ExtractionError> {
    let mut archive = zip::ZipArchive::new(source)?;
    create_dir(destination_root)?;

    let mut extraction = Extraction {
        files: Vec::with_capacity(archive.len()),
        dependencies: None,
    };

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractionError::UnsafeEntry(name.clone()))?;
        let output_path = destination_root.join(relative);

        if entry.is_dir() {
            create_dir(&output_path)?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            create_dir(parent)?;
        }

        let mut bytes = Vec::with_capacity(entry.size().min(PREALLOCATION_CAP) as usize);
        entry
            .by_ref()
            .take(max_entry_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|e| ExtractionError::Archive(zip::result::ZipError::Io(e)))?;
        if bytes.len() as u64 > max_entry_bytes {
            return Err(ExtractionError::EntryTooLarge {
                name,
                limit: max_entry_bytes,
            });
        }
        write_atomic(&output_path, &bytes).map_err(|source| ExtractionError::Write {
            path: output_path.clone(),
            source,
        })?;
        log::debug!("Extracted {} ({} bytes)", name, bytes.len());

        if name == MANIFEST_ENTRY {
            extraction.dependencies = parse_manifest(&bytes);
        }

        extraction.files.push(ExtractedFile { path: name, bytes });
    }

    Ok(extraction)
}

fn create_dir(path: &Path) -> Result<(), ExtractionError> {
    fs::create_dir_all(path).map_err(|source| ExtractionError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the `dependencies` table of a `package.json`.
///
/// A manifest that is not valid JSON is logged and ignored.
fn parse_manifest(bytes: &[u8]) -> Option<Vec<Dependency>> {
    let manifest: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Ignoring malformed {}: {}", MANIFEST_ENTRY, e);
            return None;
        }
    };

    let dependencies = manifest
        .get("dependencies")
        .and_then(|deps| deps.as_object())
        .map(|deps| {
            deps.iter()
                .map(|(name, version)| Dependency {
                    name: name.clone(),
                    version: version
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| version.to_string()),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(dependencies)
}
