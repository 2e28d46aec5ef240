use serde::{Deserialize, Serialize};

/// An uploaded file (template archive or logo) kept under the media root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: String,
    /// Name the file was uploaded with.
    pub original_filename: String,
    /// `<md5>.<ext>` name on disk, also the last segment of its served URL.
    pub stored_filename: String,
    pub mime_type: String,
    pub md5: String,
}

impl MediaAsset {
    pub fn url(&self) -> String {
        format!("/media/{}", self.stored_filename)
    }
}
