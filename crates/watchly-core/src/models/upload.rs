use serde::{Deserialize, Serialize};
use std::fmt;

const VIDEO_CONTENT_TYPES: &[&str] = &[
    "video/mp4",
    "video/avi",
    "video/mov",
    "video/wmv",
    "video/flv",
    "video/webm",
    // Registered names for the same containers
    "video/quicktime",
    "video/x-msvideo",
    "video/x-ms-wmv",
    "video/x-flv",
];

const IMAGE_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Which part of a movie upload a file field carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Video,
    Thumbnail,
}

impl FileRole {
    /// Map a multipart field name to its role.
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "video" => Some(FileRole::Video),
            "thumbnail" => Some(FileRole::Thumbnail),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Video => "video",
            FileRole::Thumbnail => "thumbnail",
        }
    }

    pub fn allowed_content_types(&self) -> &'static [&'static str] {
        match self {
            FileRole::Video => VIDEO_CONTENT_TYPES,
            FileRole::Thumbnail => IMAGE_CONTENT_TYPES,
        }
    }

    /// Check a declared content type against the allow-list. MIME parameters are ignored.
    pub fn accepts(&self, content_type: &str) -> bool {
        let normalized = normalize_mime_type(content_type).to_lowercase();
        self.allowed_content_types()
            .iter()
            .any(|allowed| *allowed == normalized)
    }

    pub fn invalid_type_message(&self) -> &'static str {
        match self {
            FileRole::Video => "Invalid video file type. Allowed types: MP4, AVI, MOV, WMV, FLV, WEBM",
            FileRole::Thumbnail => "Invalid image file type. Allowed types: JPEG, PNG, GIF, WEBP",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip MIME parameters (e.g. "video/mp4; codecs=avc1" -> "video/mp4").
fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}
