use serde::{Deserialize, Serialize};

/// Storage-finalize notification delivered when a new object lands in the
/// upload bucket. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEvent {
    pub bucket: String,
    /// Full object path, `owners/{ownerId}/uploads/{fileName}`.
    #[serde(rename = "name")]
    pub object_path: String,
    #[serde(rename = "contentType", default)]
    pub content_type: Option<String>,
    /// Object size in bytes, when the notification carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UploadMetadata>,
}

/// Custom metadata the upload widget attaches to the object. When
/// `project_id` is present it is the authoritative correlation key;
/// otherwise correlation falls back to a storage-path lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

impl StorageEvent {
    /// Whether this event is in scope for the pipeline: an image object
    /// inside an `uploads` folder. Everything else is a silent no-op.
    pub fn accepts(&self) -> bool {
        let is_image = self
            .content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        is_image && UploadPath::parse(&self.object_path).is_some()
    }

    /// The non-empty user prompt carried in metadata, if any.
    pub fn user_prompt(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.user_prompt.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn project_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.project_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Owner and file name extracted from an upload object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPath {
    pub owner_id: String,
    pub file_name: String,
}

impl UploadPath {
    /// Parse `owners/{ownerId}/uploads/{fileName}`. Returns `None` unless the
    /// path has an interior `uploads` segment and non-empty owner and file
    /// components.
    pub fn parse(object_path: &str) -> Option<Self> {
        if !object_path.contains("/uploads/") {
            return None;
        }

        let segments: Vec<&str> = object_path.split('/').collect();
        let owner_id = segments.get(1).copied().unwrap_or_default();
        let file_name = segments.last().copied().unwrap_or_default();

        if owner_id.is_empty() || file_name.is_empty() {
            return None;
        }

        Some(Self {
            owner_id: owner_id.to_string(),
            file_name: file_name.to_string(),
        })
    }

    /// The file name without its final extension, used to derive result keys
    /// when no project id is known.
    pub fn file_stem(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.file_name)
    }
}
