use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::blob;

/// Optional scopes for a blob lookup.
#[derive(Debug, Default, Deserialize)]
pub struct BlobScopeQuery {
    /// Only report the blob if it is attached to this project.
    pub project_id: Option<i64>,
    /// Only report the blob if it is referenced by this artifact.
    pub artifact_digest: Option<String>,
}

/// Response DTO for a single blob.
#[derive(Debug, Serialize, Deserialize)]
pub struct BlobResponse {
    pub id: i64,
    pub digest: String,
    pub content_type: String,
    /// Blob size in bytes.
    pub size: i64,
    pub creation_time: DateTime<Utc>,
}

impl From<blob::Model> for BlobResponse {
    fn from(model: blob::Model) -> Self {
        Self {
            id: model.id,
            digest: model.digest,
            content_type: model.content_type,
            size: model.size,
            creation_time: model.creation_time,
        }
    }
}
