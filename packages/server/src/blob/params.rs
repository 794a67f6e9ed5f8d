use crate::error::AppError;

/// Lookup of a single blob, optionally scoped to a project and/or an artifact.
///
/// A scope that is set must be satisfied by an existing attachment, otherwise
/// the blob is reported as not found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobQuery {
    pub digest: String,
    pub project_id: Option<i64>,
    pub artifact_digest: Option<String>,
}

impl BlobQuery {
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            ..Default::default()
        }
    }

    pub fn in_project(mut self, project_id: i64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn in_artifact(mut self, artifact_digest: impl Into<String>) -> Self {
        self.artifact_digest = Some(artifact_digest.into());
        self
    }
}

/// Identifies the blob to attach, either by surrogate id or by digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobSelector {
    Id(i64),
    Digest(String),
}

impl BlobSelector {
    /// Build a selector from optional transport-level parameters.
    ///
    /// Exactly one of `blob_id` and `digest` must be set.
    pub fn from_parts(blob_id: Option<i64>, digest: Option<String>) -> Result<Self, AppError> {
        match (blob_id, digest) {
            (Some(_), Some(_)) => Err(AppError::BadRequest(
                "only one of blob id and digest may be given".into(),
            )),
            (None, None) => Err(AppError::BadRequest(
                "one of blob id or digest is required".into(),
            )),
            (Some(id), None) if id <= 0 => {
                Err(AppError::BadRequest(format!("invalid blob id {id}")))
            }
            (Some(id), None) => Ok(Self::Id(id)),
            (None, Some(digest)) if digest.is_empty() => {
                Err(AppError::BadRequest("digest must not be empty".into()))
            }
            (None, Some(digest)) => Ok(Self::Digest(digest)),
        }
    }
}

/// Identifies the project, either by id or by (repository or project) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectRef {
    Id(i64),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachToProject {
    pub blob: BlobSelector,
    pub project: ProjectRef,
}
