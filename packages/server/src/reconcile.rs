use std::sync::Arc;

use common::distribution::{media_type, unmarshal_manifest};
use tracing::{info, instrument};

use crate::blob::{AttachToProject, BlobController, BlobSelector, ProjectRef};
use crate::error::AppError;
use crate::project::ProjectResolver;

/// Applies pushed manifests and completed uploads to the blob ledger.
///
/// Each step is idempotent, so a workflow that fails half way is repaired by
/// running it again rather than by rolling back.
#[derive(Clone)]
pub struct ManifestReconciler {
    blobs: BlobController,
    projects: Arc<dyn ProjectResolver>,
}

impl ManifestReconciler {
    pub fn new(blobs: BlobController, projects: Arc<dyn ProjectResolver>) -> Self {
        Self { blobs, projects }
    }

    /// Reconcile a manifest that the registry has stored under `repository`.
    #[instrument(skip(self, body), fields(size = body.len()))]
    pub async fn reconcile_manifest(
        &self,
        repository: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), AppError> {
        let project = self.projects.get_by_name(repository).await?;
        let (manifest, descriptor) = unmarshal_manifest(content_type, body)?;
        let references = manifest.references();

        self.blobs.sync(&references).await?;

        // foreign layers belong to no other artifact; attach them to the project directly
        for layer in manifest.foreign_layers() {
            self.blobs
                .attach_to_project(AttachToProject {
                    blob: BlobSelector::Digest(layer.digest.to_string()),
                    project: ProjectRef::Id(project.id),
                })
                .await?;
        }

        let manifest_digest = descriptor.digest.to_string();
        let blob_id = self
            .blobs
            .ensure(&manifest_digest, &descriptor.media_type, descriptor.size)
            .await?;
        self.blobs
            .attach_to_project(AttachToProject {
                blob: BlobSelector::Id(blob_id),
                project: ProjectRef::Id(project.id),
            })
            .await?;

        let digests: Vec<String> = references.iter().map(|r| r.digest.to_string()).collect();
        self.blobs
            .attach_to_artifact(&manifest_digest, &digests)
            .await?;

        info!(
            project_id = project.id,
            digest = %manifest_digest,
            references = digests.len(),
            "Reconciled manifest"
        );
        Ok(())
    }

    /// Record a blob whose upload session completed under `repository`.
    #[instrument(skip(self))]
    pub async fn record_blob_upload(
        &self,
        repository: &str,
        digest: &str,
        size: i64,
    ) -> Result<i64, AppError> {
        let project = self.projects.get_by_name(repository).await?;
        let blob_id = self
            .blobs
            .ensure(digest, media_type::OCTET_STREAM, size)
            .await?;
        self.blobs
            .attach_to_project(AttachToProject {
                blob: BlobSelector::Id(blob_id),
                project: ProjectRef::Id(project.id),
            })
            .await?;
        Ok(blob_id)
    }
}
