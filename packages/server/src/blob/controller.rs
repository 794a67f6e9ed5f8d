use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common::Descriptor;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info, instrument, warn};

use super::params::{AttachToProject, BlobQuery, BlobSelector, ProjectRef};
use super::store::BlobStore;
use super::upload_size::UploadSizeCache;
use crate::entity::blob;
use crate::error::AppError;
use crate::project::ProjectResolver;

/// Domain API over blobs and their artifact/project attachments.
#[derive(Clone)]
pub struct BlobController {
    db: DatabaseConnection,
    projects: Arc<dyn ProjectResolver>,
    sizes: Arc<dyn UploadSizeCache>,
}

impl BlobController {
    pub fn new(
        db: DatabaseConnection,
        projects: Arc<dyn ProjectResolver>,
        sizes: Arc<dyn UploadSizeCache>,
    ) -> Self {
        Self {
            db,
            projects,
            sizes,
        }
    }

    fn store(&self) -> BlobStore<'_, DatabaseConnection> {
        BlobStore::new(&self.db)
    }

    /// Return the id of the blob with `digest`, creating it if absent.
    ///
    /// On a hit the stored content type and size are kept and the arguments
    /// ignored.
    #[instrument(skip(self))]
    pub async fn ensure(
        &self,
        digest: &str,
        content_type: &str,
        size: i64,
    ) -> Result<i64, AppError> {
        if digest.is_empty() {
            return Err(AppError::BadRequest("digest is required".into()));
        }

        if let Some(existing) = self.store().get_by_digest(digest).await? {
            debug!(blob_id = existing.id, "Blob already recorded");
            return Ok(existing.id);
        }

        let id = self
            .store()
            .upsert_returning_existing_on_conflict(digest, content_type, size)
            .await?;
        info!(blob_id = id, "Recorded blob");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, query: &BlobQuery) -> Result<blob::Model, AppError> {
        if query.digest.is_empty() {
            return Err(AppError::BadRequest("digest is required".into()));
        }

        let store = self.store();
        let blob = store
            .get_by_digest(&query.digest)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("blob {} not found", query.digest)))?;

        if let Some(project_id) = query.project_id {
            if !store.is_attached_to_project(blob.id, project_id).await? {
                return Err(AppError::NotFound(format!(
                    "blob {} not found in project {project_id}",
                    query.digest
                )));
            }
        }

        if let Some(artifact_digest) = &query.artifact_digest {
            if !store
                .is_attached_to_artifact(artifact_digest, &query.digest)
                .await?
            {
                return Err(AppError::NotFound(format!(
                    "blob {} not found in artifact {artifact_digest}",
                    query.digest
                )));
            }
        }

        Ok(blob)
    }

    /// Like [`get`](Self::get), with "not found" reported as `false`.
    pub async fn exist(&self, query: &BlobQuery) -> Result<bool, AppError> {
        match self.get(query).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Record every blob of an artifact, then the artifact's self-attachment.
    ///
    /// The self-attachment `(artifact_digest, artifact_digest)` is the
    /// completion marker and is written last. When it is already present the
    /// call does nothing. A failure part way through leaves no marker, so the
    /// next call attaches every member again.
    #[instrument(skip(self, blob_digests), fields(blobs = blob_digests.len()))]
    pub async fn attach_to_artifact(
        &self,
        artifact_digest: &str,
        blob_digests: &[String],
    ) -> Result<(), AppError> {
        let store = self.store();

        if store
            .is_attached_to_artifact(artifact_digest, artifact_digest)
            .await?
        {
            info!("Artifact blobs already recorded, skipping");
            return Ok(());
        }

        for blob_digest in blob_digests {
            store
                .attach_to_artifact(artifact_digest, blob_digest)
                .await?;
        }

        store
            .attach_to_artifact(artifact_digest, artifact_digest)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn attach_to_project(&self, params: AttachToProject) -> Result<(), AppError> {
        let blob_id = match params.blob {
            BlobSelector::Id(id) => id,
            BlobSelector::Digest(digest) => self.get(&BlobQuery::new(digest)).await?.id,
        };

        let project_id = match params.project {
            ProjectRef::Id(id) => id,
            ProjectRef::Name(name) => self.projects.get_by_name(&name).await?.id,
        };

        self.store().attach_to_project(blob_id, project_id).await?;
        Ok(())
    }

    /// Bring the blob table in line with the references declared by a manifest.
    ///
    /// Content type corrections are applied in one transaction; missing blobs
    /// are then created one by one. Nothing is rolled back once created.
    #[instrument(skip(self, references), fields(references = references.len()))]
    pub async fn sync(&self, references: &[Descriptor]) -> Result<(), AppError> {
        if references.is_empty() {
            return Ok(());
        }

        let digests: Vec<String> = references.iter().map(|r| r.digest.to_string()).collect();
        let existing = self.store().list_by_digests(&digests).await?;
        let by_digest: HashMap<&str, &blob::Model> =
            existing.iter().map(|b| (b.digest.as_str(), b)).collect();

        let mut seen = HashSet::new();
        let mut updates = Vec::new();
        let mut creates = Vec::new();
        for (reference, digest) in references.iter().zip(&digests) {
            if !seen.insert(digest.as_str()) {
                continue;
            }
            match by_digest.get(digest.as_str()) {
                Some(blob) if blob.content_type != reference.media_type => {
                    updates.push(((*blob).clone(), reference.media_type.as_str()));
                }
                Some(_) => {}
                None => creates.push((digest.as_str(), reference)),
            }
        }

        if !updates.is_empty() {
            let txn = self.db.begin().await?;
            let store = BlobStore::new(&txn);
            for (blob, content_type) in updates {
                let digest = blob.digest.clone();
                if let Err(e) = store.update_content_type(blob, content_type).await {
                    warn!(%digest, error = %e, "Failed to update blob content type");
                    return Err(e.into());
                }
            }
            txn.commit().await?;
        }

        for (digest, reference) in creates {
            self.store()
                .upsert_returning_existing_on_conflict(
                    digest,
                    &reference.media_type,
                    reference.size,
                )
                .await?;
        }

        Ok(())
    }

    pub async fn set_accepted_blob_size(
        &self,
        session_id: &str,
        size: i64,
    ) -> Result<(), AppError> {
        self.sizes.set_accepted_blob_size(session_id, size).await
    }

    pub async fn get_accepted_blob_size(&self, session_id: &str) -> Result<i64, AppError> {
        self.sizes.get_accepted_blob_size(session_id).await
    }
}
