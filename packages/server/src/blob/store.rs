use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
    sea_query::OnConflict,
};

use crate::entity::{artifact_blob, blob, project_blob};

/// Persistence for blob rows and their attachments.
///
/// Uniqueness (one row per digest, one row per attachment pair) is enforced by
/// the schema; every insert here ignores conflicts instead of checking first.
pub struct BlobStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> BlobStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Insert a blob, or return the id of the row already holding `digest`.
    ///
    /// Concurrent callers with the same digest all observe the id of the single
    /// row that won the insert.
    pub async fn upsert_returning_existing_on_conflict(
        &self,
        digest: &str,
        content_type: &str,
        size: i64,
    ) -> Result<i64, DbErr> {
        let model = blob::ActiveModel {
            digest: Set(digest.to_string()),
            content_type: Set(content_type.to_string()),
            size: Set(size),
            creation_time: Set(Utc::now()),
            ..Default::default()
        };

        let result = blob::Entity::insert(model)
            .on_conflict(
                OnConflict::column(blob::Column::Digest)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }

        self.get_by_digest(digest)
            .await?
            .map(|b| b.id)
            .ok_or_else(|| DbErr::RecordNotFound(format!("blob {digest} vanished after insert")))
    }

    pub async fn get_by_digest(&self, digest: &str) -> Result<Option<blob::Model>, DbErr> {
        blob::Entity::find()
            .filter(blob::Column::Digest.eq(digest))
            .one(self.conn)
            .await
    }

    pub async fn list_by_digests(&self, digests: &[String]) -> Result<Vec<blob::Model>, DbErr> {
        if digests.is_empty() {
            return Ok(Vec::new());
        }
        blob::Entity::find()
            .filter(blob::Column::Digest.is_in(digests.to_vec()))
            .all(self.conn)
            .await
    }

    pub async fn update_content_type(
        &self,
        model: blob::Model,
        content_type: &str,
    ) -> Result<blob::Model, DbErr> {
        let mut active: blob::ActiveModel = model.into();
        active.content_type = Set(content_type.to_string());
        active.update(self.conn).await
    }

    pub async fn attach_to_artifact(
        &self,
        artifact_digest: &str,
        blob_digest: &str,
    ) -> Result<(), DbErr> {
        let model = artifact_blob::ActiveModel {
            artifact_digest: Set(artifact_digest.to_string()),
            blob_digest: Set(blob_digest.to_string()),
            creation_time: Set(Utc::now()),
        };

        let result = artifact_blob::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    artifact_blob::Column::ArtifactDigest,
                    artifact_blob::Column::BlobDigest,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn is_attached_to_artifact(
        &self,
        artifact_digest: &str,
        blob_digest: &str,
    ) -> Result<bool, DbErr> {
        let row = artifact_blob::Entity::find_by_id((
            artifact_digest.to_string(),
            blob_digest.to_string(),
        ))
        .one(self.conn)
        .await?;
        Ok(row.is_some())
    }

    pub async fn attach_to_project(&self, blob_id: i64, project_id: i64) -> Result<(), DbErr> {
        let model = project_blob::ActiveModel {
            blob_id: Set(blob_id),
            project_id: Set(project_id),
            creation_time: Set(Utc::now()),
        };

        let result = project_blob::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    project_blob::Column::BlobId,
                    project_blob::Column::ProjectId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn is_attached_to_project(
        &self,
        blob_id: i64,
        project_id: i64,
    ) -> Result<bool, DbErr> {
        let row = project_blob::Entity::find_by_id((blob_id, project_id))
            .one(self.conn)
            .await?;
        Ok(row.is_some())
    }
}
