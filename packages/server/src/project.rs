use async_trait::async_trait;
use common::distribution::project_name;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::instrument;

use crate::entity::project;
use crate::error::AppError;

/// Resolves the project that owns a repository.
#[async_trait]
pub trait ProjectResolver: Send + Sync {
    /// Look a project up by repository name. The first path segment of the
    /// repository is the project name, so `library/nginx` resolves `library`.
    async fn get_by_name(&self, repository: &str) -> Result<project::Model, AppError>;
}

/// [`ProjectResolver`] over the `project` table.
#[derive(Clone)]
pub struct ProjectController {
    db: DatabaseConnection,
}

impl ProjectController {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectResolver for ProjectController {
    #[instrument(skip(self))]
    async fn get_by_name(&self, repository: &str) -> Result<project::Model, AppError> {
        let name = project_name(repository);
        if name.is_empty() {
            return Err(AppError::BadRequest("project name is required".into()));
        }

        project::Entity::find()
            .filter(project::Column::Name.eq(name))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project {name} not found")))
    }
}
