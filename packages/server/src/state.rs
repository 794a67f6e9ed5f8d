use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::blob::{BlobController, UploadSizeCache};
use crate::config::AppConfig;
use crate::project::{ProjectController, ProjectResolver};
use crate::reconcile::ManifestReconciler;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub blobs: BlobController,
    pub reconciler: ManifestReconciler,
    /// Client used to forward distribution requests upstream.
    pub http: reqwest::Client,
}

impl AppState {
    /// Wire the ledger, the project resolver, and the reconciler together.
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        sizes: Arc<dyn UploadSizeCache>,
    ) -> Self {
        let projects: Arc<dyn ProjectResolver> = Arc::new(ProjectController::new(db.clone()));
        let blobs = BlobController::new(db, projects.clone(), sizes);
        let reconciler = ManifestReconciler::new(blobs.clone(), projects);

        Self {
            config,
            blobs,
            reconciler,
            http: reqwest::Client::new(),
        }
    }
}
