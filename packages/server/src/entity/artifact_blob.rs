use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A blob referenced by an artifact's manifest.
///
/// The row `(d, d)` for a manifest digest `d` marks the artifact's blob set as
/// completely recorded.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artifact_blob")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub artifact_digest: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub blob_digest: String,

    pub creation_time: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
