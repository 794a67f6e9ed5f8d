use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blob")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Content digest, `<algorithm>:<hex>`. Immutable once written.
    #[sea_orm(unique)]
    pub digest: String,

    /// Media type; corrected by manifest reconciliation when it disagrees.
    pub content_type: String,

    /// Size of the blob in bytes.
    pub size: i64,

    pub creation_time: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
