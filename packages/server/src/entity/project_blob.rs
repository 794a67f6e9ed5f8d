use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_blob")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub blob_id: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub project_id: i64,

    pub creation_time: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
