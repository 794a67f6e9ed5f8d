use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// First path segment of every repository owned by this project.
    #[sea_orm(unique)]
    pub name: String,

    pub creation_time: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
