use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::entity::project;

/// Insert the configured projects, leaving existing ones untouched.
pub async fn seed_projects(db: &DatabaseConnection, names: &[String]) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for name in names {
        let model = project::ActiveModel {
            name: Set(name.clone()),
            creation_time: Set(Utc::now()),
            ..Default::default()
        };

        let result = project::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(project::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} new projects", inserted);
    }

    Ok(())
}
