use sea_orm::Schema;
use sea_orm_migration::prelude::*;

use crate::entity::{bug, bug_attachment, bug_dependency, bug_tag, time_tracking};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        manager
            .create_table(schema.create_table_from_entity(bug::Entity).if_not_exists().to_owned())
            .await?;

        // the sweep scans resolved bugs by deadline
        manager
            .create_index(
                Index::create()
                    .name("idx_bug_status_auto_close")
                    .table(bug::Entity)
                    .col(bug::Column::Status)
                    .col(bug::Column::AutoCloseAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(schema.create_table_from_entity(bug_tag::Entity).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(bug_dependency::Entity).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(bug_attachment::Entity).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(time_tracking::Entity).if_not_exists().to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_time_tracking_bug_worker")
                    .table(time_tracking::Entity)
                    .col(time_tracking::Column::BugId)
                    .col(time_tracking::Column::WorkerId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(time_tracking::Entity).to_owned()).await?;
        manager.drop_table(Table::drop().table(bug_attachment::Entity).to_owned()).await?;
        manager.drop_table(Table::drop().table(bug_dependency::Entity).to_owned()).await?;
        manager.drop_table(Table::drop().table(bug_tag::Entity).to_owned()).await?;
        manager.drop_table(Table::drop().table(bug::Entity).to_owned()).await
    }
}
