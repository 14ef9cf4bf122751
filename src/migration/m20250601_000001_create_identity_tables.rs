use sea_orm::Schema;
use sea_orm_migration::prelude::*;

use crate::entity::{team, user, worker, workspace};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        manager
            .create_table(schema.create_table_from_entity(user::Entity).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(workspace::Entity).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(team::Entity).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(worker::Entity).if_not_exists().to_owned())
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(worker::Entity).to_owned()).await?;
        manager.drop_table(Table::drop().table(team::Entity).to_owned()).await?;
        manager.drop_table(Table::drop().table(workspace::Entity).to_owned()).await?;
        manager.drop_table(Table::drop().table(user::Entity).to_owned()).await
    }
}
