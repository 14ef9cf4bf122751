pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_identity_tables;
mod m20250601_000002_create_project_tables;
mod m20250601_000003_create_bug_tables;
mod m20250601_000004_create_audit_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_identity_tables::Migration),
            Box::new(m20250601_000002_create_project_tables::Migration),
            Box::new(m20250601_000003_create_bug_tables::Migration),
            Box::new(m20250601_000004_create_audit_tables::Migration),
        ]
    }
}
