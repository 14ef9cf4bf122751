use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, instrument};

use crate::migration::{Migrator, MigratorTrait};

#[instrument(skip(database_url))]
pub async fn init_db(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    info!("configuring database connection");

    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(10)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    info!("connecting to database");
    let db = Database::connect(options).await?;
    info!("database connection established");

    Ok(db)
}

/// Applies all pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("running database migrations");
    Migrator::up(db, None).await?;
    info!("migrations complete");
    Ok(())
}
