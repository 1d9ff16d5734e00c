use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::AppConfig;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(db).await.context("apply migrations")?;
    info!(count = MIGRATOR.iter().count(), "migrations applied");
    Ok(())
}

/// Reverts every applied migration.
pub async fn rollback(db: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.undo(db, 0).await.context("revert migrations")?;
    info!("migrations reverted");
    Ok(())
}
