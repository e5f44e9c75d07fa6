//! Run database migrations

use anyhow::Context;
use canary_storage::PostgresStorage;

pub async fn execute(database_url: &str) -> anyhow::Result<()> {
    let storage = PostgresStorage::new(database_url)
        .await
        .context("Failed to connect to database")?;

    canary_storage::migrations::run_migrations(storage.pool())
        .await
        .context("Failed to run migrations")?;

    println!("Migrations applied");
    Ok(())
}
