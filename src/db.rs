use rocket_db_pools::sqlx::{self, PgPool, migrate::Migrator};
use rocket_db_pools::Database;

#[derive(Database)]
#[database("content_db")]
pub struct ContentDb(sqlx::PgPool);

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations. Already-applied migrations are skipped, and a
/// checksum mismatch fails startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
