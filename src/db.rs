//! Database pool setup and schema migrations.

use std::time::{Duration, Instant};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::migrator::Migrator;

/// Shorthand used throughout the services so only this module names the
/// sea-orm connection type.
pub type DbPool = DatabaseConnection;

/// Opens the connection pool described by the application config.
pub async fn connect(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let mut options = ConnectOptions::new(cfg.database_url.clone());
    options
        .max_connections(cfg.db_max_connections)
        .min_connections(cfg.db_min_connections)
        .connect_timeout(Duration::from_secs(cfg.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.db_idle_timeout_secs))
        .sqlx_logging(false);

    let pool = Database::connect(options)
        .await
        .map_err(ServiceError::DatabaseError)?;
    info!(
        "Database pool ready (max_connections={})",
        cfg.db_max_connections
    );
    Ok(pool)
}

/// Brings the schema up to date with the embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError)?;
    info!("Migrations applied in {:?}", start.elapsed());
    Ok(())
}
