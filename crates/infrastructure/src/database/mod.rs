mod allocation_store;
mod errors;
mod memory_store;

pub mod entities;

pub use allocation_store::{SeaOrmAllocationStore, SeaOrmAllocationTx};
pub use memory_store::{InMemoryAllocationStore, InMemoryAllocationTx};

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::config::DatabaseConfig;

/// Open the connection pool described by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(backend = ?db.get_database_backend(), "Database connected");
    Ok(db)
}
