//! Persistence for sia service records (MySQL via sqlx).
use sqlx::mysql::MySqlPoolOptions;

mod error;
pub use error::DbError;

pub mod models;
pub mod repositories;

pub use models::service::{Service, ServiceId};
pub use repositories::service_repo::ServiceRepo;

pub type DbPool = sqlx::MySqlPool;

/// Create a connection pool from a database URL.
pub async fn connect(database_url: &str) -> Result<DbPool, DbError> {
    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the bundled schema migrations.
pub async fn migrate(pool: &DbPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
