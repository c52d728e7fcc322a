use thiserror::Error;

use crate::models::service::ServiceId;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("service {0} not found")]
    NotFound(ServiceId),
}
