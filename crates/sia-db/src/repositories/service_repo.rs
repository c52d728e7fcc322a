//! Repository for the `services` table.
//!
//! Rows are soft-deleted: lookups only ever see rows with `deleted = FALSE`.
use chrono::Utc;
use sqlx::MySqlPool;
use tracing::debug;

use crate::{
    error::DbError,
    models::service::{Service, ServiceId},
};

// `binary` is a reserved word in MySQL.
const SERVICE_COLUMNS: &str = "\
    id, host, `binary`, report_count, disabled, \
    created_at, updated_at, deleted_at, deleted";

pub struct ServiceRepo;

impl ServiceRepo {
    /// Insert an enabled service with a zero report count.
    pub async fn create(pool: &MySqlPool, host: &str, binary: &str) -> Result<Service, DbError> {
        let result = sqlx::query(
            "INSERT INTO services (host, `binary`, report_count, disabled, created_at, deleted) \
             VALUES (?, ?, 0, FALSE, ?, FALSE)",
        )
        .bind(host)
        .bind(binary)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        let id = result.last_insert_id() as ServiceId;
        debug!(id, host, binary, "created service");
        Self::find_by_id(pool, id).await?.ok_or(DbError::NotFound(id))
    }

    pub async fn find_by_id(pool: &MySqlPool, id: ServiceId) -> Result<Option<Service>, DbError> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ? AND deleted = FALSE");
        let service = sqlx::query_as::<_, Service>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(service)
    }

    pub async fn find_by_host_and_binary(
        pool: &MySqlPool,
        host: &str,
        binary: &str,
    ) -> Result<Option<Service>, DbError> {
        let query = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE host = ? AND `binary` = ? AND deleted = FALSE \
             ORDER BY id LIMIT 1"
        );
        let service = sqlx::query_as::<_, Service>(&query)
            .bind(host)
            .bind(binary)
            .fetch_optional(pool)
            .await?;
        Ok(service)
    }

    /// Existing row for `(host, binary)`, or a newly created one.
    pub async fn find_or_create(pool: &MySqlPool, host: &str, binary: &str) -> Result<Service, DbError> {
        match Self::find_by_host_and_binary(pool, host, binary).await? {
            Some(service) => Ok(service),
            None => Self::create(pool, host, binary).await,
        }
    }

    pub async fn list_enabled(pool: &MySqlPool) -> Result<Vec<Service>, DbError> {
        let query = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE disabled = FALSE AND deleted = FALSE ORDER BY id"
        );
        let services = sqlx::query_as::<_, Service>(&query).fetch_all(pool).await?;
        Ok(services)
    }

    /// Bump `report_count` and return the updated row.
    pub async fn increment_report_count(pool: &MySqlPool, id: ServiceId) -> Result<Service, DbError> {
        let result = sqlx::query(
            "UPDATE services SET report_count = report_count + 1, updated_at = ? \
             WHERE id = ? AND deleted = FALSE",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(id));
        }
        Self::find_by_id(pool, id).await?.ok_or(DbError::NotFound(id))
    }

    pub async fn set_disabled(pool: &MySqlPool, id: ServiceId, disabled: bool) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE services SET disabled = ?, updated_at = ? WHERE id = ? AND deleted = FALSE",
        )
        .bind(disabled)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        // MySQL reports 0 affected rows when the value is unchanged, so confirm the row exists.
        if result.rows_affected() == 0 && Self::find_by_id(pool, id).await?.is_none() {
            return Err(DbError::NotFound(id));
        }
        Ok(())
    }

    pub async fn soft_delete(pool: &MySqlPool, id: ServiceId) -> Result<(), DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE services SET deleted = TRUE, deleted_at = ?, updated_at = ? \
             WHERE id = ? AND deleted = FALSE",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(id));
        }
        debug!(id, "soft-deleted service");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATION: &str = include_str!("../../migrations/0001_create_services.sql");

    #[test]
    fn every_selected_column_exists_in_schema() {
        for column in SERVICE_COLUMNS.split(',').map(str::trim) {
            assert!(MIGRATION.contains(column), "{column} missing from migration");
        }
    }

    #[test]
    fn reserved_binary_column_is_quoted() {
        assert!(SERVICE_COLUMNS.contains("`binary`"));
        assert!(MIGRATION.contains("`binary`"));
    }
}
