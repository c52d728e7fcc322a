use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type ServiceId = i64;

/// A row from the `services` table: one running binary on one host.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub host: Option<String>,
    pub binary: Option<String>,
    pub report_count: i32,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl Service {
    /// Neither disabled nor soft-deleted.
    pub fn is_active(&self) -> bool {
        !self.disabled && !self.deleted
    }
}
