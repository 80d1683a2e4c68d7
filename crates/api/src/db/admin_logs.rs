//! Admin audit log.
//!
//! Entries are appended inside the transaction of the action they record,
//! so the free function [`insert`] takes any executor. There is no update
//! or delete.

use sqlx::{PgExecutor, PgPool};

use super::RepositoryError;
use crate::models::admin_log::{AdminLog, AdminLogTarget, NewAdminLog};

const COLUMNS: &str = "id, admin_id, action, target_type, target_id, details, created_at";

/// Append an audit entry.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert<'e, E>(executor: E, entry: &NewAdminLog) -> Result<AdminLog, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let log = sqlx::query_as::<_, AdminLog>(&format!(
        r"
        INSERT INTO admin_logs (admin_id, action, target_type, target_id, details)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "
    ))
    .bind(entry.admin_id)
    .bind(entry.action.as_str())
    .bind(entry.target.as_str())
    .bind(entry.target_id)
    .bind(&entry.details)
    .fetch_one(executor)
    .await?;

    tracing::info!(
        admin_id = %entry.admin_id,
        action = %entry.action,
        target_type = entry.target.as_str(),
        target_id = entry.target_id,
        "Admin action recorded"
    );

    Ok(log)
}

/// Read access to the audit log.
pub struct AdminLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminLogRepository<'a> {
    /// Create a new admin log repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Entries about one record, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_target(
        &self,
        target: AdminLogTarget,
        target_id: i32,
    ) -> Result<Vec<AdminLog>, RepositoryError> {
        let logs = sqlx::query_as::<_, AdminLog>(&format!(
            r"
            SELECT {COLUMNS}
            FROM admin_logs
            WHERE target_type = $1 AND target_id = $2
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(target.as_str())
        .bind(target_id)
        .fetch_all(self.pool)
        .await?;

        Ok(logs)
    }
}
