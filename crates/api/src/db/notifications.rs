//! Notification storage.
//!
//! The grouping write path ([`find_open_group`], [`insert`], [`regroup`]) is
//! a set of executor-generic functions driven by
//! [`Notifier`](crate::notifications::Notifier) inside one transaction. The
//! notification center reads go through [`NotificationRepository`].

use sqlx::{PgExecutor, PgPool};

use stowline_core::{AccountKind, AppointmentId, NotificationId};

use super::RepositoryError;
use crate::models::Notification;
use crate::notifications::{Recipient, RenderedNotification};

const COLUMNS: &str = "id, recipient_type, recipient_id, kind, title, message, group_key, \
                       group_count, appointment_id, is_read, created_at, updated_at";

// =============================================================================
// Grouping write path
// =============================================================================

/// A notification about to be inserted.
#[derive(Debug)]
pub struct NewNotification<'a> {
    pub recipient: Recipient,
    pub kind: &'static str,
    pub rendered: &'a RenderedNotification,
    pub group_key: Option<&'a str>,
    pub appointment_id: Option<AppointmentId>,
}

/// The recipient's unread notification for `group_key`, locked for update.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_open_group<'e, E>(
    executor: E,
    recipient: Recipient,
    group_key: &str,
) -> Result<Option<Notification>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Notification>(&format!(
        r"
        SELECT {COLUMNS}
        FROM notifications
        WHERE recipient_type = $1 AND recipient_id = $2
          AND group_key = $3 AND is_read = FALSE
        FOR UPDATE
        "
    ))
    .bind(recipient.kind)
    .bind(recipient.id)
    .bind(group_key)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Insert a new notification.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert<'e, E>(
    executor: E,
    new: &NewNotification<'_>,
) -> Result<Notification, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Notification>(&format!(
        r"
        INSERT INTO notifications
            (recipient_type, recipient_id, kind, title, message, group_key, appointment_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "
    ))
    .bind(new.recipient.kind)
    .bind(new.recipient.id)
    .bind(new.kind)
    .bind(&new.rendered.title)
    .bind(&new.rendered.message)
    .bind(new.group_key)
    .bind(new.appointment_id)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Fold another event into an open group.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn regroup<'e, E>(
    executor: E,
    id: NotificationId,
    group_count: i32,
    rendered: &RenderedNotification,
    appointment_id: Option<AppointmentId>,
) -> Result<Notification, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Notification>(&format!(
        r"
        UPDATE notifications
        SET group_count = $2,
            title = $3,
            message = $4,
            appointment_id = COALESCE($5, appointment_id),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "
    ))
    .bind(id)
    .bind(group_count)
    .bind(&rendered.title)
    .bind(&rendered.message)
    .bind(appointment_id)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

// =============================================================================
// Notification center
// =============================================================================

/// Repository for reading and acknowledging notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The recipient's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        kind: AccountKind,
        recipient_id: i32,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, Notification>(&format!(
            r"
            SELECT {COLUMNS}
            FROM notifications
            WHERE recipient_type = $1 AND recipient_id = $2
              AND ($3 = FALSE OR is_read = FALSE)
            ORDER BY updated_at DESC, id DESC
            LIMIT $4
            "
        ))
        .bind(kind)
        .bind(recipient_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Number of unread notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(
        &self,
        kind: AccountKind,
        recipient_id: i32,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM notifications
            WHERE recipient_type = $1 AND recipient_id = $2 AND is_read = FALSE
            ",
        )
        .bind(kind)
        .bind(recipient_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Mark one of the recipient's notifications read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification doesn't exist
    /// or belongs to someone else.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        kind: AccountKind,
        recipient_id: i32,
    ) -> Result<Notification, RepositoryError> {
        sqlx::query_as::<_, Notification>(&format!(
            r"
            UPDATE notifications
            SET is_read = TRUE, updated_at = NOW()
            WHERE id = $1 AND recipient_type = $2 AND recipient_id = $3
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(kind)
        .bind(recipient_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Mark everything read. Returns how many notifications changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_all_read(
        &self,
        kind: AccountKind,
        recipient_id: i32,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE notifications
            SET is_read = TRUE, updated_at = NOW()
            WHERE recipient_type = $1 AND recipient_id = $2 AND is_read = FALSE
            ",
        )
        .bind(kind)
        .bind(recipient_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
