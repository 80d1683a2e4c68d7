//! In-app notifications.
//!
//! A [`NotificationEvent`] is something that happened (a job was assigned, a
//! partner was approved). Each event maps to a [`NotificationTemplate`] that
//! says which account kinds may receive it and whether repeated events
//! coalesce. [`Notifier`] renders and stores them; groupable kinds fold into
//! the recipient's existing unread notification with the same group key
//! instead of adding a new row.

mod events;

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use stowline_core::{AccountKind, AdminId, DriverId, MovingPartnerId, UserId};

use crate::db::{RepositoryError, notifications as store};
use crate::models::Notification;

pub use events::{NotificationEvent, NotificationTemplate, RenderedNotification};

/// Errors from rendering or storing a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The template does not address this kind of account.
    #[error("{kind} notifications cannot be sent to {recipient}")]
    RecipientNotAllowed {
        kind: &'static str,
        recipient: AccountKind,
    },

    #[error(transparent)]
    Database(#[from] RepositoryError),
}

impl From<sqlx::Error> for NotificationError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

/// Who a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recipient {
    pub kind: AccountKind,
    pub id: i32,
}

impl From<UserId> for Recipient {
    fn from(id: UserId) -> Self {
        Self {
            kind: AccountKind::Customer,
            id: id.as_i32(),
        }
    }
}

impl From<DriverId> for Recipient {
    fn from(id: DriverId) -> Self {
        Self {
            kind: AccountKind::Driver,
            id: id.as_i32(),
        }
    }
}

impl From<MovingPartnerId> for Recipient {
    fn from(id: MovingPartnerId) -> Self {
        Self {
            kind: AccountKind::MovingPartner,
            id: id.as_i32(),
        }
    }
}

impl From<AdminId> for Recipient {
    fn from(id: AdminId) -> Self {
        Self {
            kind: AccountKind::Admin,
            id: id.as_i32(),
        }
    }
}

/// Renders events and persists them as notifications.
pub struct Notifier<'a> {
    pool: &'a PgPool,
}

impl<'a> Notifier<'a> {
    /// Create a new notifier.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store `event` for `recipient`.
    ///
    /// Groupable events update the recipient's open notification for the
    /// same group (count incremented, text re-rendered) when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::RecipientNotAllowed`] before touching the
    /// database when the event does not address `recipient.kind`.
    #[instrument(skip(self, event), fields(kind = event.template().kind, recipient = %recipient.kind, recipient_id = recipient.id))]
    pub async fn send(
        &self,
        event: &NotificationEvent,
        recipient: Recipient,
    ) -> Result<Notification, NotificationError> {
        let template = event.template();
        // Validate the recipient up front so nothing is written for a bad one.
        event.render(recipient.kind, 1)?;

        let mut tx = self.pool.begin().await?;

        let group_key = if template.groupable { event.group_key() } else { None };

        let existing = match &group_key {
            Some(key) => store::find_open_group(&mut *tx, recipient, key).await?,
            None => None,
        };

        let notification = if let Some(existing) = existing {
            let count = existing.group_count.saturating_add(1);
            let rendered = event.render(recipient.kind, count)?;
            store::regroup(&mut *tx, existing.id, count, &rendered, event.appointment_id()).await?
        } else {
            let rendered = event.render(recipient.kind, 1)?;
            store::insert(
                &mut *tx,
                &store::NewNotification {
                    recipient,
                    kind: template.kind,
                    rendered: &rendered,
                    group_key: group_key.as_deref(),
                    appointment_id: event.appointment_id(),
                },
            )
            .await?
        };

        tx.commit().await?;

        tracing::debug!(
            notification_id = %notification.id,
            group_count = notification.group_count,
            "Notification stored"
        );
        Ok(notification)
    }

    /// Store `event` for `recipient`, logging instead of failing.
    ///
    /// Used after the triggering write has committed: a notification that
    /// could not be stored does not undo the action.
    pub async fn send_best_effort(&self, event: &NotificationEvent, recipient: Recipient) {
        if let Err(e) = self.send(event, recipient).await {
            tracing::warn!(
                error = %e,
                kind = event.template().kind,
                recipient = %recipient.kind,
                recipient_id = recipient.id,
                "Failed to store notification"
            );
        }
    }
}
