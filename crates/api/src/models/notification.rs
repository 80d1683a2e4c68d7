//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{AccountKind, AppointmentId, NotificationId};

/// A stored in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_type: AccountKind,
    pub recipient_id: i32,
    /// Template kind, e.g. `JOB_ASSIGNED`.
    pub kind: String,
    pub title: String,
    pub message: String,
    /// Coalescing key for groupable kinds.
    pub group_key: Option<String>,
    /// Events folded into this notification.
    pub group_count: i32,
    pub appointment_id: Option<AppointmentId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notification list query.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

impl NotificationQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    /// Requested page size clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(NotificationQuery::default().limit(), 50);
        let q = NotificationQuery {
            unread_only: false,
            limit: Some(10_000),
        };
        assert_eq!(q.limit(), 200);
        let q = NotificationQuery {
            unread_only: true,
            limit: Some(0),
        };
        assert_eq!(q.limit(), 1);
    }
}
