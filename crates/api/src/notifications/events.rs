use chrono::{DateTime, Utc};

use stowline_core::{AccountKind, AppointmentId, AppointmentStatus, AppointmentType};

use super::NotificationError;

/// Static description of a notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTemplate {
    /// Stored in `notifications.kind`.
    pub kind: &'static str,
    /// Account kinds this notification may be sent to.
    pub recipients: &'static [AccountKind],
    /// Whether repeated events coalesce into one unread notification.
    pub groupable: bool,
}

impl NotificationTemplate {
    /// Reject recipients outside this template's audience.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::RecipientNotAllowed`].
    pub fn check_recipient(&self, recipient: AccountKind) -> Result<(), NotificationError> {
        if self.recipients.contains(&recipient) {
            Ok(())
        } else {
            Err(NotificationError::RecipientNotAllowed {
                kind: self.kind,
                recipient,
            })
        }
    }
}

const APPOINTMENT_SCHEDULED: NotificationTemplate = NotificationTemplate {
    kind: "APPOINTMENT_SCHEDULED",
    recipients: &[AccountKind::Customer],
    groupable: false,
};

const APPOINTMENT_CONFIRMED: NotificationTemplate = NotificationTemplate {
    kind: "APPOINTMENT_CONFIRMED",
    recipients: &[AccountKind::Customer],
    groupable: false,
};

const APPOINTMENT_CANCELED: NotificationTemplate = NotificationTemplate {
    kind: "APPOINTMENT_CANCELED",
    recipients: &[AccountKind::Customer, AccountKind::MovingPartner],
    groupable: false,
};

const APPOINTMENT_COMPLETED: NotificationTemplate = NotificationTemplate {
    kind: "APPOINTMENT_COMPLETED",
    recipients: &[AccountKind::Customer],
    groupable: false,
};

const APPOINTMENT_UPDATED: NotificationTemplate = NotificationTemplate {
    kind: "APPOINTMENT_UPDATED",
    recipients: &[AccountKind::Customer],
    groupable: false,
};

const JOB_ASSIGNED: NotificationTemplate = NotificationTemplate {
    kind: "JOB_ASSIGNED",
    recipients: &[AccountKind::MovingPartner],
    groupable: true,
};

const MOVING_PARTNER_APPROVED: NotificationTemplate = NotificationTemplate {
    kind: "MOVING_PARTNER_APPROVED",
    recipients: &[AccountKind::MovingPartner],
    groupable: false,
};

const MOVING_PARTNER_ACTIVATED: NotificationTemplate = NotificationTemplate {
    kind: "MOVING_PARTNER_ACTIVATED",
    recipients: &[AccountKind::MovingPartner],
    groupable: false,
};

const DRIVER_APPROVED: NotificationTemplate = NotificationTemplate {
    kind: "DRIVER_APPROVED",
    recipients: &[AccountKind::Driver],
    groupable: false,
};

const DRIVER_LINKED: NotificationTemplate = NotificationTemplate {
    kind: "DRIVER_LINKED",
    recipients: &[AccountKind::MovingPartner],
    groupable: true,
};

/// Something that happened that someone should hear about in-app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    AppointmentScheduled {
        appointment_id: AppointmentId,
        appointment_type: AppointmentType,
        date: DateTime<Utc>,
    },
    AppointmentStatusChanged {
        appointment_id: AppointmentId,
        appointment_type: AppointmentType,
        date: DateTime<Utc>,
        status: AppointmentStatus,
    },
    JobAssigned {
        appointment_id: AppointmentId,
        appointment_type: AppointmentType,
        date: DateTime<Utc>,
        address: String,
    },
    MovingPartnerApproved {
        partner_name: String,
    },
    MovingPartnerActivated {
        partner_name: String,
    },
    DriverApproved {
        first_name: String,
    },
    DriverLinked {
        driver_name: String,
    },
}

/// Title and body of a rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    pub title: String,
    pub message: String,
}

impl RenderedNotification {
    fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

fn day(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

impl NotificationEvent {
    /// The template describing this event's kind.
    #[must_use]
    pub fn template(&self) -> &'static NotificationTemplate {
        match self {
            Self::AppointmentScheduled { .. } => &APPOINTMENT_SCHEDULED,
            Self::AppointmentStatusChanged { status, .. } => match status {
                AppointmentStatus::Confirmed => &APPOINTMENT_CONFIRMED,
                AppointmentStatus::Canceled => &APPOINTMENT_CANCELED,
                AppointmentStatus::Completed => &APPOINTMENT_COMPLETED,
                _ => &APPOINTMENT_UPDATED,
            },
            Self::JobAssigned { .. } => &JOB_ASSIGNED,
            Self::MovingPartnerApproved { .. } => &MOVING_PARTNER_APPROVED,
            Self::MovingPartnerActivated { .. } => &MOVING_PARTNER_ACTIVATED,
            Self::DriverApproved { .. } => &DRIVER_APPROVED,
            Self::DriverLinked { .. } => &DRIVER_LINKED,
        }
    }

    /// Coalescing key for groupable kinds.
    #[must_use]
    pub fn group_key(&self) -> Option<String> {
        let template = self.template();
        template.groupable.then(|| template.kind.to_ascii_lowercase())
    }

    /// Appointment the notification links to, if any.
    #[must_use]
    pub const fn appointment_id(&self) -> Option<AppointmentId> {
        match self {
            Self::AppointmentScheduled { appointment_id, .. }
            | Self::AppointmentStatusChanged { appointment_id, .. }
            | Self::JobAssigned { appointment_id, .. } => Some(*appointment_id),
            _ => None,
        }
    }

    /// Render title and message for `recipient`, `group_count` events deep.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::RecipientNotAllowed`] when `recipient`
    /// is outside the template's audience.
    pub fn render(
        &self,
        recipient: AccountKind,
        group_count: i32,
    ) -> Result<RenderedNotification, NotificationError> {
        self.template().check_recipient(recipient)?;

        let rendered = match self {
            Self::AppointmentScheduled {
                appointment_type,
                date,
                ..
            } => RenderedNotification::new(
                "Appointment scheduled",
                format!("Your {appointment_type} is scheduled for {}.", day(*date)),
            ),
            Self::AppointmentStatusChanged {
                appointment_type,
                date,
                status,
                ..
            } => match (status, recipient) {
                (AppointmentStatus::Confirmed, _) => RenderedNotification::new(
                    "Appointment confirmed",
                    format!("Your {appointment_type} on {} is confirmed.", day(*date)),
                ),
                (AppointmentStatus::Canceled, AccountKind::MovingPartner) => {
                    RenderedNotification::new(
                        "Job canceled",
                        format!("The {appointment_type} on {} was canceled.", day(*date)),
                    )
                }
                (AppointmentStatus::Canceled, _) => RenderedNotification::new(
                    "Appointment canceled",
                    format!("Your {appointment_type} on {} was canceled.", day(*date)),
                ),
                (AppointmentStatus::Completed, _) => RenderedNotification::new(
                    "Appointment completed",
                    format!("Your {appointment_type} is complete. Thanks for choosing Stowline!"),
                ),
                (status, _) => RenderedNotification::new(
                    "Appointment updated",
                    format!("Your {appointment_type} on {} is now {status}.", day(*date)),
                ),
            },
            Self::JobAssigned {
                appointment_type,
                date,
                address,
                ..
            } => {
                if group_count > 1 {
                    RenderedNotification::new(
                        format!("{group_count} new jobs assigned"),
                        format!("You have {group_count} new jobs waiting for review."),
                    )
                } else {
                    RenderedNotification::new(
                        "New job assigned",
                        format!("{appointment_type} on {} at {address}.", day(*date)),
                    )
                }
            }
            Self::MovingPartnerApproved { partner_name } => RenderedNotification::new(
                "Your company is approved",
                format!(
                    "{partner_name} is approved. Jobs start once your dispatch team and drivers are set up."
                ),
            ),
            Self::MovingPartnerActivated { partner_name } => RenderedNotification::new(
                "You're active",
                format!("{partner_name} is active and can now receive jobs."),
            ),
            Self::DriverApproved { first_name } => RenderedNotification::new(
                "You're approved",
                format!("Welcome aboard, {first_name}. You can now be assigned jobs."),
            ),
            Self::DriverLinked { driver_name } => {
                if group_count > 1 {
                    RenderedNotification::new(
                        format!("{group_count} drivers joined your team"),
                        format!("{group_count} drivers were added to your team."),
                    )
                } else {
                    RenderedNotification::new(
                        "New driver on your team",
                        format!("{driver_name} was added to your team."),
                    )
                }
            }
        };
        Ok(rendered)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn job() -> NotificationEvent {
        NotificationEvent::JobAssigned {
            appointment_id: AppointmentId::new(12),
            appointment_type: AppointmentType::InitialPickup,
            date: Utc.with_ymd_and_hms(2026, 11, 3, 15, 0, 0).unwrap(),
            address: "500 Howard St".to_string(),
        }
    }

    #[test]
    fn test_single_job_mentions_details() {
        let rendered = job().render(AccountKind::MovingPartner, 1).unwrap();
        assert_eq!(rendered.title, "New job assigned");
        assert_eq!(rendered.message, "Initial Pickup on Nov 3, 2026 at 500 Howard St.");
    }

    #[test]
    fn test_grouped_jobs_mention_count() {
        let rendered = job().render(AccountKind::MovingPartner, 3).unwrap();
        assert_eq!(rendered.title, "3 new jobs assigned");
    }

    #[test]
    fn test_recipient_outside_scope_is_rejected() {
        let err = job().render(AccountKind::Customer, 1).unwrap_err();
        assert!(matches!(
            err,
            NotificationError::RecipientNotAllowed {
                kind: "JOB_ASSIGNED",
                recipient: AccountKind::Customer
            }
        ));
    }

    #[test]
    fn test_group_keys_only_for_groupable() {
        assert_eq!(job().group_key().as_deref(), Some("job_assigned"));
        let approved = NotificationEvent::DriverApproved {
            first_name: "Lee".to_string(),
        };
        assert_eq!(approved.group_key(), None);
        assert_eq!(approved.appointment_id(), None);
    }

    #[test]
    fn test_status_change_picks_kind_by_status() {
        let event = |status| NotificationEvent::AppointmentStatusChanged {
            appointment_id: AppointmentId::new(1),
            appointment_type: AppointmentType::StorageUnitAccess,
            date: Utc.with_ymd_and_hms(2026, 11, 3, 15, 0, 0).unwrap(),
            status,
        };
        assert_eq!(event(AppointmentStatus::Confirmed).template().kind, "APPOINTMENT_CONFIRMED");
        assert_eq!(event(AppointmentStatus::Canceled).template().kind, "APPOINTMENT_CANCELED");
        assert_eq!(event(AppointmentStatus::Pending).template().kind, "APPOINTMENT_UPDATED");

        let partner = event(AppointmentStatus::Canceled)
            .render(AccountKind::MovingPartner, 1)
            .unwrap();
        assert_eq!(partner.title, "Job canceled");
        assert!(event(AppointmentStatus::Confirmed)
            .render(AccountKind::MovingPartner, 1)
            .is_err());
    }
}
