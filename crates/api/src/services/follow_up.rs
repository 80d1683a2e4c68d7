//! Side effects that run after a write has committed.
//!
//! In-app notifications, SMS and email are all best-effort here: failures
//! are logged at WARN and never turn a successful write into an error
//! response.

use stowline_core::{AdminId, AppointmentStatus, DriverId, MovingPartnerId, UserId};

use crate::db::{
    DriverRepository, MovingPartnerRepository, RepositoryError, StorageUnitRepository,
    UserRepository,
};
use crate::messages::Vars;
use crate::models::onboarding::ActivationOutcome;
use crate::models::{Appointment, Driver, MovingPartner, StorageUnitUsage, User};
use crate::notifications::{NotificationEvent, Notifier};
use crate::state::AppState;

fn day(appointment: &Appointment) -> String {
    appointment.date.format("%b %-d, %Y").to_string()
}

/// Look up a customer for messaging, logging lookup failures.
async fn customer(state: &AppState, user_id: UserId) -> Option<User> {
    match UserRepository::new(state.pool()).get_by_id(user_id).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user_id, "Failed to load customer for messaging");
            None
        }
    }
}

/// A customer booked an appointment.
pub async fn appointment_booked(state: &AppState, user: &User, appointment: &Appointment) {
    Notifier::new(state.pool())
        .send_best_effort(
            &NotificationEvent::AppointmentScheduled {
                appointment_id: appointment.id,
                appointment_type: appointment.appointment_type,
                date: appointment.date,
            },
            user.id.into(),
        )
        .await;

    let mut vars: Vars<'_> = Vars::new();
    vars.insert("first_name", user.first_name.clone());
    vars.insert("appointment_type", appointment.appointment_type.to_string());
    vars.insert("date", day(appointment));
    vars.insert("address", appointment.address.clone());

    if let Some(phone) = &user.phone_number {
        let mut sms_vars = vars.clone();
        if let Some(plan) = &appointment.plan_type {
            sms_vars.insert("plan_note", format!(" Plan: {plan}."));
        }
        state
            .messenger()
            .send_sms_best_effort(phone, "appointment.confirmation", &sms_vars)
            .await;
    }

    if let Some(description) = &appointment.description {
        vars.insert("description", format!("Notes: {description}"));
    }
    state
        .messenger()
        .send_email_best_effort(&user.email, "appointment.confirmation_email", &vars)
        .await;
}

/// An appointment changed status.
///
/// The customer gets an in-app notification for every change; the
/// assigned partner also hears about cancellations. Confirmations,
/// cancellations and completions are texted to the customer, and a job
/// going In Progress texts that the crew is on the way.
pub async fn appointment_status_changed(state: &AppState, appointment: &Appointment) {
    let status = appointment.status;
    let event = NotificationEvent::AppointmentStatusChanged {
        appointment_id: appointment.id,
        appointment_type: appointment.appointment_type,
        date: appointment.date,
        status,
    };
    let notifier = Notifier::new(state.pool());

    notifier
        .send_best_effort(&event, appointment.user_id.into())
        .await;
    if status == AppointmentStatus::Canceled {
        if let Some(partner_id) = appointment.moving_partner_id {
            notifier.send_best_effort(&event, partner_id.into()).await;
        }
    }

    let Some(user) = customer(state, appointment.user_id).await else {
        return;
    };
    let Some(phone) = &user.phone_number else {
        return;
    };

    match status {
        AppointmentStatus::Confirmed
        | AppointmentStatus::Canceled
        | AppointmentStatus::Completed => {
            let mut vars: Vars<'_> = Vars::new();
            vars.insert("appointment_type", appointment.appointment_type.to_string());
            vars.insert("date", day(appointment));
            vars.insert("status", status.to_string());
            state
                .messenger()
                .send_sms_best_effort(phone, "appointment.status_update", &vars)
                .await;
        }
        AppointmentStatus::InProgress => {
            let partner_name = match appointment.moving_partner_id {
                Some(id) => MovingPartnerRepository::new(state.pool())
                    .get_by_id(id)
                    .await
                    .ok()
                    .flatten()
                    .map(|p| p.name),
                None => None,
            };
            let mut vars: Vars<'_> = Vars::new();
            vars.insert(
                "partner_name",
                partner_name.unwrap_or_else(|| "Stowline".to_string()),
            );
            vars.insert("address", appointment.address.clone());
            state
                .messenger()
                .send_sms_best_effort(phone, "appointment.crew_on_the_way", &vars)
                .await;
        }
        _ => {}
    }
}

/// A moving partner was assigned a job.
pub async fn job_assigned(state: &AppState, appointment: &Appointment, partner_id: MovingPartnerId) {
    Notifier::new(state.pool())
        .send_best_effort(
            &NotificationEvent::JobAssigned {
                appointment_id: appointment.id,
                appointment_type: appointment.appointment_type,
                date: appointment.date,
                address: appointment.address.clone(),
            },
            partner_id.into(),
        )
        .await;
}

/// A customer's items went into a unit.
pub async fn usage_started(state: &AppState, usage: &StorageUnitUsage) {
    let Some(user) = customer(state, usage.user_id).await else {
        return;
    };
    let Some(unit_number) = unit_number(state, usage).await else {
        return;
    };
    let Some(phone) = &user.phone_number else {
        return;
    };
    let mut vars: Vars<'_> = Vars::new();
    vars.insert("unit_number", unit_number);
    vars.insert("base_url", state.config().base_url.clone());
    state
        .messenger()
        .send_sms_best_effort(phone, "storage.unit_ready", &vars)
        .await;
}

/// A customer's storage term in a unit ended.
pub async fn usage_ended(state: &AppState, usage: &StorageUnitUsage) {
    let Some(user) = customer(state, usage.user_id).await else {
        return;
    };
    let Some(unit_number) = unit_number(state, usage).await else {
        return;
    };
    let mut vars: Vars<'_> = Vars::new();
    vars.insert("first_name", user.first_name.clone());
    vars.insert("unit_number", unit_number);
    state
        .messenger()
        .send_email_best_effort(&user.email, "storage.term_ended_email", &vars)
        .await;
}

async fn unit_number(state: &AppState, usage: &StorageUnitUsage) -> Option<String> {
    match StorageUnitRepository::new(state.pool())
        .get_by_id(usage.storage_unit_id)
        .await
    {
        Ok(unit) => unit.map(|u| u.unit_number),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load storage unit for messaging");
            None
        }
    }
}

/// A moving partner was approved.
pub async fn partner_approved(state: &AppState, partner: &MovingPartner) {
    Notifier::new(state.pool())
        .send_best_effort(
            &NotificationEvent::MovingPartnerApproved {
                partner_name: partner.name.clone(),
            },
            partner.id.into(),
        )
        .await;

    let mut vars: Vars<'_> = Vars::new();
    vars.insert("partner_name", partner.name.clone());
    state
        .messenger()
        .send_email_best_effort(&partner.email, "onboarding.partner_approved_email", &vars)
        .await;
}

/// A driver was approved.
pub async fn driver_approved(state: &AppState, driver: &Driver) {
    Notifier::new(state.pool())
        .send_best_effort(
            &NotificationEvent::DriverApproved {
                first_name: driver.first_name.clone(),
            },
            driver.id.into(),
        )
        .await;

    if let Some(phone) = &driver.phone_number {
        let mut vars: Vars<'_> = Vars::new();
        vars.insert("first_name", driver.first_name.clone());
        state
            .messenger()
            .send_sms_best_effort(phone, "onboarding.driver_approved", &vars)
            .await;
    }
}

/// A driver joined a moving partner.
pub async fn driver_linked(state: &AppState, partner_id: MovingPartnerId, driver: &Driver) {
    Notifier::new(state.pool())
        .send_best_effort(
            &NotificationEvent::DriverLinked {
                driver_name: driver.full_name(),
            },
            partner_id.into(),
        )
        .await;
}

/// Announce a partner that just became active.
pub async fn announce_activation(state: &AppState, outcome: &ActivationOutcome) {
    if !outcome.activated {
        return;
    }
    let partner = &outcome.moving_partner;
    Notifier::new(state.pool())
        .send_best_effort(
            &NotificationEvent::MovingPartnerActivated {
                partner_name: partner.name.clone(),
            },
            partner.id.into(),
        )
        .await;

    let mut vars: Vars<'_> = Vars::new();
    vars.insert("partner_name", partner.name.clone());
    state
        .messenger()
        .send_email_best_effort(&partner.email, "onboarding.partner_activated_email", &vars)
        .await;
}

/// Re-run activation for a partner after one of its inputs changed.
///
/// # Errors
///
/// Returns `RepositoryError` if the evaluation itself fails.
pub async fn reevaluate_partner(
    state: &AppState,
    partner_id: MovingPartnerId,
    admin_id: AdminId,
) -> Result<ActivationOutcome, RepositoryError> {
    let outcome = MovingPartnerRepository::new(state.pool())
        .evaluate_activation(
            partner_id,
            state.config().policy.min_approved_drivers,
            Some(admin_id),
        )
        .await?;
    announce_activation(state, &outcome).await;
    Ok(outcome)
}

/// Re-run activation for every partner the driver is actively linked to.
///
/// # Errors
///
/// Returns `RepositoryError` if a lookup or evaluation fails.
pub async fn reevaluate_driver_partners(
    state: &AppState,
    driver_id: DriverId,
    admin_id: AdminId,
) -> Result<Vec<ActivationOutcome>, RepositoryError> {
    let partner_ids = DriverRepository::new(state.pool())
        .active_partner_ids(driver_id)
        .await?;
    let mut outcomes = Vec::with_capacity(partner_ids.len());
    for partner_id in partner_ids {
        outcomes.push(reevaluate_partner(state, partner_id, admin_id).await?);
    }
    Ok(outcomes)
}
