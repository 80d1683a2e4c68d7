//! Registered message templates.

use super::{Channel, Domain, MessageTemplate};

/// Every template, grouped by domain.
pub static TEMPLATES: &[MessageTemplate] = &[
    // Auth
    MessageTemplate {
        key: "auth.verification_code",
        channel: Channel::Sms,
        domain: Domain::Auth,
        subject: None,
        body: "Your Stowline verification code is ${code}. It expires in ${expires_minutes} minutes.",
        required: &["code", "expires_minutes"],
        optional: &[],
    },
    MessageTemplate {
        key: "auth.verification_code_email",
        channel: Channel::Email,
        domain: Domain::Auth,
        subject: Some("Your Stowline sign-in code"),
        body: "Hi ${name},\n\nYour sign-in code is ${code}. It expires in ${expires_minutes} minutes.\n\nIf you didn't try to sign in, you can ignore this email.",
        required: &["name", "code", "expires_minutes"],
        optional: &[],
    },
    // Appointment
    MessageTemplate {
        key: "appointment.confirmation",
        channel: Channel::Sms,
        domain: Domain::Appointment,
        subject: None,
        body: "Hi ${first_name}, your ${appointment_type} is booked for ${date} at ${address}.${plan_note} Reply STOP to opt out.",
        required: &["first_name", "appointment_type", "date", "address"],
        optional: &["plan_note"],
    },
    MessageTemplate {
        key: "appointment.confirmation_email",
        channel: Channel::Email,
        domain: Domain::Appointment,
        subject: Some("Your ${appointment_type} is booked"),
        body: "Hi ${first_name},\n\nYour ${appointment_type} is booked for ${date} at ${address}. We'll text you when your crew is on the way.\n\n${description}",
        required: &["first_name", "appointment_type", "date", "address"],
        optional: &["description"],
    },
    MessageTemplate {
        key: "appointment.status_update",
        channel: Channel::Sms,
        domain: Domain::Appointment,
        subject: None,
        body: "Your ${appointment_type} on ${date} is now ${status}.",
        required: &["appointment_type", "date", "status"],
        optional: &[],
    },
    MessageTemplate {
        key: "appointment.crew_on_the_way",
        channel: Channel::Sms,
        domain: Domain::Appointment,
        subject: None,
        body: "Your crew from ${partner_name} is on the way to ${address}.${eta_note}",
        required: &["partner_name", "address"],
        optional: &["eta_note"],
    },
    // Storage
    MessageTemplate {
        key: "storage.unit_ready",
        channel: Channel::Sms,
        domain: Domain::Storage,
        subject: None,
        body: "Storage unit ${unit_number} is loaded and stored. Book an access appointment any time at ${base_url}.",
        required: &["unit_number", "base_url"],
        optional: &[],
    },
    MessageTemplate {
        key: "storage.term_ended_email",
        channel: Channel::Email,
        domain: Domain::Storage,
        subject: Some("Your storage term has ended"),
        body: "Hi ${first_name},\n\nYour items from unit ${unit_number} have been returned and your storage term is complete. Thanks for storing with us.",
        required: &["first_name", "unit_number"],
        optional: &[],
    },
    // Onboarding
    MessageTemplate {
        key: "onboarding.partner_approved_email",
        channel: Channel::Email,
        domain: Domain::Onboarding,
        subject: Some("${partner_name} is approved on Stowline"),
        body: "Hi ${partner_name},\n\nYour company has been approved. Once a dispatch team is set up and at least one of your drivers is approved, you'll start receiving jobs.",
        required: &["partner_name"],
        optional: &[],
    },
    MessageTemplate {
        key: "onboarding.partner_activated_email",
        channel: Channel::Email,
        domain: Domain::Onboarding,
        subject: Some("${partner_name} is now active"),
        body: "Hi ${partner_name},\n\nYour account is active and jobs will now be assigned to your team.",
        required: &["partner_name"],
        optional: &[],
    },
    MessageTemplate {
        key: "onboarding.driver_approved",
        channel: Channel::Sms,
        domain: Domain::Onboarding,
        subject: None,
        body: "Hi ${first_name}, you're approved to drive with Stowline. Watch for job offers from your moving partner.",
        required: &["first_name"],
        optional: &[],
    },
];

/// Template registered under `key`.
#[must_use]
pub fn find(key: &str) -> Option<&'static MessageTemplate> {
    TEMPLATES.iter().find(|t| t.key == key)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<_> = TEMPLATES.iter().map(|t| t.key).collect();
        assert_eq!(keys.len(), TEMPLATES.len());
    }

    #[test]
    fn test_every_placeholder_is_declared() {
        for template in TEMPLATES {
            for name in template.placeholders() {
                assert!(
                    template.required.contains(&name) || template.optional.contains(&name),
                    "{} uses undeclared ${{{name}}}",
                    template.key
                );
            }
        }
    }

    #[test]
    fn test_email_templates_have_subjects() {
        for template in TEMPLATES {
            assert_eq!(
                template.subject.is_some(),
                template.channel == Channel::Email,
                "{}",
                template.key
            );
        }
    }

    #[test]
    fn test_every_domain_has_templates() {
        for domain in [Domain::Auth, Domain::Appointment, Domain::Storage, Domain::Onboarding] {
            assert!(TEMPLATES.iter().any(|t| t.domain == domain), "{domain:?}");
        }
    }
}
