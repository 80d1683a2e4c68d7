//! Template-driven SMS and email delivery.
//!
//! [`Messenger`] looks a message template up by key, renders it and hands
//! it to whichever channel client is configured.

use thiserror::Error;

use stowline_core::{Email, PhoneNumber};

use super::email::{EmailError, EmailService};
use super::sms::{SmsClient, SmsError};
use crate::messages::{self, Channel, TemplateError, Vars};

/// Errors from sending a templated message.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The channel has no credentials configured.
    #[error("{0:?} delivery is not configured")]
    NotConfigured(Channel),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Sms(#[from] SmsError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// Sends catalog templates over SMS or email.
#[derive(Clone, Debug, Default)]
pub struct Messenger {
    sms: Option<SmsClient>,
    email: Option<EmailService>,
}

impl Messenger {
    /// Create a messenger from whichever clients are configured.
    #[must_use]
    pub const fn new(sms: Option<SmsClient>, email: Option<EmailService>) -> Self {
        Self { sms, email }
    }

    /// Whether SMS delivery is available.
    #[must_use]
    pub const fn sms_enabled(&self) -> bool {
        self.sms.is_some()
    }

    /// Whether email delivery is available.
    #[must_use]
    pub const fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    /// Render SMS template `key` and text it to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if SMS is not configured, the template is unknown or
    /// missing variables, or Twilio rejects the message.
    pub async fn send_sms(
        &self,
        to: &PhoneNumber,
        key: &str,
        vars: &Vars<'_>,
    ) -> Result<(), MessagingError> {
        let client = self
            .sms
            .as_ref()
            .ok_or(MessagingError::NotConfigured(Channel::Sms))?;
        let template = messages::lookup(key, Channel::Sms)?;
        let rendered = template.render(vars)?;
        client.send(to, &rendered.body).await?;
        tracing::debug!(template = key, domain = ?template.domain, "SMS sent");
        Ok(())
    }

    /// Render email template `key` and send it to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if email is not configured, the template is unknown or
    /// missing variables, or delivery fails.
    pub async fn send_email(
        &self,
        to: &Email,
        key: &str,
        vars: &Vars<'_>,
    ) -> Result<(), MessagingError> {
        let service = self
            .email
            .as_ref()
            .ok_or(MessagingError::NotConfigured(Channel::Email))?;
        let template = messages::lookup(key, Channel::Email)?;
        service.send_template(to, template, vars).await?;
        tracing::debug!(template = key, domain = ?template.domain, "Email sent");
        Ok(())
    }

    /// Send an SMS after a committed write, logging failures.
    ///
    /// Does nothing when SMS is not configured.
    pub async fn send_sms_best_effort(&self, to: &PhoneNumber, key: &str, vars: &Vars<'_>) {
        if !self.sms_enabled() {
            return;
        }
        if let Err(e) = self.send_sms(to, key, vars).await {
            tracing::warn!(error = %e, template = key, "Failed to send SMS");
        }
    }

    /// Send an email after a committed write, logging failures.
    ///
    /// Does nothing when email is not configured.
    pub async fn send_email_best_effort(&self, to: &Email, key: &str, vars: &Vars<'_>) {
        if !self.email_enabled() {
            return;
        }
        if let Err(e) = self.send_email(to, key, vars).await {
            tracing::warn!(error = %e, template = key, "Failed to send email");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_channels_fail_fast() {
        let messenger = Messenger::default();
        let phone = PhoneNumber::parse("4155550100").unwrap();
        let err = messenger
            .send_sms(&phone, "auth.verification_code", &Vars::new())
            .await;
        assert!(matches!(err, Err(MessagingError::NotConfigured(Channel::Sms))));
    }
}
