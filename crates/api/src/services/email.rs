//! Email delivery over SMTP.
//!
//! Message templates render the subject and body; the body is then wrapped
//! in the shared Askama layout (HTML and plain text parts).

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use stowline_core::Email;

use crate::config::EmailConfig;
use crate::messages::{MessageTemplate, TemplateError, Vars};

/// HTML layout around a rendered message.
#[derive(Template)]
#[template(path = "email/layout.html")]
struct LayoutHtml<'a> {
    subject: &'a str,
    /// Already-escaped paragraphs.
    paragraphs: Vec<&'a str>,
}

/// Plain text layout around a rendered message.
#[derive(Template)]
#[template(path = "email/layout.txt")]
struct LayoutText<'a> {
    body: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Layout rendering error.
    #[error("Layout error: {0}")]
    Layout(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Render an email template and send it.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing, the layout fails to
    /// render, or delivery fails.
    #[instrument(skip(self, template, vars), fields(template = template.key, to = %to))]
    pub async fn send_template(
        &self,
        to: &Email,
        template: &MessageTemplate,
        vars: &Vars<'_>,
    ) -> Result<(), EmailError> {
        let (subject, text, html) = render_email(template, vars)?;
        self.send_multipart_email(to.as_str(), &subject, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Render `(subject, text, html)` for an email template.
///
/// # Errors
///
/// Returns error if a required variable is missing or the layout fails.
pub fn render_email(
    template: &MessageTemplate,
    vars: &Vars<'_>,
) -> Result<(String, String, String), EmailError> {
    let plain = template.render(vars)?;
    let subject = plain.subject.unwrap_or_default();
    let escaped = template.render_html(vars)?;

    let html = LayoutHtml {
        subject: &subject,
        paragraphs: escaped.split("\n\n").collect(),
    }
    .render()?;
    let text = LayoutText { body: &plain.body }.render()?;

    Ok((subject, text, html))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::messages;

    #[test]
    fn test_render_email_escapes_and_wraps() {
        let template = messages::find("auth.verification_code_email").unwrap();
        let vars: Vars<'_> = [
            ("name", "<Sam>".to_string()),
            ("code", "123456".to_string()),
            ("expires_minutes", "10".to_string()),
        ]
        .into_iter()
        .collect();

        let (subject, text, html) = render_email(template, &vars).unwrap();
        assert_eq!(subject, "Your Stowline sign-in code");
        assert!(text.contains("Hi <Sam>,"));
        assert!(html.contains("Hi &lt;Sam&gt;,"));
        assert!(!html.contains("<Sam>"));
        assert!(html.contains("123456"));
    }

    #[test]
    fn test_render_email_requires_variables() {
        let template = messages::find("auth.verification_code_email").unwrap();
        assert!(matches!(
            render_email(template, &Vars::new()),
            Err(EmailError::Template(TemplateError::MissingVariables(_)))
        ));
    }
}
