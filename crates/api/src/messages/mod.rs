//! SMS and email message templates.
//!
//! Templates are static text with `${name}` placeholders and a declared set
//! of required and optional variables. Rendering refuses to run unless every
//! required variable is supplied; optional variables default to the empty
//! string. Whatever is rendered contains no `${...}` placeholders.
//!
//! The templates themselves live in [`catalog`], grouped by domain.

pub mod catalog;

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

pub use catalog::find;

/// Delivery channel of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
}

/// Business area a template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Auth,
    Appointment,
    Storage,
    Onboarding,
}

/// Errors from rendering or looking up a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// One or more required variables were not supplied.
    #[error("missing required template variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    /// No template is registered under this key.
    #[error("unknown message template: {0}")]
    UnknownTemplate(String),

    /// Template used on the wrong channel.
    #[error("template {key} is not an {expected:?} template")]
    WrongChannel { key: &'static str, expected: Channel },
}

/// Variables supplied to a render, by placeholder name.
pub type Vars<'a> = HashMap<&'a str, String>;

/// A parametrized SMS or email message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTemplate {
    /// Unique lookup key, e.g. `appointment.confirmation`.
    pub key: &'static str,
    pub channel: Channel,
    pub domain: Domain,
    /// Email subject; `None` for SMS.
    pub subject: Option<&'static str>,
    pub body: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

/// Output of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: Option<String>,
    pub body: String,
}

impl MessageTemplate {
    /// Render subject and body as plain text.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariables`] naming every required
    /// variable absent from `vars`. Nothing is rendered in that case.
    pub fn render(&self, vars: &Vars<'_>) -> Result<RenderedMessage, TemplateError> {
        self.check_required(vars)?;
        Ok(RenderedMessage {
            subject: self.subject.map(|s| substitute(s, vars, false)),
            body: substitute(self.body, vars, false),
        })
    }

    /// Render the body for an HTML email part, escaping substituted values.
    ///
    /// # Errors
    ///
    /// Same as [`MessageTemplate::render`].
    pub fn render_html(&self, vars: &Vars<'_>) -> Result<String, TemplateError> {
        self.check_required(vars)?;
        Ok(substitute(self.body, vars, true))
    }

    /// Required variables not present in `vars`, in declaration order.
    #[must_use]
    pub fn missing(&self, vars: &Vars<'_>) -> Vec<String> {
        self.required
            .iter()
            .filter(|name| !vars.contains_key(*name))
            .map(|name| (*name).to_string())
            .collect()
    }

    fn check_required(&self, vars: &Vars<'_>) -> Result<(), TemplateError> {
        let missing = self.missing(vars);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TemplateError::MissingVariables(missing))
        }
    }

    /// Every placeholder name used in subject and body.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = self.subject.map(placeholder_names).unwrap_or_default();
        names.extend(placeholder_names(self.body));
        names
    }
}

fn placeholder_names(text: &'static str) -> Vec<&'static str> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else { break };
        names.push(&after[..end]);
        rest = &after[end + 1..];
    }
    names
}

/// Replace every `${name}` in `text`. Unknown names become "".
fn substitute(text: &str, vars: &Vars<'_>, escape: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated; keep the remainder verbatim, minus the marker.
            out.push_str(after);
            return out;
        };
        if let Some(value) = vars.get(&after[..end]) {
            if escape {
                out.push_str(&escape_html(value));
            } else {
                out.push_str(value);
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Look up `key` and check it is a `channel` template.
///
/// # Errors
///
/// Returns [`TemplateError::UnknownTemplate`] or [`TemplateError::WrongChannel`].
pub fn lookup(key: &str, channel: Channel) -> Result<&'static MessageTemplate, TemplateError> {
    let template = find(key).ok_or_else(|| TemplateError::UnknownTemplate(key.to_string()))?;
    if template.channel == channel {
        Ok(template)
    } else {
        Err(TemplateError::WrongChannel {
            key: template.key,
            expected: channel,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GREETING: MessageTemplate = MessageTemplate {
        key: "test.greeting",
        channel: Channel::Email,
        domain: Domain::Appointment,
        subject: Some("Hello ${name}"),
        body: "Hi ${name}, your unit is ${unit}.${note}",
        required: &["name", "unit"],
        optional: &["note"],
    };

    fn vars(pairs: &[(&'static str, &str)]) -> Vars<'static> {
        pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
    }

    #[test]
    fn test_render_substitutes_everything() {
        let out = GREETING
            .render(&vars(&[("name", "Ana"), ("unit", "A-12"), ("note", " Thanks!")]))
            .unwrap();
        assert_eq!(out.subject.as_deref(), Some("Hello Ana"));
        assert_eq!(out.body, "Hi Ana, your unit is A-12. Thanks!");
    }

    #[test]
    fn test_optional_defaults_to_empty() {
        let out = GREETING
            .render(&vars(&[("name", "Ana"), ("unit", "A-12")]))
            .unwrap();
        assert_eq!(out.body, "Hi Ana, your unit is A-12.");
        assert!(!out.body.contains("${"));
    }

    #[test]
    fn test_missing_required_lists_all() {
        let err = GREETING.render(&Vars::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingVariables(vec!["name".to_string(), "unit".to_string()])
        );
        assert_eq!(
            err.to_string(),
            "missing required template variables: name, unit"
        );
    }

    #[test]
    fn test_html_render_escapes_values_only() {
        let html = GREETING
            .render_html(&vars(&[("name", "<b>Ana</b>"), ("unit", "A&B")]))
            .unwrap();
        assert_eq!(html, "Hi &lt;b&gt;Ana&lt;/b&gt;, your unit is A&amp;B.");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(GREETING.placeholders(), vec!["name", "name", "unit", "note"]);
    }

    #[test]
    fn test_lookup_checks_channel() {
        assert!(lookup("auth.verification_code", Channel::Sms).is_ok());
        assert!(matches!(
            lookup("auth.verification_code", Channel::Email),
            Err(TemplateError::WrongChannel { .. })
        ));
        assert!(matches!(
            lookup("nope", Channel::Sms),
            Err(TemplateError::UnknownTemplate(_))
        ));
    }
}
