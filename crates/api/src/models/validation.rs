//! Per-field validation errors.

use std::collections::BTreeMap;

use crate::error::AppError;

/// Field name → message, collected while validating an input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    /// Start an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem with `field`. The first message per field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Record a problem when `failed` is true.
    pub fn check(&mut self, failed: bool, field: &'static str, message: &str) {
        if failed {
            self.add(field, message);
        }
    }

    /// Whether no problems were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// `Ok(())` when empty, otherwise a 400 carrying every field message.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] with `message` and the field map as details.
    pub fn into_result(self, message: &str) -> Result<(), AppError> {
        if self.is_empty() {
            return Ok(());
        }
        let details = self
            .0
            .into_iter()
            .map(|(field, msg)| (field.to_string(), serde_json::Value::String(msg)))
            .collect::<serde_json::Map<_, _>>();
        Err(AppError::Validation {
            message: message.to_string(),
            details: serde_json::Value::Object(details),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_ok() {
        assert!(FieldErrors::new().into_result("Invalid").is_ok());
    }

    #[test]
    fn test_first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.add("zipcode", "required");
        errors.add("zipcode", "must be 5 digits");
        assert_eq!(errors.get("zipcode"), Some("required"));
    }

    #[test]
    fn test_into_result_builds_details() {
        let mut errors = FieldErrors::new();
        errors.check(true, "address", "is required");
        errors.check(false, "date", "must be in the future");

        match errors.into_result("Invalid appointment") {
            Err(AppError::Validation { message, details }) => {
                assert_eq!(message, "Invalid appointment");
                assert_eq!(details["address"], "is required");
                assert!(details.get("date").is_none());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
