//! Contact details: US phone numbers and email addresses.
//!
//! Phone numbers are stored as exactly ten digits. Anything the user typed
//! around the digits ("(415) 555-0100", "415.555.0100") is discarded; a
//! leading country code is *not* stripped, so "+1 415 555 0100" is rejected
//! as eleven digits.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a phone number or email.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// The phone number does not contain exactly ten digits.
    #[error("phone number must be 10 digits (got {digits})")]
    PhoneDigits {
        /// Number of digits found in the input.
        digits: usize,
    },
    /// The email is empty.
    #[error("email cannot be empty")]
    EmptyEmail,
    /// The email is longer than RFC 5321 allows.
    #[error("email must be at most {max} characters")]
    EmailTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The email is not of the form `local@domain`.
    #[error("email must look like name@domain")]
    MalformedEmail,
}

/// A ten-digit US phone number.
///
/// Every way of building one (parsing, deserializing, decoding a column)
/// goes through [`PhoneNumber::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Number of digits in a stored phone number.
    pub const DIGITS: usize = 10;

    /// Parse a phone number, keeping only its digits.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError::PhoneDigits`] unless exactly ten digits remain.
    ///
    /// ```
    /// use stowline_core::PhoneNumber;
    ///
    /// assert_eq!(PhoneNumber::parse("(415) 555-0100").unwrap().as_str(), "4155550100");
    /// assert!(PhoneNumber::parse("555-0100").is_err());
    /// assert!(PhoneNumber::parse("+1 415 555 0100").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, ContactError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != Self::DIGITS {
            return Err(ContactError::PhoneDigits {
                digits: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// The ten digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// E.164 form for SMS delivery (`+14155550100`).
    #[must_use]
    pub fn to_e164(&self) -> String {
        format!("+1{}", self.0)
    }

    /// Human form, e.g. `(415) 555-0100`.
    #[must_use]
    pub fn formatted(&self) -> String {
        let (area, rest) = self.0.split_at(3);
        let (exchange, line) = rest.split_at(3);
        format!("({area}) {exchange}-{line}")
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ContactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

/// An email address with a minimal `local@domain` shape check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an email, trimming surrounding whitespace and lowercasing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty, too long, or does not have a
    /// non-empty local part and domain around a single `@`.
    pub fn parse(input: &str) -> Result<Self, ContactError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ContactError::EmptyEmail);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(ContactError::EmailTooLong {
                max: Self::MAX_LENGTH,
            });
        }

        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(s.to_lowercase()))
            }
            _ => Err(ContactError::MalformedEmail),
        }
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = ContactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where a verification code is sent: a phone (SMS) or an email inbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Contact {
    Phone(PhoneNumber),
    Email(Email),
}

impl Contact {
    /// Interpret free-form login input: anything containing `@` is an email,
    /// everything else must be a phone number.
    ///
    /// # Errors
    ///
    /// Returns the parse error of whichever form the input was taken to be.
    pub fn parse(input: &str) -> Result<Self, ContactError> {
        if input.contains('@') {
            Email::parse(input).map(Self::Email)
        } else {
            PhoneNumber::parse(input).map(Self::Phone)
        }
    }

    /// Canonical string used as the lookup key for stored codes.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Phone(phone) => phone.as_str(),
            Self::Email(email) => email.as_str(),
        }
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::{Email, PhoneNumber};

    macro_rules! text_column {
        ($name:ident) => {
            impl sqlx::Type<sqlx::Postgres> for $name {
                fn type_info() -> sqlx::postgres::PgTypeInfo {
                    <String as sqlx::Type<sqlx::Postgres>>::type_info()
                }

                fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                    <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
                }
            }

            impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
                fn decode(
                    value: sqlx::postgres::PgValueRef<'r>,
                ) -> Result<Self, sqlx::error::BoxDynError> {
                    let raw = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                    Ok(Self::parse(&raw)?)
                }
            }

            impl sqlx::Encode<'_, sqlx::Postgres> for $name {
                fn encode_by_ref(
                    &self,
                    buf: &mut sqlx::postgres::PgArgumentBuffer,
                ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                    <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
                }
            }
        };
    }

    text_column!(Email);
    text_column!(PhoneNumber);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_strips_formatting() {
        for input in ["4155550100", "(415) 555-0100", "415.555.0100", " 415 555 0100 "] {
            assert_eq!(PhoneNumber::parse(input).unwrap().as_str(), "4155550100");
        }
    }

    #[test]
    fn test_phone_rejects_wrong_digit_count() {
        assert_eq!(
            PhoneNumber::parse("555-0100"),
            Err(ContactError::PhoneDigits { digits: 7 })
        );
        assert_eq!(
            PhoneNumber::parse("14155550100"),
            Err(ContactError::PhoneDigits { digits: 11 })
        );
        assert_eq!(
            PhoneNumber::parse("not a number"),
            Err(ContactError::PhoneDigits { digits: 0 })
        );
    }

    #[test]
    fn test_phone_formats() {
        let phone = PhoneNumber::parse("4155550100").unwrap();
        assert_eq!(phone.to_e164(), "+14155550100");
        assert_eq!(phone.to_string(), "(415) 555-0100");
    }

    #[test]
    fn test_phone_deserialize_validates() {
        let err = serde_json::from_str::<PhoneNumber>("\"12\"").unwrap_err();
        assert!(err.to_string().contains("10 digits"));

        let phone: PhoneNumber = serde_json::from_str("\"(415) 555-0100\"").unwrap();
        assert_eq!(phone.to_string(), "(415) 555-0100");
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"4155550100\"");
    }

    #[test]
    fn test_email_deserialize_validates() {
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
        let email: Email = serde_json::from_str("\"Sam@Example.com\"").unwrap();
        assert_eq!(email.as_str(), "sam@example.com");
    }

    #[test]
    fn test_email_normalizes_case_and_whitespace() {
        let email = Email::parse("  Jane.Doe@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "jane.doe@example.com");
    }

    #[test]
    fn test_email_rejects_malformed() {
        assert_eq!(Email::parse(""), Err(ContactError::EmptyEmail));
        assert_eq!(Email::parse("no-at"), Err(ContactError::MalformedEmail));
        assert_eq!(Email::parse("@domain.com"), Err(ContactError::MalformedEmail));
        assert_eq!(Email::parse("user@"), Err(ContactError::MalformedEmail));
        assert_eq!(Email::parse("a@b@c"), Err(ContactError::MalformedEmail));
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(ContactError::EmailTooLong { .. })
        ));
    }

    #[test]
    fn test_contact_picks_channel() {
        assert!(matches!(
            Contact::parse("jane@example.com").unwrap(),
            Contact::Email(_)
        ));
        let phone = Contact::parse("415-555-0100").unwrap();
        assert_eq!(phone.key(), "4155550100");
    }
}
