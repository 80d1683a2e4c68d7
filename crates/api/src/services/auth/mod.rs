//! Passwordless authentication.
//!
//! A six-digit code is sent to the account's phone (SMS) or email. Codes
//! are filed under [`code_key`], so a code requested for one account type
//! never signs in another type sharing the contact. Only a SHA-256 hash of
//! `key:code` is stored. Codes expire after
//! [`CODE_TTL_MINUTES`] and are burned after [`MAX_ATTEMPTS`] wrong guesses.

mod error;

pub use error::AuthError;

use chrono::{TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use stowline_core::{AccountKind, Contact};

use crate::db::{
    AdminRepository, DriverRepository, MovingPartnerRepository, UserRepository,
    VerificationCodeRepository,
};
use crate::messages::{Channel, Vars};
use crate::models::CurrentAccount;
use crate::services::messaging::Messenger;

/// Minutes a code stays valid.
pub const CODE_TTL_MINUTES: i64 = 10;

/// Wrong guesses allowed before a code is burned.
pub const MAX_ATTEMPTS: i32 = 5;

/// `POST /api/auth/send-code` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeInput {
    /// Phone number or email address.
    pub contact: String,
    pub account_type: AccountKind,
}

/// `POST /api/auth/verify-code` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeInput {
    pub contact: String,
    pub account_type: AccountKind,
    pub code: String,
}

/// Where a code was sent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSent {
    pub channel: Channel,
    pub expires_in_minutes: i64,
}

/// An account matched by contact.
#[derive(Debug, Clone)]
struct AccountMatch {
    account: CurrentAccount,
    /// Name used in the email greeting.
    greeting: String,
}

/// Generate a random six-digit code.
#[must_use]
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

/// Key codes are stored under: account type plus canonical contact.
#[must_use]
pub fn code_key(kind: AccountKind, contact: &Contact) -> String {
    format!("{kind}:{}", contact.key())
}

/// Hash of a code bound to the key it was filed under.
#[must_use]
pub fn hash_code(key: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b":");
    hasher.update(code.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Parse login input, applying the email-only rule for admins.
///
/// # Errors
///
/// Returns `AuthError::InvalidContact` if the input doesn't parse, or
/// `AuthError::AdminRequiresEmail` for an admin phone login.
pub fn parse_contact(input: &str, kind: AccountKind) -> Result<Contact, AuthError> {
    let contact = Contact::parse(input)?;
    if kind == AccountKind::Admin && matches!(contact, Contact::Phone(_)) {
        return Err(AuthError::AdminRequiresEmail);
    }
    Ok(contact)
}

/// Passwordless login service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    messenger: &'a Messenger,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, messenger: &'a Messenger) -> Self {
        Self { pool, messenger }
    }

    /// Send a fresh login code to an existing account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if no account of `account_type`
    /// has the contact, or `AuthError::Delivery` if sending fails.
    #[tracing::instrument(skip(self, input), fields(account_type = %input.account_type))]
    pub async fn send_code(&self, input: &SendCodeInput) -> Result<CodeSent, AuthError> {
        let contact = parse_contact(&input.contact, input.account_type)?;
        let matched = self
            .find_account(input.account_type, &contact)
            .await?
            .ok_or(AuthError::AccountNotFound(input.account_type))?;

        let code = generate_code();
        let key = code_key(input.account_type, &contact);
        let expires_at = Utc::now() + TimeDelta::minutes(CODE_TTL_MINUTES);
        VerificationCodeRepository::new(self.pool)
            .create(&key, &hash_code(&key, &code), expires_at)
            .await?;

        let mut vars: Vars<'_> = Vars::new();
        vars.insert("code", code);
        vars.insert("expires_minutes", CODE_TTL_MINUTES.to_string());

        let channel = match &contact {
            Contact::Phone(phone) => {
                self.messenger
                    .send_sms(phone, "auth.verification_code", &vars)
                    .await?;
                Channel::Sms
            }
            Contact::Email(email) => {
                vars.insert("name", matched.greeting);
                self.messenger
                    .send_email(email, "auth.verification_code_email", &vars)
                    .await?;
                Channel::Email
            }
        };

        tracing::info!(account_id = matched.account.id, ?channel, "Login code sent");
        Ok(CodeSent {
            channel,
            expires_in_minutes: CODE_TTL_MINUTES,
        })
    }

    /// Check a login code and return the signed-in account.
    ///
    /// Consumes the code on success and marks the phone verified when the
    /// code went to a phone.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CodeExpired`, `AuthError::InvalidCode` or
    /// `AuthError::TooManyAttempts` when the code is not accepted.
    #[tracing::instrument(skip(self, input), fields(account_type = %input.account_type))]
    pub async fn verify_code(&self, input: &VerifyCodeInput) -> Result<CurrentAccount, AuthError> {
        let contact = parse_contact(&input.contact, input.account_type)?;
        let codes = VerificationCodeRepository::new(self.pool);
        let key = code_key(input.account_type, &contact);

        let stored = codes
            .latest_active(&key)
            .await?
            .ok_or(AuthError::CodeExpired)?;

        if stored.attempts >= MAX_ATTEMPTS {
            return Err(AuthError::TooManyAttempts);
        }

        if !constant_time_compare(&stored.code_hash, &hash_code(&key, &input.code)) {
            let attempts = codes.record_failed_attempt(stored.id).await?;
            tracing::warn!(attempts, "Invalid login code");
            if attempts >= MAX_ATTEMPTS {
                codes.consume(stored.id).await?;
                return Err(AuthError::TooManyAttempts);
            }
            return Err(AuthError::InvalidCode);
        }

        // A concurrent verify may have used it first.
        if !codes.consume(stored.id).await? {
            return Err(AuthError::CodeExpired);
        }

        let matched = self
            .find_account(input.account_type, &contact)
            .await?
            .ok_or(AuthError::AccountNotFound(input.account_type))?;

        if matches!(contact, Contact::Phone(_)) {
            self.mark_phone_verified(&matched.account).await?;
        }

        tracing::info!(account_id = matched.account.id, kind = %matched.account.kind, "Signed in");
        Ok(matched.account)
    }

    async fn find_account(
        &self,
        kind: AccountKind,
        contact: &Contact,
    ) -> Result<Option<AccountMatch>, AuthError> {
        let matched = match kind {
            AccountKind::Customer => {
                let users = UserRepository::new(self.pool);
                let user = match contact {
                    Contact::Phone(phone) => users.find_by_phone(phone).await?,
                    Contact::Email(email) => users.find_by_email(email).await?,
                };
                user.map(|u| AccountMatch {
                    account: CurrentAccount {
                        id: u.id.as_i32(),
                        kind,
                        name: u.full_name(),
                        role: None,
                    },
                    greeting: u.first_name,
                })
            }
            AccountKind::Driver => {
                let drivers = DriverRepository::new(self.pool);
                let driver = match contact {
                    Contact::Phone(phone) => drivers.find_by_phone(phone).await?,
                    Contact::Email(email) => drivers.find_by_email(email).await?,
                };
                driver.map(|d| AccountMatch {
                    account: CurrentAccount {
                        id: d.id.as_i32(),
                        kind,
                        name: d.full_name(),
                        role: None,
                    },
                    greeting: d.first_name,
                })
            }
            AccountKind::MovingPartner => {
                let partners = MovingPartnerRepository::new(self.pool);
                let partner = match contact {
                    Contact::Phone(phone) => partners.find_by_phone(phone).await?,
                    Contact::Email(email) => partners.find_by_email(email).await?,
                };
                partner.map(|p| AccountMatch {
                    account: CurrentAccount {
                        id: p.id.as_i32(),
                        kind,
                        name: p.name.clone(),
                        role: None,
                    },
                    greeting: p.name,
                })
            }
            AccountKind::Admin => {
                let Contact::Email(email) = contact else {
                    return Err(AuthError::AdminRequiresEmail);
                };
                AdminRepository::new(self.pool)
                    .find_by_email(email)
                    .await?
                    .map(|a| AccountMatch {
                        account: CurrentAccount {
                            id: a.id.as_i32(),
                            kind,
                            name: a.name.clone(),
                            role: Some(a.role),
                        },
                        greeting: a.name,
                    })
            }
        };
        Ok(matched)
    }

    async fn mark_phone_verified(&self, account: &CurrentAccount) -> Result<(), AuthError> {
        if let Some(id) = account.user_id() {
            UserRepository::new(self.pool).mark_phone_verified(id).await?;
        } else if let Some(id) = account.driver_id() {
            DriverRepository::new(self.pool).mark_phone_verified(id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_hash_binds_code_to_contact() {
        let a = hash_code("4155550100", "123456");
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_code("4155550100", " 123456 "));
        assert_ne!(a, hash_code("4155550101", "123456"));
        assert_ne!(a, hash_code("4155550100", "123457"));
    }

    #[test]
    fn test_code_key_separates_account_types() {
        let phone = Contact::parse("(415) 555-0100").unwrap();
        let driver = code_key(AccountKind::Driver, &phone);
        let customer = code_key(AccountKind::Customer, &phone);
        assert_eq!(driver, "driver:4155550100");
        assert_eq!(customer, "customer:4155550100");

        // A code sent for a driver login doesn't verify as a customer.
        assert_ne!(hash_code(&driver, "123456"), hash_code(&customer, "123456"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_admins_must_use_email() {
        assert!(matches!(
            parse_contact("(415) 555-0100", AccountKind::Admin),
            Err(AuthError::AdminRequiresEmail)
        ));
        assert!(matches!(
            parse_contact("ops@stowline.dev", AccountKind::Admin),
            Ok(Contact::Email(_))
        ));
        assert!(matches!(
            parse_contact("(415) 555-0100", AccountKind::Customer),
            Ok(Contact::Phone(_))
        ));
    }

    #[test]
    fn test_malformed_contact_rejected() {
        assert!(matches!(
            parse_contact("555-0100", AccountKind::Driver),
            Err(AuthError::InvalidContact(_))
        ));
    }
}
