//! Database operations for the Stowline `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users`, `admins`, `drivers`, `moving_partners` - Accounts
//! - `moving_partner_drivers`, `vehicles` - Partner onboarding
//! - `appointments` - Booked jobs and their lifecycle
//! - `storage_units`, `storage_unit_usages`, `storage_unit_cleanings` - Warehouse
//! - `admin_logs` - Append-only audit trail of admin actions
//! - `notifications` - In-app notification center
//! - `google_reviews` - Persisted reviews (first tier of the reviews endpoint)
//! - `verification_codes` - Passwordless login codes
//! - `tower_sessions.session` - Session store
//!
//! Queries are built at runtime with `sqlx::query_as::<_, T>` and bound
//! parameters; multi-statement writes run in a single transaction.
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p stowline-cli -- migrate
//! ```

pub mod admin_logs;
pub mod admins;
pub mod appointments;
pub mod drivers;
pub mod moving_partners;
pub mod notifications;
pub mod reviews;
pub mod storage_units;
pub mod users;
pub mod vehicles;
pub mod verification_codes;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admins::AdminRepository;
pub use appointments::AppointmentRepository;
pub use drivers::DriverRepository;
pub use moving_partners::MovingPartnerRepository;
pub use notifications::NotificationRepository;
pub use reviews::ReviewRepository;
pub use storage_units::StorageUnitRepository;
pub use users::UserRepository;
pub use vehicles::VehicleRepository;
pub use verification_codes::VerificationCodeRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., a phone number owned by another account).
    #[error("{0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to [`RepositoryError::Conflict`].
    pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(message.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
