//! Domain models for the API.
//!
//! Database-backed structs derive `sqlx::FromRow` directly (the core ID and
//! contact types decode from their columns). Everything serializes as
//! camelCase JSON.

pub mod account;
pub mod admin_log;
pub mod appointment;
pub mod notification;
pub mod onboarding;
pub mod review;
pub mod storage_unit;
pub mod validation;

pub use account::{Admin, CurrentAccount, User, session_keys};
pub use admin_log::{AdminAction, AdminLog, NewAdminLog};
pub use appointment::{Appointment, AppointmentDetail, AppointmentFilter, BookAppointmentInput};
pub use notification::Notification;
pub use onboarding::{ActivationCheck, Driver, MovingPartner, Vehicle};
pub use review::{Review, ReviewSourceKind, ReviewsResponse};
pub use storage_unit::{
    Availability, CleaningInput, StorageUnit, StorageUnitCleaning, StorageUnitUsage,
};
pub use validation::FieldErrors;
