//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                   - Liveness
//! GET    /health/ready                             - Readiness (database ping)
//!
//! # Auth (passwordless, one-time codes)
//! POST   /api/auth/send-code                       - Send a login code
//! POST   /api/auth/verify-code                     - Check a code, start a session
//! GET    /api/auth/session                         - Current account
//! POST   /api/auth/logout                          - End the session
//!
//! # Customers
//! GET    /api/users/me                             - Own profile
//! PATCH  /api/users/{id}/phone-number              - Change phone number
//! GET    /api/appointments                         - Own appointments
//! POST   /api/appointments                         - Book an appointment
//! GET    /api/appointments/{id}                    - Own appointment with units
//! PATCH  /api/appointments/{id}/cancel             - Cancel own appointment
//! GET    /api/storage-units/availability           - Unit availability
//! GET    /api/storage-units/mine                   - Units currently storing my items
//!
//! # Any signed-in account
//! GET    /api/notifications                        - Notification center
//! GET    /api/notifications/unread-count           - Badge count
//! PATCH  /api/notifications/{id}/read              - Mark one read
//! POST   /api/notifications/read-all               - Mark all read
//! POST   /api/uploads/{folder}                     - Image upload
//!
//! # Public
//! GET    /api/reviews                              - Reviews with fallback
//!
//! # Drivers
//! GET    /api/driver/appointments                  - Jobs of my moving partners
//! PATCH  /api/driver/appointments/{id}/status      - Start or finish a job
//!
//! # Admin
//! see [`admin`]
//! ```

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod driver;
pub mod health;
pub mod notifications;
pub mod reviews;
pub mod storage;
pub mod uploads;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the full application router (without middleware layers).
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(appointments::router())
        .merge(storage::router())
        .merge(notifications::router())
        .merge(reviews::router())
        .merge(uploads::router())
        .merge(driver::router())
        .merge(admin::router())
}
