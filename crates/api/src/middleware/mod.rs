//! HTTP middleware for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is enforced per handler by the extractors in [`auth`].

pub mod auth;
pub mod session;

pub use auth::{
    RequireAccount, RequireAdmin, RequireAdminWrite, RequireCustomer, RequireDriver,
    clear_current_account, set_current_account,
};
pub use session::create_session_layer;
