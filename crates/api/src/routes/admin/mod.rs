//! Admin handlers.
//!
//! Every handler re-verifies the session against the `admins` table. Reads
//! are open to every role; writes need a role that can write (viewers get
//! 403).
//!
//! ```text
//! GET    /api/admin/appointments                        - List with filters
//! GET    /api/admin/appointments/{id}                   - Detail with audit trail
//! PATCH  /api/admin/appointments/{id}/status            - Change status
//! PATCH  /api/admin/appointments/{id}/partner-contact   - Record partner contact
//! PATCH  /api/admin/appointments/{id}/moving-partner    - Assign moving partner
//! GET    /api/admin/storage-units                       - List units
//! POST   /api/admin/storage-units                       - Add a unit
//! POST   /api/admin/storage-units/{id}/cleaning         - Record a cleaning
//! POST   /api/admin/storage-units/{id}/usages           - Start a usage
//! PATCH  /api/admin/storage-unit-usages/{id}/end        - End a usage
//! GET    /api/admin/moving-partners                     - List partners
//! GET    /api/admin/moving-partners/{id}                - Partner with activation check
//! PATCH  /api/admin/moving-partners/{id}/approval       - Approve / unapprove
//! PATCH  /api/admin/moving-partners/{id}/dispatch-team  - Set / clear dispatch team
//! POST   /api/admin/moving-partners/{id}/activation     - Evaluate activation
//! POST   /api/admin/moving-partners/{id}/drivers        - Link a driver
//! DELETE /api/admin/moving-partners/{id}/drivers/{driver_id} - Unlink a driver
//! GET    /api/admin/drivers                             - List drivers
//! PATCH  /api/admin/drivers/{id}/approval               - Approve / unapprove
//! GET    /api/admin/vehicles                            - List vehicles
//! PATCH  /api/admin/vehicles/{id}/approval              - Approve / unapprove
//! ```

pub mod appointments;
pub mod onboarding;
pub mod storage_units;

use axum::Router;

use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(appointments::router())
        .merge(storage_units::router())
        .merge(onboarding::router())
}
