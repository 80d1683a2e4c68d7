//! Business logic and third-party services.
//!
//! # Services
//!
//! - `auth` - Passwordless login with one-time codes
//! - `email` - Email delivery via SMTP
//! - `follow_up` - Best-effort notifications and activation re-checks after writes
//! - `image_host` - Signed Cloudinary uploads
//! - `messaging` - Template-driven SMS and email
//! - `reviews` - Review aggregation with caching
//! - `sms` - Twilio SMS client

pub mod auth;
pub mod email;
pub mod follow_up;
pub mod image_host;
pub mod messaging;
pub mod reviews;
pub mod sms;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService};
pub use image_host::{ImageHost, ImageHostError, UploadFolder, UploadedImage};
pub use messaging::{Messenger, MessagingError};
pub use reviews::{GooglePlacesClient, ReviewSource, ReviewsError, ReviewsService};
pub use sms::{SmsClient, SmsError};
