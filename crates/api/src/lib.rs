//! Stowline API library.
//!
//! The JSON API behind the customer, driver, moving partner and admin
//! apps, exposed as a library so the router can be exercised in tests.
//!
//! # Third-party services
//!
//! - Twilio (SMS) and an SMTP relay (email) for login codes and job updates
//! - Google Places for the public reviews widget
//! - Cloudinary for cleaning and profile photos
//!
//! Each one is optional; features that need a missing service fail with a
//! server error rather than at startup.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod routes;
pub mod services;
pub mod state;
