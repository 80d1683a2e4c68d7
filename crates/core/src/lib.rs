//! Stowline Core - Shared types library.
//!
//! This crate provides the domain types used across all Stowline components:
//! - `api` - JSON API server for customers, drivers, moving partners and admins
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure domain rules - no I/O, no
//! database access, no HTTP clients. Appointment status transitions and phone
//! number normalization live here so every component agrees on them.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, status enums, phone numbers and email addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
