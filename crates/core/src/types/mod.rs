//! Core types for Stowline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod id;
pub mod status;

pub use contact::{Contact, ContactError, Email, PhoneNumber};
pub use id::*;
pub use status::*;
