//! Core types for the Reform shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailAddressError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
