//! Core types for the wholesale storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod language;
pub mod price;
pub mod role;

pub use email::{Email, InvalidEmail};
pub use id::*;
pub use language::{LanguageCode, LanguageCodeError};
pub use price::{CurrencyCode, Price};
pub use role::UserRole;
