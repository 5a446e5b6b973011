//! Wholesale Core - Shared types library.
//!
//! This crate provides common types used across the wholesale components:
//! - `storefront` - Catalog, cart, order confirmation and admin back-office
//! - `cli` - Command-line tools for user administration
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! Rows are owned by the backend-as-a-service; these types give them names.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, roles and languages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
