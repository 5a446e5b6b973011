//! Business logic services for storefront.
//!
//! # Services
//!
//! - `pricing` - Server-side order pricing per customer group
//! - `localization` - Translated category and product names with fallback
//! - `email` - Transactional email API client
//! - `orders` - Order confirmation (pricing, rendering, delivery)

pub mod email;
pub mod localization;
pub mod orders;
pub mod pricing;
