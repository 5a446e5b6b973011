//! Session-held models for the storefront.

pub mod session;

pub use session::{AuthenticatedUser, CartItem, CurrentUser, keys};
