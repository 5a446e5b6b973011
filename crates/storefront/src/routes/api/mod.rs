//! JSON API handlers.

pub mod order_confirmation;
