//! Core library for the smartcart kiosk client.
//!
//! The smart-cart backend owns all state; this crate is the client side of
//! that contract: an authenticated HTTP gateway with transparent access-token
//! refresh, typed wrappers for the cart/product/recommendation endpoints,
//! persistent session and credential storage, and the serde models the
//! responses deserialize into.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
