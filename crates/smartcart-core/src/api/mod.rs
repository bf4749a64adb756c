//! REST API client module for the smart-cart backend.
//!
//! The backend authenticates with short-lived JWT bearer tokens plus an
//! HTTP-only refresh cookie. The `Gateway` owns the transport concerns
//! (bearer injection, single refresh-and-replay on expiry); `ApiClient`
//! layers the typed endpoint calls on top of it.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::ApiClient;
pub use error::ApiError;
pub use gateway::Gateway;
