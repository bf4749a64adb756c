//! Authentication module for managing the stored access token and login
//! credentials.
//!
//! This module provides:
//! - `TokenStore`: the injectable access-token storage the gateway reads
//! - `SessionStore`: file-backed token persistence with staleness tracking
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! The backend issues access tokens that expire after roughly 30 minutes;
//! recovery is reactive through the gateway's refresh path.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{MemoryTokenStore, SessionData, SessionStore, TokenStore};
