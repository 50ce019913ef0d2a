//! Mnemonic-based authentication and session lifecycle for Lumen clients.
//!
//! The user-held mnemonic phrase is the sole credential. From it the crate
//! deterministically derives an Ed25519 keypair and a symmetric payload
//! seed, proves key possession through a server-issued one-time challenge,
//! seals device and profile metadata before transmission, and owns the
//! resulting session's lifecycle: issue, restore, revoke.
//!
//! Security contract: the raw phrase, private key and seed never leave the
//! device; every exchange with the account service is authenticated; replay
//! is prevented by the one-time challenge; no handshake ever exposes a
//! half-populated session.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authkit_core::{
//!     backend::HttpAccountBackend,
//!     config::SessionConfig,
//!     session::{NullSink, SessionManager},
//!     types::DeviceInfo,
//!     Environment,
//! };
//!
//! # async fn run(phrase: &str) -> Result<(), authkit_core::AuthKitError> {
//! let backend = HttpAccountBackend::new(&Environment::Production);
//! let device = DeviceInfo::new("Pixel 9", "android", "1.4.0");
//! let manager = SessionManager::new(
//!     backend,
//!     device,
//!     Arc::new(NullSink),
//!     SessionConfig::default(),
//! );
//!
//! let user = manager.login(phrase).await?;
//! assert!(manager.is_authenticated());
//! println!("signed in as {}", user.profile.username);
//! # Ok(())
//! # }
//! ```

use strum::{Display, EnumString};

/// The account service environment a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// The staging account service.
    Staging,
    /// The production account service.
    Production,
}

pub mod backend;
pub mod config;
pub mod keys;
pub mod payload;
pub mod session;
pub mod signer;
pub mod types;

mod error;
pub use error::*;

// private modules
mod http_request;
