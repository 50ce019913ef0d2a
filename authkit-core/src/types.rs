//! Domain types shared across the session lifecycle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::PayloadSeed;

/// Profile metadata supplied at registration and echoed (sealed) inside the
/// user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInfo {
    /// Account-unique handle chosen by the user.
    pub username: String,
    /// Optional human-readable name.
    pub display_name: Option<String>,
    /// BCP 47 locale tag, when the client knows it.
    pub locale: Option<String>,
}

/// Device metadata attached (sealed) to every login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable identifier for this installation.
    pub device_id: Uuid,
    /// User-facing device name.
    pub name: String,
    /// Operating system or platform string.
    pub platform: String,
    /// Client application version.
    pub app_version: String,
}

impl DeviceInfo {
    /// Creates device metadata with a freshly generated device id.
    #[must_use]
    pub fn new(name: impl Into<String>, platform: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            device_id: Uuid::new_v4(),
            name: name.into(),
            platform: platform.into(),
            app_version: app_version.into(),
        }
    }
}

/// The authoritative user record, with its profile already opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Server-assigned account identifier.
    pub id: String,
    /// Unix timestamp of account creation.
    pub created_at: u64,
    /// The profile supplied at registration.
    pub profile: ProfileInfo,
}

/// A bookmark held server-side, passed through to the sync collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Server-assigned bookmark identifier.
    pub id: String,
    /// The title the bookmark belongs to.
    pub title_id: String,
    /// Position within the title, in seconds.
    pub position_secs: u64,
    /// Unix timestamp of creation.
    pub created_at: u64,
}

/// A per-title progress entry, passed through to the sync collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// The title the entry tracks.
    pub title_id: String,
    /// Last playback/reading position, in seconds.
    pub position_secs: u64,
    /// Whether the title has been finished.
    pub finished: bool,
    /// Unix timestamp of the last update.
    pub updated_at: u64,
}

/// The authenticated state: account identifier, bearer token, session
/// identifier and the payload seed.
///
/// Owned exclusively by the session manager; other components receive
/// snapshots. The token authorizes every call on this session and the seed
/// opens server-returned sealed fields; both are redacted from `Debug`
/// output.
#[derive(Clone)]
pub struct Session {
    account_id: String,
    token: String,
    session_id: String,
    seed: PayloadSeed,
}

impl Session {
    /// Assembles a session.
    ///
    /// Called by the session manager when a handshake completes, and by
    /// hosts reinstalling a session the store collaborator persisted.
    #[must_use]
    pub const fn new(
        account_id: String,
        token: String,
        session_id: String,
        seed: PayloadSeed,
    ) -> Self {
        Self {
            account_id,
            token,
            session_id,
            seed,
        }
    }

    /// Returns the account identifier.
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Returns the bearer token. Handle with care: never log or display.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the server-assigned session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the symmetric payload seed carried by this session.
    #[must_use]
    pub const fn payload_seed(&self) -> &PayloadSeed {
        &self.seed
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("session_id", &self.session_id)
            .field("token", &"[REDACTED]")
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_debug_redacts_token_and_seed() {
        let session = Session::new(
            "acct_1".to_string(),
            "tok_secret".to_string(),
            "sess_1".to_string(),
            PayloadSeed::from_bytes([1u8; 32]),
        );
        let rendered = format!("{session:?}");
        assert!(rendered.contains("acct_1"));
        assert!(!rendered.contains("tok_secret"));
    }

    #[test]
    fn device_ids_are_unique() {
        let a = DeviceInfo::new("Pixel", "android", "1.2.3");
        let b = DeviceInfo::new("Pixel", "android", "1.2.3");
        assert_ne!(a.device_id, b.device_id);
    }
}
