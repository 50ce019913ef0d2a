//! Error types for the authentication and session lifecycle.

use thiserror::Error;

use crate::session::Operation;

/// Convenience alias used throughout the crate.
pub type AuthResult<T> = Result<T, AuthKitError>;

/// Error outputs from `AuthKit`.
///
/// Cryptographic and encoding failures (`InvalidMnemonic`, `Signing`,
/// `Encryption`) abort a handshake before any network call is made.
/// Stage failures during a handshake wrap their originating cause so
/// callers can branch on the operation that failed while still seeing
/// what went wrong underneath.
#[derive(Debug, Error)]
pub enum AuthKitError {
    /// The supplied phrase does not conform to the BIP39 word-list or
    /// checksum format.
    #[error("invalid_mnemonic: {reason}")]
    InvalidMnemonic {
        /// Description of the violation. Never contains the phrase itself.
        reason: String,
    },

    /// The challenge code could not be decoded for signing.
    #[error("signing_error: {reason}")]
    Signing {
        /// Description of the malformed input.
        reason: String,
    },

    /// Encoding the plaintext for payload encryption failed.
    #[error("encryption_error: {context}")]
    Encryption {
        /// Context describing what was being encrypted.
        context: String,
    },

    /// Decryption failed: authentication tag mismatch, truncated envelope,
    /// or corrupted ciphertext.
    #[error("decryption_error: {context}")]
    Decryption {
        /// Context describing what was being decrypted.
        context: String,
    },

    /// Fetching a one-time challenge from the account service failed.
    #[error("challenge_request_failed")]
    ChallengeRequest {
        /// The underlying failure.
        #[source]
        source: Box<AuthKitError>,
    },

    /// The login handshake failed after the challenge stage.
    #[error("login_failed")]
    Login {
        /// The originating cause.
        #[source]
        source: Box<AuthKitError>,
    },

    /// The registration handshake failed after the challenge stage.
    #[error("registration_failed")]
    Registration {
        /// The originating cause.
        #[source]
        source: Box<AuthKitError>,
    },

    /// A restore fetch (user, bookmarks or progress) failed. The existing
    /// session is left installed unless auto-invalidation is configured.
    #[error("restore_fetch_failed")]
    RestoreFetch {
        /// The originating cause.
        #[source]
        source: Box<AuthKitError>,
    },

    /// Another call of the same operation kind is already in flight.
    #[error("operation_in_progress: {operation}")]
    OperationInProgress {
        /// The operation that was rejected.
        operation: Operation,
    },

    /// The underlying transport reported that the call was cancelled or
    /// timed out before completing.
    #[error("operation_cancelled")]
    OperationCancelled,

    /// Network failure talking to the account service.
    #[error("network_error: {url} (status: {status:?}): {detail}")]
    Network {
        /// The request URL.
        url: String,
        /// HTTP status code, when a response was received.
        status: Option<u16>,
        /// Failure detail.
        detail: String,
    },

    /// Unexpected error serializing or deserializing information.
    #[error("serialization_error: {detail}")]
    Serialization {
        /// Failure detail.
        detail: String,
    },
}

impl AuthKitError {
    /// Wraps a stage failure into `ChallengeRequest`, passing
    /// cancellation through untouched.
    #[must_use]
    pub fn into_challenge_request(self) -> Self {
        match self {
            Self::OperationCancelled => self,
            other => Self::ChallengeRequest {
                source: Box::new(other),
            },
        }
    }

    /// Wraps a stage failure into `Login`, passing cancellation through
    /// untouched.
    #[must_use]
    pub fn into_login(self) -> Self {
        match self {
            Self::OperationCancelled => self,
            other => Self::Login {
                source: Box::new(other),
            },
        }
    }

    /// Wraps a stage failure into `Registration`, passing cancellation
    /// through untouched.
    #[must_use]
    pub fn into_registration(self) -> Self {
        match self {
            Self::OperationCancelled => self,
            other => Self::Registration {
                source: Box::new(other),
            },
        }
    }

    /// Wraps a stage failure into `RestoreFetch`, passing cancellation
    /// through untouched.
    #[must_use]
    pub fn into_restore_fetch(self) -> Self {
        match self {
            Self::OperationCancelled => self,
            other => Self::RestoreFetch {
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_never_wrapped() {
        assert!(matches!(
            AuthKitError::OperationCancelled.into_login(),
            AuthKitError::OperationCancelled
        ));
        assert!(matches!(
            AuthKitError::OperationCancelled.into_restore_fetch(),
            AuthKitError::OperationCancelled
        ));
    }

    #[test]
    fn stage_wrappers_keep_the_cause() {
        let err = AuthKitError::Network {
            url: "https://api.example".to_string(),
            status: Some(500),
            detail: "boom".to_string(),
        }
        .into_login();
        let AuthKitError::Login { source } = err else {
            panic!("expected login wrapper");
        };
        assert!(matches!(*source, AuthKitError::Network { .. }));
    }
}
