//! Sealed payloads for device and profile metadata.
//!
//! Metadata leaves the device only in sealed form: CBOR-encoded plaintext
//! encrypted with XChaCha20-Poly1305 under the payload seed. The server
//! stores the envelope opaquely and echoes it back; only a client holding
//! the seed can open it. Tampering is detected by the AEAD tag, never
//! silently accepted.
//!
//! # Envelope Format
//!
//! ```text
//! nonce: [u8; 24]
//! ciphertext: [u8; ...] (variable length, includes auth tag)
//! ```
//!
//! On the wire the envelope travels as standard base64.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AuthKitError, AuthResult};
use crate::keys::PayloadSeed;

/// Size of the XChaCha20-Poly1305 nonce.
const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag.
const TAG_SIZE: usize = 16;

/// Associated-data label for sealed device metadata.
const LABEL_DEVICE: &[u8] = b"authkit:device";

/// Associated-data label for sealed profile metadata.
const LABEL_PROFILE: &[u8] = b"authkit:profile";

/// What a sealed payload carries; selects the domain-separation label so a
/// device envelope can never be opened as a profile envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Device metadata attached to login and registration.
    Device,
    /// Profile metadata attached to registration and echoed in the user
    /// record.
    Profile,
}

impl PayloadKind {
    const fn label(self) -> &'static [u8] {
        match self {
            Self::Device => LABEL_DEVICE,
            Self::Profile => LABEL_PROFILE,
        }
    }
}

/// An encrypted metadata envelope: `nonce ‖ ciphertext`.
///
/// Opaque to the transport and to the server beyond storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload(Vec<u8>);

impl EncryptedPayload {
    /// Returns the raw envelope bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encodes the envelope for the wire.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Decodes an envelope received from the wire.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Decryption`] if the input is not valid
    /// base64 or is too short to hold a nonce and an auth tag.
    pub fn from_base64(encoded: &str) -> AuthResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|err| AuthKitError::Decryption {
                context: format!("envelope is not valid base64: {err}"),
            })?;
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(AuthKitError::Decryption {
                context: format!("envelope too short: {} bytes", bytes.len()),
            });
        }
        Ok(Self(bytes))
    }
}

/// Generates a random nonce for XChaCha20-Poly1305.
///
/// # Panics
///
/// Panics if the system's random number generator fails.
fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce).expect("getrandom failed");
    nonce
}

/// Builds the cipher for a seed.
///
/// # Panics
///
/// This function will not panic - the `expect` is for a condition that
/// cannot fail (seed length is always 32 bytes by construction).
fn cipher_for(seed: &PayloadSeed) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new_from_slice(seed.as_bytes()).expect("key length is always 32")
}

/// Seals a serializable value under the payload seed.
///
/// The value is CBOR-encoded, then encrypted with a fresh random nonce and
/// the kind's domain-separation label as associated data.
///
/// # Errors
///
/// Returns [`AuthKitError::Encryption`] if CBOR encoding fails. Encryption
/// itself cannot fail for valid input.
pub fn seal<T: Serialize>(
    seed: &PayloadSeed,
    kind: PayloadKind,
    value: &T,
) -> AuthResult<EncryptedPayload> {
    let mut plaintext = Vec::new();
    ciborium::ser::into_writer(value, &mut plaintext).map_err(|err| {
        AuthKitError::Encryption {
            context: format!("cbor encoding failed: {err}"),
        }
    })?;

    let cipher = cipher_for(seed);
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: &plaintext,
                aad: kind.label(),
            },
        )
        .map_err(|_| AuthKitError::Encryption {
            context: "aead encryption failed".to_string(),
        })?;

    let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);
    Ok(EncryptedPayload(envelope))
}

/// Opens a sealed payload and decodes the value inside.
///
/// # Errors
///
/// Returns [`AuthKitError::Decryption`] if the envelope is truncated, was
/// sealed under a different seed or kind, or has been tampered with.
pub fn open<T: DeserializeOwned>(
    seed: &PayloadSeed,
    kind: PayloadKind,
    payload: &EncryptedPayload,
) -> AuthResult<T> {
    let bytes = payload.as_bytes();
    if bytes.len() < NONCE_SIZE + TAG_SIZE {
        return Err(AuthKitError::Decryption {
            context: format!("envelope too short: {} bytes", bytes.len()),
        });
    }
    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);

    let plaintext = cipher_for(seed)
        .decrypt(
            XNonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: kind.label(),
            },
        )
        .map_err(|_| AuthKitError::Decryption {
            context: "authentication failed".to_string(),
        })?;

    ciborium::de::from_reader(plaintext.as_slice()).map_err(|err| {
        AuthKitError::Decryption {
            context: format!("cbor decoding failed: {err}"),
        }
    })
}
