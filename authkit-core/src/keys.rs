//! Mnemonic handling and deterministic key derivation.
//!
//! The mnemonic phrase is the only secret the user supplies. Everything
//! else is derived from it:
//!
//! ```text
//! mnemonic ──BIP39──► 64-byte seed ──HKDF-SHA256──► signing key (Ed25519)
//!                                              └──► payload seed (32 bytes)
//! ```
//!
//! Derivation is pure and deterministic: the same phrase always yields the
//! same [`KeyMaterial`]. That determinism is itself the authentication
//! factor: possession of the phrase implies the ability to sign correctly.
//! Neither the phrase nor any derived secret is ever logged, persisted or
//! transmitted.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use ed25519_dalek::{SigningKey, VerifyingKey};
use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AuthKitError, AuthResult};

// Domain Separation Labels

/// Salt binding the derivation to this protocol version.
const HKDF_SALT: &[u8] = b"authkit:v1";

/// Label for deriving the Ed25519 signing key.
const LABEL_SIGNING_KEY: &[u8] = b"authkit:signing-key";

/// Label for deriving the symmetric payload seed.
const LABEL_PAYLOAD_SEED: &[u8] = b"authkit:payload-seed";

/// A validated BIP39 mnemonic phrase.
///
/// Parsing enforces the word-list and checksum format; a [`Mnemonic`] value
/// is therefore always derivable. The inner phrase is zeroized on drop and
/// never exposed through `Debug`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic(bip39::Mnemonic);

impl Mnemonic {
    /// Parses and validates a mnemonic phrase.
    ///
    /// Whitespace and letter case are normalized before validation, so
    /// `"  Abandon ABANDON …"` and `"abandon abandon …"` are equivalent.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::InvalidMnemonic`] if the phrase does not
    /// conform to the BIP39 word-list/checksum format. The error never
    /// contains the phrase itself.
    pub fn parse(phrase: &str) -> AuthResult<Self> {
        let mut normalized = phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        let result = bip39::Mnemonic::parse_normalized(&normalized).map_err(|err| {
            AuthKitError::InvalidMnemonic {
                reason: err.to_string(),
            }
        });

        normalized.zeroize();
        result.map(Self)
    }

    /// Builds a mnemonic from raw entropy.
    ///
    /// Exposed for onboarding flows that generate a fresh phrase and for
    /// deterministic test fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::InvalidMnemonic`] if the entropy length is
    /// not a multiple of 32 bits between 128 and 256 bits.
    pub fn from_entropy(entropy: &[u8]) -> AuthResult<Self> {
        bip39::Mnemonic::from_entropy(entropy)
            .map(Self)
            .map_err(|err| AuthKitError::InvalidMnemonic {
                reason: err.to_string(),
            })
    }

    /// Returns the number of words in the phrase.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.0.word_count()
    }

    /// Renders the phrase for display during onboarding.
    ///
    /// The returned string holds the secret; callers are responsible for
    /// zeroizing it when done.
    #[must_use]
    pub fn phrase(&self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mnemonic")
            .field("phrase", &"[REDACTED]")
            .field("word_count", &self.word_count())
            .finish()
    }
}

/// The symmetric seed derived alongside the keypair (256-bit).
///
/// Used to seal device and profile metadata before transmission and to open
/// server-returned sealed fields. Carried inside the established
/// [`Session`](crate::types::Session); never transmitted.
///
/// The seed is zeroized on drop and compared in constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PayloadSeed([u8; 32]);

impl PayloadSeed {
    /// Creates a seed from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the raw seed bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encodes the seed for handoff to the session-store collaborator.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Decodes a seed previously produced by [`Self::to_base64`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Serialization`] if the input is not valid
    /// base64 or does not decode to exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> AuthResult<Self> {
        let mut decoded =
            STANDARD
                .decode(encoded)
                .map_err(|err| AuthKitError::Serialization {
                    detail: format!("payload seed is not valid base64: {err}"),
                })?;
        let bytes: [u8; 32] =
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| AuthKitError::Serialization {
                    detail: format!("payload seed must be 32 bytes, got {}", decoded.len()),
                })?;
        decoded.zeroize();
        Ok(Self(bytes))
    }
}

impl PartialEq for PayloadSeed {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for PayloadSeed {}

impl std::fmt::Debug for PayloadSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadSeed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Key material derived from a mnemonic.
///
/// Holds the Ed25519 signing key (never transmitted, used only to sign
/// challenges) and the symmetric payload seed (never transmitted, used only
/// to seal/open payloads locally). The public key is the only transmissible
/// part.
///
/// Key material lives only for the duration of the handshake that produced
/// it; after a session is established, payload operations use the seed
/// carried inside the session, not a re-derivation.
pub struct KeyMaterial {
    signing_key: SigningKey,
    seed: PayloadSeed,
}

impl KeyMaterial {
    /// Derives key material from a validated mnemonic.
    ///
    /// Pure and deterministic; safe to call repeatedly and concurrently.
    #[must_use]
    pub fn derive(mnemonic: &Mnemonic) -> Self {
        let mut seed64 = mnemonic.0.to_seed("");
        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), &seed64);
        seed64.zeroize();

        let mut sk_bytes = hkdf_expand_32(&hk, LABEL_SIGNING_KEY);
        let signing_key = SigningKey::from_bytes(&sk_bytes);
        sk_bytes.zeroize();

        let mut seed_bytes = hkdf_expand_32(&hk, LABEL_PAYLOAD_SEED);
        let seed = PayloadSeed::from_bytes(seed_bytes);
        seed_bytes.zeroize();

        Self { signing_key, seed }
    }

    /// Parses a phrase and derives key material in one step.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::InvalidMnemonic`] if the phrase is not a
    /// valid BIP39 mnemonic.
    pub fn from_phrase(phrase: &str) -> AuthResult<Self> {
        Ok(Self::derive(&Mnemonic::parse(phrase)?))
    }

    /// Returns the public verification key.
    #[must_use]
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Returns the public key encoded for the wire (base64url, unpadded).
    #[must_use]
    pub fn public_key_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.public_key().to_bytes())
    }

    /// Returns the symmetric payload seed.
    #[must_use]
    pub const fn payload_seed(&self) -> &PayloadSeed {
        &self.seed
    }

    pub(crate) const fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

/// Expands 32 bytes from the derivation PRK under a domain label.
///
/// # Panics
///
/// This function will not panic - the `expect` is for a condition that
/// cannot fail (32 bytes is always a valid HKDF-SHA256 output length).
fn hkdf_expand_32(hk: &Hkdf<Sha256>, info: &[u8]) -> [u8; 32] {
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_key", &hex::encode(self.public_key().to_bytes()))
            .field("signing_key", &"[REDACTED]")
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mnemonic() -> Mnemonic {
        Mnemonic::from_entropy(&[7u8; 32]).unwrap()
    }

    #[test]
    fn derivation_is_deterministic() {
        let mnemonic = test_mnemonic();
        let a = KeyMaterial::derive(&mnemonic);
        let b = KeyMaterial::derive(&mnemonic);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.payload_seed(), b.payload_seed());
    }

    #[test]
    fn different_mnemonics_diverge() {
        let a = KeyMaterial::derive(&Mnemonic::from_entropy(&[1u8; 32]).unwrap());
        let b = KeyMaterial::derive(&Mnemonic::from_entropy(&[2u8; 32]).unwrap());
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(a.payload_seed(), b.payload_seed());
    }

    #[test]
    fn parse_normalizes_whitespace_and_case() {
        let phrase = test_mnemonic().phrase();
        let shouty = format!("  {}  ", phrase.to_uppercase().replace(' ', "   "));
        let a = KeyMaterial::from_phrase(&phrase).unwrap();
        let b = KeyMaterial::from_phrase(&shouty).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test_case::test_case(""; "empty phrase")]
    #[test_case::test_case("definitely not a mnemonic"; "unknown words")]
    #[test_case::test_case("abandon abandon abandon"; "wrong word count")]
    // 12 valid words with a broken checksum:
    #[test_case::test_case(
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        "checksum violation"
    )]
    fn invalid_phrases_are_rejected(phrase: &str) {
        let err = Mnemonic::parse(phrase).unwrap_err();
        assert!(matches!(err, AuthKitError::InvalidMnemonic { .. }));
    }

    #[test]
    fn seed_base64_round_trip() {
        let seed = PayloadSeed::from_bytes([9u8; 32]);
        let encoded = seed.to_base64();
        assert_eq!(PayloadSeed::from_base64(&encoded).unwrap(), seed);
    }

    #[test]
    fn seed_base64_rejects_wrong_length() {
        let err = PayloadSeed::from_base64(&STANDARD.encode([1u8; 16])).unwrap_err();
        assert!(matches!(err, AuthKitError::Serialization { .. }));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mnemonic = test_mnemonic();
        let material = KeyMaterial::derive(&mnemonic);
        let rendered = format!("{mnemonic:?}{material:?}{:?}", material.payload_seed());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(&mnemonic.phrase()));
    }
}
