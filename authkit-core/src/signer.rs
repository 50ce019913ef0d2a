//! Challenge signing.
//!
//! The account service issues a one-time challenge; signing it with the
//! derived private key proves possession without revealing anything. The
//! challenge code travels as base64url-encoded bytes and the signature is
//! returned in the same encoding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ed25519_dalek::{Signature as DalekSignature, Signer as _, Verifier as _, VerifyingKey};

use crate::error::{AuthKitError, AuthResult};
use crate::keys::KeyMaterial;

/// A one-time challenge issued by the account service.
///
/// Opaque to the client beyond its encoding: the code is base64url-encoded
/// bytes bound server-side to a public key and an intended operation, and
/// is consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge(String);

impl Challenge {
    /// Wraps a server-issued challenge code.
    #[must_use]
    pub const fn new(code: String) -> Self {
        Self(code)
    }

    /// Returns the challenge code as received from the server.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }

    fn decoded(&self) -> AuthResult<Vec<u8>> {
        URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|err| AuthKitError::Signing {
                reason: format!("challenge code is not valid base64url: {err}"),
            })
    }
}

/// A signature over a challenge, encoded for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(String);

impl Signature {
    /// Returns the base64url-encoded signature bytes.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.0
    }
}

/// Signs a challenge with the derived private key.
///
/// # Errors
///
/// Returns [`AuthKitError::Signing`] only when the challenge code is not
/// valid base64url. Signing itself cannot fail on well-formed input.
pub fn sign_challenge(keys: &KeyMaterial, challenge: &Challenge) -> AuthResult<Signature> {
    let message = challenge.decoded()?;
    let signature = keys.signing_key().sign(&message);
    Ok(Signature(URL_SAFE_NO_PAD.encode(signature.to_bytes())))
}

/// Verifies a signature over a challenge against a public key.
///
/// This is the check the server performs on submission; the client uses it
/// in tests and when validating its own handshake material.
#[must_use]
pub fn verify_challenge(
    public_key: &VerifyingKey,
    challenge: &Challenge,
    signature: &Signature,
) -> bool {
    let Ok(message) = challenge.decoded() else {
        return false;
    };
    let Ok(raw) = URL_SAFE_NO_PAD.decode(&signature.0) else {
        return false;
    };
    let Ok(parsed) = DalekSignature::from_slice(&raw) else {
        return false;
    };
    public_key.verify(&message, &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Mnemonic;

    fn material() -> KeyMaterial {
        KeyMaterial::derive(&Mnemonic::from_entropy(&[3u8; 32]).unwrap())
    }

    fn challenge(bytes: &[u8]) -> Challenge {
        Challenge::new(URL_SAFE_NO_PAD.encode(bytes))
    }

    #[test]
    fn signature_verifies_against_derived_public_key() {
        let keys = material();
        let c = challenge(b"c1");
        let sig = sign_challenge(&keys, &c).unwrap();
        assert!(verify_challenge(&keys.public_key(), &c, &sig));
    }

    #[test]
    fn signature_is_bound_to_the_challenge() {
        let keys = material();
        let sig = sign_challenge(&keys, &challenge(b"c1")).unwrap();
        assert!(!verify_challenge(&keys.public_key(), &challenge(b"c2"), &sig));
    }

    #[test]
    fn signature_is_bound_to_the_key() {
        let keys = material();
        let other = KeyMaterial::derive(&Mnemonic::from_entropy(&[4u8; 32]).unwrap());
        let c = challenge(b"c1");
        let sig = sign_challenge(&keys, &c).unwrap();
        assert!(!verify_challenge(&other.public_key(), &c, &sig));
    }

    #[test]
    fn malformed_challenge_encoding_fails() {
        let err = sign_challenge(&material(), &Challenge::new("not%valid".to_string()))
            .unwrap_err();
        assert!(matches!(err, AuthKitError::Signing { .. }));
    }
}
