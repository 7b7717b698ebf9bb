//! # Signing Identity
//!
//! The client never manages keys itself. Everything that must produce a
//! signed message receives an [`IdentityContext`] supplied by the caller.

use crate::codec;
use crate::errors::SigningError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Signer capability supplied by an external identity provider.
pub trait IdentityContext: Send + Sync {
    /// Serialized identity of the signer (the transaction creator).
    fn identity(&self) -> Result<Vec<u8>, SigningError>;

    /// Sign `message` with the signer's private key.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError>;
}

/// Identity as carried in signature headers: membership provider ID plus
/// the raw public key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedIdentity {
    pub msp_id: String,
    pub id_bytes: Vec<u8>,
}

/// Ed25519-backed identity for development networks and tests.
pub struct Ed25519Identity {
    msp_id: String,
    signing_key: SigningKey,
}

impl Ed25519Identity {
    /// Generate a fresh random key for `msp_id`.
    pub fn generate(msp_id: impl Into<String>) -> Self {
        let seed: [u8; 32] = rand::random();
        Self::from_seed(msp_id, seed)
    }

    /// Build from a 32-byte secret seed.
    pub fn from_seed(msp_id: impl Into<String>, seed: [u8; 32]) -> Self {
        Self {
            msp_id: msp_id.into(),
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Membership provider this identity belongs to.
    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Public key bytes.
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Verify a signature produced by this identity.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        verify_ed25519(&self.public_key(), message, signature)
    }
}

impl std::fmt::Debug for Ed25519Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Identity")
            .field("msp_id", &self.msp_id)
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

impl IdentityContext for Ed25519Identity {
    fn identity(&self) -> Result<Vec<u8>, SigningError> {
        let serialized = SerializedIdentity {
            msp_id: self.msp_id.clone(),
            id_bytes: self.public_key().to_vec(),
        };
        Ok(codec::encode("SerializedIdentity", &serialized)?)
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

/// Verify an Ed25519 signature over `message`.
pub fn verify_ed25519(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &sig).is_ok()
}
