use ed25519_dalek::Signer as _;
use p256::ecdsa::signature::Signer as _;

use super::cose::CosePublicKey;
use super::types::{CoseAlgorithm, WebAuthnError};

const SEED_LEN: usize = 32;

/// Signing key for one passkey, loaded from wallet key material.
pub enum KeyPair {
    Ed25519(ed25519_dalek::SigningKey),
    Es256(p256::ecdsa::SigningKey),
}

impl KeyPair {
    /// Loads a key pair from private key bytes.
    ///
    /// The first 32 bytes are the seed: the Ed25519 secret, or the P-256
    /// scalar. Account keys stored as 64-byte `seed || public key` therefore
    /// load as-is.
    pub fn from_private_key(alg: CoseAlgorithm, private_key: &[u8]) -> Result<Self, WebAuthnError> {
        let seed: &[u8; SEED_LEN] = private_key
            .get(..SEED_LEN)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| {
                WebAuthnError::InvalidPrivateKey(format!(
                    "need at least {SEED_LEN} bytes, got {}",
                    private_key.len()
                ))
            })?;
        match alg {
            CoseAlgorithm::Ed25519 => Ok(Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(seed))),
            CoseAlgorithm::Es256 => p256::ecdsa::SigningKey::from_slice(seed)
                .map(Self::Es256)
                .map_err(|e| WebAuthnError::InvalidPrivateKey(e.to_string())),
        }
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Ed25519(_) => CoseAlgorithm::Ed25519,
            Self::Es256(_)   => CoseAlgorithm::Es256,
        }
    }

    /// Raw public key: 32 bytes (Ed25519) or the 65-byte uncompressed point (ES256).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
            Self::Es256(key) => key.verifying_key().to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    pub fn cose_public_key(&self) -> Result<CosePublicKey, WebAuthnError> {
        CosePublicKey::new(self.algorithm(), self.public_key_bytes())
    }

    /// Signs `message`. Ed25519 yields the raw 64-byte signature, ES256 a
    /// DER-encoded ECDSA signature as WebAuthn expects.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Ed25519(key) => key.sign(message).to_bytes().to_vec(),
            Self::Es256(key) => {
                let sig: p256::ecdsa::Signature = key.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}
