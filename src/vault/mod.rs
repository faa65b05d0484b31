//! Key-storage service: account private keys sealed under a credential the
//! user unlocks the wallet with.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use async_trait::async_trait;
use rand::RngCore;

use crate::encoding::to_base64;

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("no key sealed for public key {0}")]
    InvalidPublicKey(String),
    #[error("vault is locked")]
    Locked,
    #[error("key was sealed with {sealed:?} credentials, vault unlocked with {unlocked:?}")]
    WrongCredentials { sealed: CredentialsKind, unlocked: CredentialsKind },
    #[error("encryption: {0}")]
    Encryption(String),
    #[error("sealed key is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsKind {
    Password,
    Passkey,
    Unencrypted,
}

/// What unlocks the vault. Derived keys come from the password KDF or from
/// passkey-derived material; both are 32 bytes.
#[derive(Clone)]
pub enum KeyCredentials {
    Password { derived_key: [u8; 32] },
    Passkey { derived_key: [u8; 32] },
    Unencrypted,
}

impl KeyCredentials {
    pub fn kind(&self) -> CredentialsKind {
        match self {
            Self::Password { .. } => CredentialsKind::Password,
            Self::Passkey { .. }  => CredentialsKind::Passkey,
            Self::Unencrypted     => CredentialsKind::Unencrypted,
        }
    }

    fn aes_key(&self) -> Option<&[u8; 32]> {
        match self {
            Self::Password { derived_key } | Self::Passkey { derived_key } => Some(derived_key),
            Self::Unencrypted => None,
        }
    }
}

impl std::fmt::Debug for KeyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyCredentials::{:?}", self.kind())
    }
}

/// Resolves an account public key to its decrypted private key bytes.
#[async_trait]
pub trait KeyVault: Send + Sync {
    async fn decrypt(&self, public_key: &[u8]) -> Result<Vec<u8>, VaultError>;
}

struct SealedKey {
    kind: CredentialsKind,
    /// `nonce || ciphertext`, or the raw key when unencrypted.
    blob: Vec<u8>,
}

/// In-memory vault of AES-256-GCM sealed private keys, keyed by public key.
#[derive(Default)]
pub struct SealedKeyVault {
    sealed: Mutex<HashMap<Vec<u8>, SealedKey>>,
    unlocked: Mutex<Option<KeyCredentials>>,
}

impl SealedKeyVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlock(&self, credentials: KeyCredentials) {
        tracing::debug!(kind = ?credentials.kind(), "Vault unlocked");
        *self.unlocked.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    pub fn lock(&self) {
        *self.unlocked.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Seal `private_key` under `credentials`, replacing any key already
    /// stored for `public_key`.
    pub fn seal(&self, public_key: &[u8], private_key: &[u8], credentials: &KeyCredentials) -> Result<(), VaultError> {
        let blob = match credentials.aes_key() {
            Some(aes_key) => encrypt(aes_key, private_key)?,
            None => private_key.to_vec(),
        };
        self.sealed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(public_key.to_vec(), SealedKey { kind: credentials.kind(), blob });
        Ok(())
    }

    pub fn contains(&self, public_key: &[u8]) -> bool {
        self.sealed.lock().unwrap_or_else(PoisonError::into_inner).contains_key(public_key)
    }

    fn open(&self, public_key: &[u8]) -> Result<Vec<u8>, VaultError> {
        let sealed = self.sealed.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = sealed
            .get(public_key)
            .ok_or_else(|| VaultError::InvalidPublicKey(to_base64(public_key)))?;
        if entry.kind == CredentialsKind::Unencrypted {
            return Ok(entry.blob.clone());
        }

        let unlocked = self.unlocked.lock().unwrap_or_else(PoisonError::into_inner);
        let credentials = unlocked.as_ref().ok_or(VaultError::Locked)?;
        if credentials.kind() != entry.kind {
            return Err(VaultError::WrongCredentials { sealed: entry.kind, unlocked: credentials.kind() });
        }
        let aes_key = credentials.aes_key().ok_or(VaultError::Locked)?;
        decrypt(aes_key, &entry.blob)
    }
}

#[async_trait]
impl KeyVault for SealedKeyVault {
    async fn decrypt(&self, public_key: &[u8]) -> Result<Vec<u8>, VaultError> {
        self.open(public_key)
    }
}

fn encrypt(aes_key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(aes_key).map_err(|e| VaultError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

fn decrypt(aes_key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>, VaultError> {
    if blob.len() < NONCE_LEN {
        return Err(VaultError::Corrupt("blob too short".into()));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(aes_key).map_err(|e| VaultError::Encryption(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| VaultError::Encryption(e.to_string()))
}
