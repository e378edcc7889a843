//! Credential sealing
//!
//! The store treats a stored credential as an opaque string. A cipher is
//! applied only on the way in (`seal`) and on explicit credential reads
//! (`open`).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use thiserror::Error;

const SEALED_PREFIX: &str = "enc:v1:";
const NONCE_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Failed to seal credential")]
    Seal,

    #[error("Failed to open credential: {0}")]
    Open(String),
}

pub trait CredentialCipher: Send + Sync {
    /// # Errors
    /// Returns an error if the credential cannot be sealed
    fn seal(&self, plaintext: &str) -> Result<String, CipherError>;

    /// # Errors
    /// Returns an error if the stored value cannot be opened
    fn open(&self, stored: &str) -> Result<String, CipherError>;
}

/// Stores credentials as given
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCipher;

impl CredentialCipher for PlaintextCipher {
    fn seal(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(plaintext.to_string())
    }

    fn open(&self, stored: &str) -> Result<String, CipherError> {
        Ok(stored.to_string())
    }
}

/// AES-256-GCM with a random nonce per credential
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Build from a 64-character hex key
    ///
    /// # Errors
    /// Returns an error if the key is not 32 hex-encoded bytes
    pub fn from_hex_key(hex_key: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CipherError::InvalidKey("expected 32 bytes".to_string()))?;
        Ok(Self::new(&key))
    }
}

impl CredentialCipher for AesGcmCipher {
    fn seal(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::Seal)?;

        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(format!("{SEALED_PREFIX}{}", hex::encode(blob)))
    }

    fn open(&self, stored: &str) -> Result<String, CipherError> {
        // Values written before encryption was enabled are returned as-is
        let Some(encoded) = stored.strip_prefix(SEALED_PREFIX) else {
            return Ok(stored.to_string());
        };

        let blob = hex::decode(encoded).map_err(|e| CipherError::Open(e.to_string()))?;
        if blob.len() <= NONCE_LEN {
            return Err(CipherError::Open("ciphertext too short".to_string()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Open("authentication failed".to_string()))?;
        String::from_utf8(plaintext).map_err(|e| CipherError::Open(e.to_string()))
    }
}
