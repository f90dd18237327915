//! Field level encryption for secure entity fields.
//!
//! Sealed values are stored as `base64(nonce[12] || ciphertext || tag[16])` (AES-256-GCM).
//! Without a configured key the vault runs in passthrough mode and stores plaintext.

use std::fmt;

use aes_gcm::{aead::Aead, AeadCore, Aes256Gcm, KeyInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::OnceCell;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::{config, SecurityConfig};

const NONCE_SIZE: usize = 12;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid key encoding")]
    InvalidKeyEncoding,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct Vault {
    cipher: Option<Aes256Gcm>,
}

impl Vault {
    pub fn new(key: &[u8]) -> Result<Self, VaultError> {
        if key.len() != 32 {
            return Err(VaultError::InvalidKeyLength(key.len()));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;
        Ok(Self { cipher: Some(cipher) })
    }

    pub fn passthrough() -> Self {
        Self { cipher: None }
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, VaultError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| VaultError::InvalidKeyEncoding)?;
        Self::new(&bytes)
    }

    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let Some(cipher) = &self.cipher else {
            return Ok(plaintext.to_string());
        };

        let nonce = Aes256Gcm::generate_nonce(&mut aes_gcm::aead::OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    pub fn decrypt(&self, sealed: &str) -> Result<String, VaultError> {
        let Some(cipher) = &self.cipher else {
            return Ok(sealed.to_string());
        };

        let combined = BASE64
            .decode(sealed)
            .map_err(|e| VaultError::DecryptionFailed(format!("invalid base64: {e}")))?;
        if combined.len() < NONCE_SIZE {
            return Err(VaultError::DecryptionFailed(format!(
                "ciphertext too short: {} bytes",
                combined.len()
            )));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = aes_gcm::Nonce::from_slice(nonce_bytes);
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed("corrupted value or key mismatch".to_string()))?;

        String::from_utf8(plaintext).map_err(|e| VaultError::DecryptionFailed(e.to_string()))
    }
}

static VAULT: OnceCell<Vault> = OnceCell::new();

impl Vault {
    /// Vault for the configured key. Passthrough only when no key is configured; a key that
    /// is set but unusable is an error.
    pub fn from_config(security: &SecurityConfig) -> Result<Self, VaultError> {
        match security.field_key.as_deref() {
            Some(key) => Self::from_hex(key),
            None => {
                tracing::warn!("SECURITY_FIELD_KEY not set, secure fields are stored in plaintext");
                Ok(Self::passthrough())
            }
        }
    }
}

/// Process wide vault, built from config on first use. `main` calls it at startup so an
/// invalid key stops the server before any secure field is written.
pub fn vault() -> Result<&'static Vault, VaultError> {
    VAULT.get_or_try_init(|| Vault::from_config(&config().security))
}

/// A value that is encrypted at rest.
///
/// In memory and in API output it is the plain value. [`Secure::seal`] produces the stored
/// form and deserialization (from a database row) opens it again.
#[derive(Clone, PartialEq, Default)]
pub struct Secure<T>(T);

impl<T> Secure<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> Secure<T> {
    pub fn seal(&self) -> Result<String, VaultError> {
        self.seal_with(vault()?)
    }

    pub fn seal_with(&self, vault: &Vault) -> Result<String, VaultError> {
        let plaintext = serde_json::to_string(&self.0)?;
        vault.encrypt(&plaintext)
    }
}

impl<T: DeserializeOwned> Secure<T> {
    pub fn open(sealed: &str) -> Result<Self, VaultError> {
        Self::open_with(vault()?, sealed)
    }

    pub fn open_with(vault: &Vault, sealed: &str) -> Result<Self, VaultError> {
        let plaintext = vault.decrypt(sealed)?;
        Ok(Self(serde_json::from_str(&plaintext)?))
    }
}

impl<T> From<T> for Secure<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Secure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secure(***)")
    }
}

impl<T: Serialize> Serialize for Secure<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Secure<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let sealed = String::deserialize(deserializer)?;
        Secure::open(&sealed).map_err(serde::de::Error::custom)
    }
}
