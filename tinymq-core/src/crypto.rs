//! AES-256-GCM protection for the broker password stored in configuration.
//!
//! Stored form: `base64(nonce[12] || ciphertext || tag[16])`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Key used when the configuration does not name one
pub const DEFAULT_KEY: [u8; KEY_LEN] = *b"tinymq-broker-default-aes256-key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key is not base64 or is not 32 bytes long
    InvalidKey,
    /// Stored value is not base64, or the plaintext is not UTF-8
    InvalidEncoding,
    /// Decoded value is shorter than nonce plus tag
    CiphertextTooShort { length: usize },
    EncryptionFailed,
    /// Authentication tag mismatch: wrong key or tampered value
    DecryptionFailed,
}

impl core::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CryptoError::InvalidKey => write!(f, "Key must be 256 bits (32 bytes)"),
            CryptoError::InvalidEncoding => write!(f, "Invalid encrypted value encoding"),
            CryptoError::CiphertextTooShort { length } => {
                write!(f, "Encrypted value too short: {} bytes", length)
            }
            CryptoError::EncryptionFailed => write!(f, "Encryption failed"),
            CryptoError::DecryptionFailed => write!(f, "Decryption failed"),
        }
    }
}

impl core::error::Error for CryptoError {}

/// Decode a base64 key. It must be exactly 256 bits.
pub fn decode_key(encoded: &str) -> Result<[u8; KEY_LEN], CryptoError> {
    let raw = STANDARD
        .decode(encoded.trim())
        .map_err(|_| CryptoError::InvalidKey)?;
    raw.try_into().map_err(|_| CryptoError::InvalidKey)
}

/// Fresh random key, base64 encoded
pub fn generate_key() -> String {
    STANDARD.encode(Aes256Gcm::generate_key(&mut OsRng))
}

pub fn encrypt_password(plaintext: &str, key: &[u8; KEY_LEN]) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut stored = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    stored.extend_from_slice(&nonce);
    stored.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(stored))
}

pub fn decrypt_password(encoded: &str, key: &[u8; KEY_LEN]) -> Result<String, CryptoError> {
    let stored = STANDARD
        .decode(encoded.trim())
        .map_err(|_| CryptoError::InvalidEncoding)?;
    if stored.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::CiphertextTooShort {
            length: stored.len(),
        });
    }

    let (nonce, ciphertext) = stored.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidEncoding)
}
