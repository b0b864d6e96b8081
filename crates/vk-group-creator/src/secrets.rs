//! Encryption at rest for VK access tokens.
//!
//! Tokens are obtained once via OAuth, stored AES-256-GCM-encrypted in the
//! `vk_tokens` table, and decrypted only inside a worker for the duration of
//! a job execution. Decrypted values are wrapped in [`SecretString`] so they
//! never end up in debug output or logs.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use secrecy::SecretString;

/// Environment variable holding the 64-char hex encryption key.
pub const ENCRYPTION_KEY_ENV_VAR: &str = "ENCRYPTION_KEY";

/// Nonce size for AES-256-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Encryption error: {0}")]
    EncryptionError(String),

    #[error("Decryption error: {0}")]
    DecryptionError(String),

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Token encryptor using AES-256-GCM.
///
/// The key must be a 64-character hex string (32 bytes). Ciphertext format:
/// `<12-byte nonce><ciphertext>`, all hex-encoded.
pub struct TokenEncryptor {
    cipher: Aes256Gcm,
}

impl TokenEncryptor {
    /// Creates a new `TokenEncryptor` from the `ENCRYPTION_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        let key_hex = std::env::var(ENCRYPTION_KEY_ENV_VAR).map_err(|_| {
            SecretError::InvalidKey(format!(
                "Environment variable {} not set",
                ENCRYPTION_KEY_ENV_VAR
            ))
        })?;

        Self::from_hex_key(&key_hex)
    }

    /// Creates a new `TokenEncryptor` from a hex-encoded 32-byte key.
    pub fn from_hex_key(key_hex: &str) -> Result<Self> {
        let key_bytes = hex_decode(key_hex)
            .map_err(|e| SecretError::InvalidKey(format!("Invalid hex key: {}", e)))?;

        if key_bytes.len() != 32 {
            return Err(SecretError::InvalidKey(format!(
                "Key must be 32 bytes (64 hex chars), got {} bytes",
                key_bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| SecretError::InvalidKey(format!("Failed to create cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Encrypts a token and returns hex-encoded ciphertext with a prepended
    /// random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| SecretError::EncryptionError(e.to_string()))?;

        let mut combined = nonce.to_vec();
        combined.extend(ciphertext);

        Ok(hex_encode(&combined))
    }

    /// Decrypts hex-encoded ciphertext (with prepended nonce) back into the
    /// token, wrapped so it cannot leak through `Debug` or logging.
    pub fn decrypt(&self, ciphertext_hex: &str) -> Result<SecretString> {
        let combined = hex_decode(ciphertext_hex)
            .map_err(|e| SecretError::DecryptionError(format!("Invalid hex: {}", e)))?;

        if combined.len() < NONCE_SIZE {
            return Err(SecretError::DecryptionError(
                "Ciphertext too short".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| SecretError::DecryptionError(e.to_string()))?;

        let plaintext = String::from_utf8(plaintext_bytes)
            .map_err(|e| SecretError::DecryptionError(format!("Invalid UTF-8: {}", e)))?;

        Ok(SecretString::from(plaintext))
    }
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
    let mut result = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        result.push(HEX_CHARS[(byte >> 4) as usize] as char);
        result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    result
}

/// Decodes a hex string to bytes.
fn hex_decode(hex: &str) -> std::result::Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("Hex string must have even length".to_string());
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("Invalid hex at position {}: {}", i, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    // Test key: 32 bytes = 64 hex chars
    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_roundtrip() {
        let encryptor = TokenEncryptor::from_hex_key(TEST_KEY).unwrap();
        let plaintext = "vk1.a.example-access-token";

        let ciphertext = encryptor.encrypt(plaintext).unwrap();
        let decrypted = encryptor.decrypt(&ciphertext).unwrap();

        assert_eq!(decrypted.expose_secret(), plaintext);
    }

    #[test]
    fn test_random_nonce_gives_distinct_ciphertext() {
        let encryptor = TokenEncryptor::from_hex_key(TEST_KEY).unwrap();

        let c1 = encryptor.encrypt("same-token").unwrap();
        let c2 = encryptor.encrypt("same-token").unwrap();

        assert_ne!(c1, c2);
        assert_eq!(encryptor.decrypt(&c1).unwrap().expose_secret(), "same-token");
        assert_eq!(encryptor.decrypt(&c2).unwrap().expose_secret(), "same-token");
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(
            TokenEncryptor::from_hex_key("0123456789abcdef"),
            Err(SecretError::InvalidKey(_))
        ));
        assert!(matches!(
            TokenEncryptor::from_hex_key("not-hex-at-all!!"),
            Err(SecretError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_decrypt_rejects_tampered_ciphertext() {
        let encryptor = TokenEncryptor::from_hex_key(TEST_KEY).unwrap();

        // Invalid hex
        assert!(matches!(
            encryptor.decrypt("zz"),
            Err(SecretError::DecryptionError(_))
        ));

        // Shorter than the nonce
        assert!(matches!(
            encryptor.decrypt("aabbccdd"),
            Err(SecretError::DecryptionError(_))
        ));

        // Bit-flipped ciphertext fails authentication
        let ciphertext = encryptor.encrypt("token").unwrap();
        let mut raw = hex_decode(&ciphertext).unwrap();
        if let Some(byte) = raw.last_mut() {
            *byte ^= 0xff;
        }
        assert!(matches!(
            encryptor.decrypt(&hex_encode(&raw)),
            Err(SecretError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_hex_roundtrip() {
        let original = vec![0x00, 0xff, 0x12, 0xab, 0xcd, 0xef];
        let encoded = hex_encode(&original);
        assert_eq!(encoded, "00ff12abcdef");
        assert_eq!(hex_decode(&encoded).unwrap(), original);

        assert!(hex_decode("abc").is_err());
        assert!(hex_decode("ghij").is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(ENCRYPTION_KEY_ENV_VAR, TEST_KEY);
        assert!(TokenEncryptor::from_env().is_ok());

        std::env::remove_var(ENCRYPTION_KEY_ENV_VAR);
        assert!(matches!(
            TokenEncryptor::from_env(),
            Err(SecretError::InvalidKey(_))
        ));
    }
}
