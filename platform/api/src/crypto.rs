//! Shared-secret token scheme for the device and ingest surfaces.
//!
//! A token is the base64 encoding of a random 96-bit nonce followed by the
//! AES-256-GCM ciphertext of the identity string. The AEAD tag makes forged
//! or tampered tokens fail decryption, so a successful decrypt is the whole
//! authenticity check.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is not valid base64")]
    Encoding(#[from] base64::DecodeError),
    #[error("token is too short")]
    TooShort,
    #[error("token failed decryption")]
    Decrypt,
    #[error("token payload is not utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encrypts and decrypts identity tokens under one shared secret.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// The secret is free-form; it is stretched to a 256-bit key with SHA-256.
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, identity: &str) -> String {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, identity.as_bytes())
            .expect("aes-gcm encryption is infallible for in-memory buffers");

        let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);
        BASE64.encode(token)
    }

    pub fn decrypt(&self, token: &str) -> Result<String, TokenError> {
        let raw = BASE64.decode(token)?;
        if raw.len() <= NONCE_LEN {
            return Err(TokenError::TooShort);
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| TokenError::Decrypt)?;

        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let cipher = TokenCipher::new("device-secret");
        let token = cipher.encrypt("8a7b1f3e-9f1c-4a4e-b1d2-1c9f6a0e8b21");
        assert_eq!(
            cipher.decrypt(&token).unwrap(),
            "8a7b1f3e-9f1c-4a4e-b1d2-1c9f6a0e8b21"
        );
    }

    #[test]
    fn tokens_are_not_deterministic() {
        let cipher = TokenCipher::new("device-secret");
        assert_ne!(cipher.encrypt("device"), cipher.encrypt("device"));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let cipher = TokenCipher::new("device-secret");
        let mut token = BASE64.decode(cipher.encrypt("device")).unwrap();
        let last = token.len() - 1;
        token[last] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&BASE64.encode(token)),
            Err(TokenError::Decrypt)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenCipher::new("device-secret").encrypt("device");
        assert!(TokenCipher::new("other-secret").decrypt(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let cipher = TokenCipher::new("device-secret");
        assert!(cipher.decrypt("not base64 !!!").is_err());
        assert!(matches!(cipher.decrypt("AAAA"), Err(TokenError::TooShort)));
    }
}
