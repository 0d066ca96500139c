//! Symmetric protection of the master key records at rest.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{thread_rng, Rng};
use thiserror::Error;
use zeroize::Zeroizing;

/// Length of the random nonce prepended to every ciphertext.
const NONCE_LEN: usize = 12;

/// Errors produced by an [`Encryptor`] or [`Decryptor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed")]
    Encrypt,

    /// Decryption failed: wrong key, no key, or tampered ciphertext.
    #[error("decryption failed (wrong key or corrupted data)")]
    Decrypt,
}

/// Encrypts opaque blobs.
pub trait Encryptor: Send + Sync {
    /// Encrypts `plaintext`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Decrypts blobs produced by the matching [`Encryptor`].
pub trait Decryptor: Send + Sync {
    /// Decrypts `ciphertext`.
    ///
    /// The plaintext is returned in a buffer that is wiped when dropped.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// AES-256-GCM key protecting the master key records.
///
/// Ciphertexts are laid out as `nonce (12 bytes) || ciphertext || tag`, with a fresh random nonce
/// per encryption.
pub struct CryptoKey {
    key: Zeroizing<[u8; 32]>,
}

impl CryptoKey {
    /// Generates a new random key.
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        thread_rng().fill(&mut key[..]);
        Self { key }
    }

    /// Wraps existing key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            key: Zeroizing::new(bytes),
        }
    }

    /// Raw key bytes, for persisting the key somewhere safe.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key[..]))
    }
}

impl std::fmt::Debug for CryptoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CryptoKey(..)")
    }
}

impl Encryptor for CryptoKey {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        thread_rng().fill(&mut nonce[..]);

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }
}

impl Decryptor for CryptoKey {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(CryptoError::Decrypt);
        }
        let (nonce, ciphertext) = ciphertext.split_at(NONCE_LEN);

        self.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decrypt)
    }
}
