//! Session key for wrapping cached passwords.
//!
//! The lock manager never keeps a cleartext password: each cached password is
//! sealed under a key that lives only as long as the process.
//!
//! # Format
//! `[Nonce (12)] [Ciphertext || Tag (...)]`

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::drbg::DrbgError;
use crate::random::DrbgRng;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Errors from the session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Encryption/Decryption failure (wrong key or tampered data).
    #[error("session encryption failure")]
    Crypto,
    /// Key or nonce generation failed.
    #[error("random generation failed: {0}")]
    Random(#[from] DrbgError),
}

/// Symmetric primitive protecting secrets at rest in memory.
pub trait SessionKey {
    /// Seals `plaintext`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SessionError>;

    /// Opens data sealed by [`encrypt`](Self::encrypt).
    fn decrypt(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, SessionError>;
}

/// ChaCha20-Poly1305 session key with a random key and per-message nonces.
pub struct ChaChaSessionKey {
    cipher: ChaCha20Poly1305,
    rng: DrbgRng,
}

impl ChaChaSessionKey {
    /// Generates a fresh key; `rng` also supplies the nonces.
    pub fn generate(rng: DrbgRng) -> Result<Self, SessionError> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rng.fill(&mut *key)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&*key));
        Ok(Self { cipher, rng })
    }
}

impl SessionKey for ChaChaSessionKey {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce_bytes)?;

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| SessionError::Crypto)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn decrypt(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, SessionError> {
        if sealed.len() < NONCE_LEN {
            return Err(SessionError::Crypto);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);

        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| SessionError::Crypto)
    }
}
