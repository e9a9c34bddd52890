//! Lock Factory.
//!
//! Produces locks from passwords and checks passwords against existing locks.
//!
//! # Scheme
//! 1. **Stretch**: K = scrypt(password, salt, cost), or
//!    K = BLAKE3_KDF("passlock 2024 blake3 lock", salt || password)
//! 2. **Verifier**: BLAKE3_KDF("passlock 2024 lock verifier", K), stored in the lock
//! 3. **Content key**: BLAKE3_KDF("passlock 2024 lock content key", K), never stored
//!
//! Verifiers are compared in constant time.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::{Lock, LockError, LockKind, ScryptCost, SALT_LEN, VERIFIER_LEN};
use crate::config::LockConfig;
use crate::random::DrbgRng;

/// Password key length in bytes.
pub const KEY_LEN: usize = 32;

const BLAKE3_LOCK_CONTEXT: &str = "passlock 2024 blake3 lock";
const VERIFIER_CONTEXT: &str = "passlock 2024 lock verifier";
const CONTENT_KEY_CONTEXT: &str = "passlock 2024 lock content key";

/// Creates and opens password locks.
pub trait LockFactory {
    /// Creates a new lock for `password` under a fresh salt.
    fn generate_lock(&self, password: &[u8]) -> Result<Lock, LockError>;

    /// Creates a new lock for `password` of the same kind and cost as
    /// `existing`, under a fresh salt.
    fn generate_similar(&self, existing: &Lock, password: &[u8]) -> Result<Lock, LockError>;

    /// Re-derives the lock encoded in `existing` from `password`.
    ///
    /// Fails with [`LockError::Credential`] when the password does not match.
    fn derive_lock(&self, existing: &[u8], password: &[u8]) -> Result<Lock, LockError>;
}

/// Default factory: scrypt or BLAKE3 stretching, salts from a DRBG.
pub struct PasswordLockFactory {
    config: LockConfig,
    rng: DrbgRng,
}

impl PasswordLockFactory {
    /// Creates a factory producing `config.kind` locks.
    pub fn new(config: LockConfig, rng: DrbgRng) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Derives the content key gated by `lock`, after checking `password`.
    pub fn key_material(
        &self,
        lock: &Lock,
        password: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>, LockError> {
        let key = open(lock, password)?;
        Ok(derive_subkey(&key, CONTENT_KEY_CONTEXT))
    }

    fn generate(&self, kind: LockKind, cost: ScryptCost, password: &[u8]) -> Result<Lock, LockError> {
        if kind == LockKind::Scrypt {
            cost.validate()?;
        }
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt)?;

        let key = password_key(kind, cost, &salt, password)?;
        let verifier = verifier_for(&key);

        let lock = match kind {
            LockKind::Scrypt => Lock::Scrypt { cost, salt, verifier },
            LockKind::Blake3 => Lock::Blake3 { salt, verifier },
        };
        log::debug!("Generated {:?} lock {}", kind, lock);
        Ok(lock)
    }
}

impl LockFactory for PasswordLockFactory {
    fn generate_lock(&self, password: &[u8]) -> Result<Lock, LockError> {
        self.generate(self.config.kind, self.config.cost, password)
    }

    fn generate_similar(&self, existing: &Lock, password: &[u8]) -> Result<Lock, LockError> {
        let cost = existing.cost().unwrap_or(self.config.cost);
        self.generate(existing.kind(), cost, password)
    }

    fn derive_lock(&self, existing: &[u8], password: &[u8]) -> Result<Lock, LockError> {
        let lock = Lock::from_bytes(existing)?;
        open(&lock, password)?;
        Ok(lock)
    }
}

/// Recomputes the password key of `lock` and checks its verifier.
fn open(lock: &Lock, password: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, LockError> {
    let cost = lock.cost().unwrap_or_default();
    let key = password_key(lock.kind(), cost, lock.salt(), password)?;
    let verifier = verifier_for(&key);

    if bool::from(verifier[..].ct_eq(&lock.verifier()[..])) {
        Ok(key)
    } else {
        Err(LockError::Credential)
    }
}

fn password_key(
    kind: LockKind,
    cost: ScryptCost,
    salt: &[u8; SALT_LEN],
    password: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN]>, LockError> {
    match kind {
        LockKind::Scrypt => {
            let mut key = Zeroizing::new([0u8; KEY_LEN]);
            scrypt::scrypt(password, salt, &cost.params()?, &mut *key)
                .map_err(|_| LockError::Crypto)?;
            Ok(key)
        }
        LockKind::Blake3 => {
            let mut hasher = blake3::Hasher::new_derive_key(BLAKE3_LOCK_CONTEXT);
            hasher.update(salt);
            hasher.update(password);
            Ok(Zeroizing::new(hasher.finalize().into()))
        }
    }
}

fn verifier_for(key: &[u8; KEY_LEN]) -> [u8; VERIFIER_LEN] {
    *derive_subkey(key, VERIFIER_CONTEXT)
}

fn derive_subkey(key: &[u8; KEY_LEN], context: &str) -> Zeroizing<[u8; KEY_LEN]> {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(key);
    Zeroizing::new(hasher.finalize().into())
}
