//! Password-derived locks.
//!
//! A [`Lock`] is an opaque value produced from a password and a fresh salt.
//! It stores a verifier for the password-derived key, never the password.
//! Locks compare equal iff their byte encodings are equal.
//!
//! # Encoding
//! - Scrypt: `0x01 || log_n(1) || r(4) || p(4) || salt(32) || verifier(32)`
//! - Blake3: `0x02 || salt(32) || verifier(32)`
//!
//! Integers are big-endian. Anything else is [`LockError::Malformed`], and so
//! is a scrypt cost above [`MAX_LOG_N`], [`MAX_P`] or [`MAX_MEMORY`].

pub mod factory;

pub use factory::{LockFactory, PasswordLockFactory};

use core::fmt;

use thiserror::Error;

use crate::drbg::DrbgError;

/// Salt length in bytes.
pub const SALT_LEN: usize = 32;
/// Verifier length in bytes.
pub const VERIFIER_LEN: usize = 32;

/// Largest scrypt work factor accepted (2^22 iterations).
pub const MAX_LOG_N: u8 = 22;
/// Largest scrypt parallelism accepted.
pub const MAX_P: u32 = 16;
/// Largest scrypt working memory accepted, `128 * r * 2^log_n` bytes (1 GiB).
pub const MAX_MEMORY: u64 = 1 << 30;

const TAG_SCRYPT: u8 = 0x01;
const TAG_BLAKE3: u8 = 0x02;

const SCRYPT_ENCODED_LEN: usize = 1 + 1 + 4 + 4 + SALT_LEN + VERIFIER_LEN;
const BLAKE3_ENCODED_LEN: usize = 1 + SALT_LEN + VERIFIER_LEN;

/// Errors raised while creating or checking locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
    /// The password does not open the lock.
    #[error("password does not match lock")]
    Credential,
    /// The lock bytes are not a valid encoding.
    #[error("malformed lock encoding")]
    Malformed,
    /// Key derivation failed.
    #[error("key derivation failed")]
    Crypto,
    /// The configured scrypt cost is out of range.
    #[error("scrypt cost out of range")]
    InvalidCost,
    /// Salt generation failed.
    #[error("random generation failed: {0}")]
    Random(#[from] DrbgError),
}

/// Kind of password stretching behind a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// scrypt (memory-hard).
    Scrypt,
    /// BLAKE3 key derivation (fast; session-scoped secrets).
    Blake3,
}

/// scrypt cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScryptCost {
    /// log2 of the CPU/memory cost N.
    pub log_n: u8,
    /// Block size.
    pub r: u32,
    /// Parallelism.
    pub p: u32,
}

impl ScryptCost {
    /// Working memory scrypt needs for this cost, in bytes.
    pub fn memory(&self) -> u64 {
        let n = 1u64.checked_shl(u32::from(self.log_n)).unwrap_or(u64::MAX);
        128u64.saturating_mul(u64::from(self.r)).saturating_mul(n)
    }

    /// Checks the cost against scrypt's own limits and the local work caps.
    pub fn validate(&self) -> Result<(), LockError> {
        self.params().map(|_| ())
    }

    pub(crate) fn params(&self) -> Result<scrypt::Params, LockError> {
        if self.log_n > MAX_LOG_N || self.p > MAX_P || self.memory() > MAX_MEMORY {
            return Err(LockError::InvalidCost);
        }
        scrypt::Params::new(self.log_n, self.r, self.p, scrypt::Params::RECOMMENDED_LEN)
            .map_err(|_| LockError::InvalidCost)
    }
}

impl Default for ScryptCost {
    // N=32768 (2^15), r=8, p=1
    fn default() -> Self {
        Self {
            log_n: 15,
            r: 8,
            p: 1,
        }
    }
}

/// An opaque password-derived lock.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Lock {
    /// scrypt-stretched password.
    Scrypt {
        /// Cost the verifier was derived with.
        cost: ScryptCost,
        /// Per-lock salt.
        salt: [u8; SALT_LEN],
        /// Verifier of the password key.
        verifier: [u8; VERIFIER_LEN],
    },
    /// BLAKE3-derived password key.
    Blake3 {
        /// Per-lock salt.
        salt: [u8; SALT_LEN],
        /// Verifier of the password key.
        verifier: [u8; VERIFIER_LEN],
    },
}

impl Lock {
    /// Lock kind.
    pub fn kind(&self) -> LockKind {
        match self {
            Self::Scrypt { .. } => LockKind::Scrypt,
            Self::Blake3 { .. } => LockKind::Blake3,
        }
    }

    /// scrypt cost, for scrypt locks.
    pub fn cost(&self) -> Option<ScryptCost> {
        match self {
            Self::Scrypt { cost, .. } => Some(*cost),
            Self::Blake3 { .. } => None,
        }
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        match self {
            Self::Scrypt { salt, .. } | Self::Blake3 { salt, .. } => salt,
        }
    }

    pub fn verifier(&self) -> &[u8; VERIFIER_LEN] {
        match self {
            Self::Scrypt { verifier, .. } | Self::Blake3 { verifier, .. } => verifier,
        }
    }

    /// Serializes the lock.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Scrypt { cost, salt, verifier } => {
                let mut out = Vec::with_capacity(SCRYPT_ENCODED_LEN);
                out.push(TAG_SCRYPT);
                out.push(cost.log_n);
                out.extend_from_slice(&cost.r.to_be_bytes());
                out.extend_from_slice(&cost.p.to_be_bytes());
                out.extend_from_slice(salt);
                out.extend_from_slice(verifier);
                out
            }
            Self::Blake3 { salt, verifier } => {
                let mut out = Vec::with_capacity(BLAKE3_ENCODED_LEN);
                out.push(TAG_BLAKE3);
                out.extend_from_slice(salt);
                out.extend_from_slice(verifier);
                out
            }
        }
    }

    /// Parses a serialized lock.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LockError> {
        match bytes.first() {
            Some(&TAG_SCRYPT) if bytes.len() == SCRYPT_ENCODED_LEN => {
                let cost = ScryptCost {
                    log_n: bytes[1],
                    r: u32::from_be_bytes(array(&bytes[2..6])?),
                    p: u32::from_be_bytes(array(&bytes[6..10])?),
                };
                cost.validate().map_err(|_| LockError::Malformed)?;
                Ok(Self::Scrypt {
                    cost,
                    salt: array(&bytes[10..10 + SALT_LEN])?,
                    verifier: array(&bytes[10 + SALT_LEN..])?,
                })
            }
            Some(&TAG_BLAKE3) if bytes.len() == BLAKE3_ENCODED_LEN => Ok(Self::Blake3 {
                salt: array(&bytes[1..1 + SALT_LEN])?,
                verifier: array(&bytes[1 + SALT_LEN..])?,
            }),
            _ => Err(LockError::Malformed),
        }
    }

    /// Short hex identifier safe for logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.verifier()[..8])
    }
}

fn array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], LockError> {
    bytes.try_into().map_err(|_| LockError::Malformed)
}

impl fmt::Display for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lock({:?}, {})", self.kind(), self.fingerprint())
    }
}
