//! Configuration management for passlock.
//!
//! Defines the structure for user-configurable settings.

use crate::lock::{LockKind, ScryptCost};
use crate::random::DrbgHash;

/// Main configuration structure for the passlock library.
///
/// This struct should be populated by the host application and passed to
/// [`RandomFactory::new`](crate::random::RandomFactory::new) and
/// [`LockManager::from_config`](crate::manager::LockManager::from_config).
#[derive(Debug, Clone, Default)]
pub struct PasslockConfig {
    /// DRBG settings.
    pub drbg: DrbgConfig,

    /// Lock creation settings.
    pub lock: LockConfig,
}

/// Configuration of the random factory.
#[derive(Debug, Clone, Default)]
pub struct DrbgConfig {
    /// Hash used by DRBGs the factory builds by default.
    pub hash: DrbgHash,

    /// Reseed before every request. Always on with the `paranoid` feature.
    pub prediction_resistance: bool,

    /// Caller seed mixed into every personalization string.
    pub personalization: Vec<u8>,
}

/// Configuration of newly generated locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// Kind of lock produced by `generate_lock`.
    pub kind: LockKind,

    /// scrypt cost for [`LockKind::Scrypt`] locks.
    pub cost: ScryptCost,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            kind: LockKind::Scrypt,
            cost: ScryptCost::default(),
        }
    }
}
