//! Password locks backed by a Hash-DRBG.
//!
//! The composition root builds one [`StrongEntropy`], hands it to a
//! [`RandomFactory`], and wires the resulting generators into a
//! [`LockManager`] together with a [`DialogController`].

pub mod config;
pub mod dialog;
pub mod drbg;
pub mod entropy;
pub mod lock;
pub mod manager;
pub mod random;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use config::{DrbgConfig, LockConfig, PasslockConfig};
pub use dialog::{DialogController, DialogGuard, ScriptedDialog};
pub use drbg::{DrbgError, Generate, HashDrbg, HashPrimitive};
pub use entropy::{EntropyError, EntropySource, StrongEntropy};
pub use lock::{Lock, LockError, LockFactory, LockKind, PasswordLockFactory, ScryptCost};
pub use manager::{LockManager, ManagerError};
pub use random::{DrbgHash, DrbgRng, RandomFactory};
pub use session::{ChaChaSessionKey, SessionError, SessionKey};
