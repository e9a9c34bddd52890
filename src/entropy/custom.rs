//! Custom User-Provided Entropy Source.
//!
//! Replays caller-injected bytes in order. Seeding a DRBG from a
//! `CustomSource` makes its whole output stream reproducible.

use std::sync::{Mutex, PoisonError};

use zeroize::Zeroizing;

use super::{EntropyError, EntropySource};

/// Source that buffers user-injected entropy.
pub struct CustomSource {
    buffer: Mutex<Zeroizing<Vec<u8>>>,
}

impl CustomSource {
    /// Creates a new empty CustomSource.
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Zeroizing::new(Vec::new())),
        }
    }

    /// Creates a source pre-loaded with `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let source = Self::new();
        source.add_bytes(bytes);
        source
    }

    /// Add entropy bytes to the pool.
    pub fn add_bytes(&self, bytes: &[u8]) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for CustomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for CustomSource {
    fn name(&self) -> &'static str {
        "CustomInput"
    }

    fn fill(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.len() < dest.len() {
            return Err(EntropyError::Exhausted);
        }

        // Drain required bytes; the consumed head is wiped when its owner is replaced.
        let tail = Zeroizing::new(buffer.split_off(dest.len()));
        dest.copy_from_slice(&buffer[..]);
        *buffer = tail;
        Ok(())
    }

    fn entropy_estimate(&self) -> f64 {
        // User input entropy quality is unknown.
        2.0
    }
}
