//! Limit-enforcing generator over a shared Hash-DRBG.
//!
//! Callers ask for any number of bytes; `DrbgRng` splits the request into
//! chunks the engine accepts and reseeds whenever the engine reports its
//! reseed interval is used up.

use std::sync::Arc;

use rand_core::{CryptoRng, RngCore};

use crate::drbg::{DrbgError, Generate, HashDrbg, MAX_BYTES_PER_REQUEST};

/// Cloneable handle to a shared DRBG.
#[derive(Debug, Clone)]
pub struct DrbgRng {
    drbg: Arc<HashDrbg>,
    prediction_resistant: bool,
}

impl DrbgRng {
    /// Wraps an engine.
    pub fn new(drbg: Arc<HashDrbg>, prediction_resistant: bool) -> Self {
        Self {
            drbg,
            prediction_resistant,
        }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Arc<HashDrbg> {
        &self.drbg
    }

    /// Fills `dest` with pseudorandom bytes, of any length.
    pub fn fill(&self, dest: &mut [u8]) -> Result<(), DrbgError> {
        for chunk in dest.chunks_mut(MAX_BYTES_PER_REQUEST) {
            self.fill_chunk(chunk)?;
        }
        Ok(())
    }

    fn fill_chunk(&self, chunk: &mut [u8]) -> Result<(), DrbgError> {
        loop {
            match self.drbg.generate(chunk, None, self.prediction_resistant)? {
                Generate::Generated(_) => return Ok(()),
                Generate::ReseedRequired => {
                    log::debug!("DRBG reseed interval reached; reseeding");
                    self.drbg.reseed(None)?;
                }
            }
        }
    }
}

impl RngCore for DrbgRng {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        // Same contract as OsRng: no error channel here.
        if let Err(e) = self.fill(dest) {
            panic!("DRBG failure: {}", e);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill(dest).map_err(rand_core::Error::new)
    }
}

impl CryptoRng for DrbgRng {}
