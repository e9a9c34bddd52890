//! Hash-DRBG engine (NIST SP 800-90A Section 10.1.1).
//!
//! The engine owns its `V`/`C` state and reseed counter behind a mutex, so a
//! single instance can be shared by concurrent callers; `generate` and
//! `reseed` never interleave on one engine.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use zeroize::Zeroizing;

use super::arith::{add_be, add_be_u64};
use super::{DrbgError, Generate, HashPrimitive, MAX_BITS_PER_REQUEST, RESEED_INTERVAL};
use crate::entropy::EntropySource;

/// Mutable working state. Zeroized on drop through its `Zeroizing` buffers.
struct DrbgState {
    /// State value V (seedlen bytes).
    v: Zeroizing<Vec<u8>>,
    /// Constant C (seedlen bytes).
    c: Zeroizing<Vec<u8>>,
    /// Number of generate requests since last (re)seed.
    reseed_counter: u64,
}

impl DrbgState {
    /// V = Hash_df(seed_material), C = Hash_df(0x00 || V), counter = 1.
    fn derive(primitive: &HashPrimitive, seed_material: &[&[u8]]) -> Self {
        let seed_len_bits = primitive.seed_len() * 8;
        let v = hash_df(primitive, seed_material, seed_len_bits);
        let c = hash_df(primitive, &[&[0x00], &v], seed_len_bits);
        Self {
            v,
            c,
            reseed_counter: 1,
        }
    }
}

/// Hash_df: hash derivation function (SP 800-90A Section 10.3.1).
///
/// Concatenates `Hash(counter || be32(seed_len_bits) || seed_material)` for
/// counter = 1, 2, ... and truncates to `seed_len_bits / 8` bytes.
pub fn hash_df(
    primitive: &HashPrimitive,
    seed_material: &[&[u8]],
    seed_len_bits: usize,
) -> Zeroizing<Vec<u8>> {
    let out_len = seed_len_bits / 8;
    let bits = (seed_len_bits as u32).to_be_bytes();
    let mut temp = Zeroizing::new(Vec::with_capacity(out_len + primitive.output_len()));
    let mut counter: u8 = 1;

    while temp.len() < out_len {
        let counter_byte = [counter];
        let mut parts: Vec<&[u8]> = Vec::with_capacity(2 + seed_material.len());
        parts.push(&counter_byte);
        parts.push(&bits);
        parts.extend_from_slice(seed_material);

        temp.extend_from_slice(&primitive.digest(&parts));
        counter = counter.wrapping_add(1);
    }

    temp.truncate(out_len);
    temp
}

/// Hashgen: stretches `v` to `out_len` bytes (SP 800-90A Section 10.1.1.4).
fn hashgen(primitive: &HashPrimitive, v: &[u8], out_len: usize) -> Zeroizing<Vec<u8>> {
    let mut data = Zeroizing::new(v.to_vec());
    let mut result = Zeroizing::new(Vec::with_capacity(out_len + primitive.output_len()));

    while result.len() < out_len {
        result.extend_from_slice(&primitive.digest(&[&data]));
        // data = (data + 1) mod 2^seedlen
        add_be_u64(&mut data, 1);
    }

    result.truncate(out_len);
    result
}

/// Hash-DRBG context.
pub struct HashDrbg {
    primitive: HashPrimitive,
    entropy: Arc<dyn EntropySource>,
    state: Mutex<DrbgState>,
}

impl HashDrbg {
    /// Instantiates the DRBG.
    ///
    /// Seed material is `entropy || init_vector || personalization`, where
    /// `entropy` is drawn fresh from `entropy_source`.
    pub fn new(
        primitive: HashPrimitive,
        entropy_source: Arc<dyn EntropySource>,
        personalization: &[u8],
        init_vector: &[u8],
    ) -> Result<Self, DrbgError> {
        let mut entropy = Zeroizing::new(vec![0u8; primitive.entropy_len()]);
        entropy_source.fill(&mut entropy)?;

        let state = DrbgState::derive(&primitive, &[&entropy, init_vector, personalization]);
        log::info!(
            "Hash-DRBG instantiated: {} seeded from {}",
            primitive.name(),
            entropy_source.name()
        );

        Ok(Self {
            primitive,
            entropy: entropy_source,
            state: Mutex::new(state),
        })
    }

    /// The primitive this engine hashes with.
    pub fn primitive(&self) -> &HashPrimitive {
        &self.primitive
    }

    /// Number of generate calls since the last (re)seed, plus one.
    pub fn reseed_counter(&self) -> u64 {
        self.lock_state().reseed_counter
    }

    /// Reseeds from fresh entropy (SP 800-90A Section 10.1.1.3).
    ///
    /// V = Hash_df(0x01 || V || entropy || extra), C is re-derived from the
    /// new V and the reseed counter returns to 1.
    pub fn reseed(&self, extra: Option<&[u8]>) -> Result<(), DrbgError> {
        let mut state = self.lock_state();
        self.reseed_locked(&mut state, extra.unwrap_or(&[]))
    }

    /// Fills `output` with pseudorandom bytes (SP 800-90A Section 10.1.1.4).
    ///
    /// With `prediction_resistant` the engine reseeds first, folding `extra`
    /// into the reseed. Otherwise non-empty `extra` bytes are mixed into V
    /// with a single hash update.
    ///
    /// Returns [`Generate::ReseedRequired`] without touching `output` once the
    /// reseed counter has reached [`RESEED_INTERVAL`].
    pub fn generate(
        &self,
        output: &mut [u8],
        extra: Option<&[u8]>,
        prediction_resistant: bool,
    ) -> Result<Generate, DrbgError> {
        let requested_bits = output.len() as u64 * 8;
        if requested_bits > MAX_BITS_PER_REQUEST {
            return Err(DrbgError::RequestTooLarge { requested_bits });
        }

        let mut guard = self.lock_state();
        if guard.reseed_counter >= RESEED_INTERVAL {
            return Ok(Generate::ReseedRequired);
        }

        if prediction_resistant {
            self.reseed_locked(&mut guard, extra.unwrap_or(&[]))?;
        } else if let Some(extra) = extra.filter(|e| !e.is_empty()) {
            // V = (V + Hash(0x02 || V || extra)) mod 2^seedlen
            let w = self.primitive.digest(&[&[0x02], &guard.v, extra]);
            add_be(&mut guard.v, &w);
        }

        let state = &mut *guard;
        let stretched = hashgen(&self.primitive, &state.v, output.len());

        // V = (V + Hash(0x03 || V) + C + reseed_counter) mod 2^seedlen
        let h = self.primitive.digest(&[&[0x03], &state.v]);
        add_be(&mut state.v, &h);
        add_be(&mut state.v, &state.c);
        add_be_u64(&mut state.v, state.reseed_counter);
        state.reseed_counter += 1;

        output.copy_from_slice(&stretched);
        Ok(Generate::Generated(requested_bits))
    }

    fn reseed_locked(&self, state: &mut DrbgState, extra: &[u8]) -> Result<(), DrbgError> {
        let mut entropy = Zeroizing::new(vec![0u8; self.primitive.entropy_len()]);
        self.entropy.fill(&mut entropy)?;

        *state = DrbgState::derive(&self.primitive, &[&[0x01], &state.v, &entropy, extra]);
        log::debug!("Hash-DRBG ({}) reseeded", self.primitive.name());
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, DrbgState> {
        // Every mutation of the state completes before anything that can panic.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn set_reseed_counter(&self, counter: u64) {
        self.lock_state().reseed_counter = counter;
    }
}

impl fmt::Debug for HashDrbg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashDrbg")
            .field("primitive", &self.primitive)
            .field("entropy", &self.entropy.name())
            .finish_non_exhaustive()
    }
}
