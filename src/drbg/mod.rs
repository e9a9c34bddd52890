//! Hash-based Deterministic Random Bit Generator.
//!
//! An SP 800-90A (Section 10.1.1) style Hash-DRBG over a selectable hash or
//! keyed-hash primitive.
//!
//! # Limits
//! - At most [`MAX_BITS_PER_REQUEST`] bits per `generate` call; larger requests
//!   are a caller error.
//! - After [`RESEED_INTERVAL`] generate calls the engine refuses to produce
//!   output and answers [`Generate::ReseedRequired`] until it is reseeded.
//!
//! # State update
//! All updates of `V` are big-endian additions modulo `2^(8 * seedlen)` with
//! full carry propagation. Replacing them with XOR or per-byte wrapping adds
//! silently changes the output distribution.

mod arith;
pub mod hash_drbg;
pub mod primitive;

pub use hash_drbg::{hash_df, HashDrbg};
pub use primitive::HashPrimitive;

use thiserror::Error;

use crate::entropy::EntropyError;

/// Maximum number of bits a single `generate` call may return (2^18).
pub const MAX_BITS_PER_REQUEST: u64 = 1 << 18;

/// Maximum number of bytes a single `generate` call may return.
pub const MAX_BYTES_PER_REQUEST: usize = (MAX_BITS_PER_REQUEST / 8) as usize;

/// Reseed counter ceiling (2^47).
pub const RESEED_INTERVAL: u64 = 1 << 47;

/// Errors raised by the DRBG engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DrbgError {
    /// The output buffer asks for more than [`MAX_BITS_PER_REQUEST`] bits.
    #[error("requested {requested_bits} bits, at most {} allowed per call", MAX_BITS_PER_REQUEST)]
    RequestTooLarge {
        /// Bits implied by the output buffer length.
        requested_bits: u64,
    },
    /// The entropy source failed while (re)seeding.
    #[error("entropy source failure: {0}")]
    Entropy(#[from] EntropyError),
}

/// Outcome of a `generate` call.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generate {
    /// The output buffer was filled with this many bits.
    Generated(u64),
    /// The reseed counter reached [`RESEED_INTERVAL`]; reseed and retry.
    ReseedRequired,
}
