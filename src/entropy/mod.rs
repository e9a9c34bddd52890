//! Entropy collection module.
//!
//! This module defines the interface for entropy sources and owns the
//! process-wide strong source that seeds every DRBG built by the random
//! factory.
//!
//! # Design
//! - **Injectable**: [`StrongEntropy`] is constructed once by the composition
//!   root and handed out as `Arc`; there is no hidden global.
//! - **Health-Tested**: the strong source runs SP 800-90B style health tests at
//!   start-up and on every fill.
//! - **Shared**: sources take `&self` and are `Send + Sync`, so several DRBG
//!   instances can draw from one source concurrently.

pub mod custom;
pub mod health;
pub mod strong;
pub mod system;

pub use custom::CustomSource;
pub use health::HealthTester;
pub use strong::StrongEntropy;
pub use system::OsSource;

use thiserror::Error;

/// Error types for entropy collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntropyError {
    /// The strong source could not be initialized.
    #[error("strong entropy source unavailable")]
    Unavailable,
    /// Source is exhausted (e.g., fixed buffer).
    #[error("entropy source exhausted")]
    Exhausted,
    /// Health test failure (SP 800-90B).
    #[error("entropy health test failed")]
    HealthTestFailed,
    /// The underlying platform generator reported an error.
    #[error("entropy source failed")]
    SourceFailed,
}

/// A trait for entropy sources.
pub trait EntropySource: Send + Sync {
    /// Returns a unique identifier for the source.
    fn name(&self) -> &'static str;

    /// Fills `dest` with random bytes from the source.
    ///
    /// # Returns
    /// * `Ok(())` on success.
    /// * `Err(EntropyError)` if the source fails.
    fn fill(&self, dest: &mut [u8]) -> Result<(), EntropyError>;

    /// Returns the estimated entropy per byte (in bits, 0.0-8.0).
    fn entropy_estimate(&self) -> f64;
}
