//! Operating system CSPRNG source.

use rand_core::{OsRng, RngCore};

use super::{EntropyError, EntropySource};

/// System-provided cryptographically secure random number generator
/// (`getrandom` on Linux, `getentropy` on macOS, `BCryptGenRandom` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSource;

impl EntropySource for OsSource {
    fn name(&self) -> &'static str {
        "OsRng"
    }

    fn fill(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng.try_fill_bytes(dest).map_err(|_| EntropyError::SourceFailed)
    }

    fn entropy_estimate(&self) -> f64 {
        8.0
    }
}
