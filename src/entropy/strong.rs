//! The process-wide strong entropy source.
//!
//! `StrongEntropy` is built exactly once by the application's composition
//! root and shared by `Arc` with every [`RandomFactory`](crate::random::RandomFactory).
//! A health-tested start-up sample gates construction: a source that cannot
//! produce it is reported as [`EntropyError::Unavailable`] and never retried.

use std::sync::{Mutex, PoisonError};

use zeroize::Zeroizing;

use super::{EntropyError, EntropySource, HealthTester, OsSource};

/// Bytes drawn and health-tested before the source is accepted.
pub const STARTUP_SAMPLE_LEN: usize = 1024;

/// Health-tested wrapper around the platform-strong source.
pub struct StrongEntropy {
    source: Box<dyn EntropySource>,
    tester: Mutex<HealthTester>,
}

impl StrongEntropy {
    /// Initializes the strong source from the operating system CSPRNG.
    pub fn system() -> Result<Self, EntropyError> {
        Self::with_source(Box::new(OsSource))
    }

    /// Initializes the strong source from an explicit backend.
    pub fn with_source(source: Box<dyn EntropySource>) -> Result<Self, EntropyError> {
        let mut tester = HealthTester::new();
        let mut sample = Zeroizing::new(vec![0u8; STARTUP_SAMPLE_LEN]);

        if let Err(e) = source.fill(&mut sample) {
            log::warn!("Strong entropy: source {} failed start-up fill: {}", source.name(), e);
            return Err(EntropyError::Unavailable);
        }
        if tester.feed_all(&sample).is_err() {
            log::warn!("Strong entropy: source {} failed start-up health tests", source.name());
            return Err(EntropyError::Unavailable);
        }

        log::info!(
            "Strong entropy initialized from {} (~{:.1} bits/byte)",
            source.name(),
            source.entropy_estimate()
        );
        Ok(Self {
            source,
            tester: Mutex::new(tester),
        })
    }

    /// Name of the backing source.
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

impl EntropySource for StrongEntropy {
    fn name(&self) -> &'static str {
        "StrongEntropy"
    }

    fn fill(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        self.source.fill(dest)?;
        let mut tester = self.tester.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = tester.feed_all(dest) {
            log::warn!("Strong entropy: continuous health test failed on {}", self.source.name());
            zeroize::Zeroize::zeroize(dest);
            *tester = HealthTester::new();
            return Err(e);
        }
        Ok(())
    }

    fn entropy_estimate(&self) -> f64 {
        self.source.entropy_estimate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::CustomSource;

    struct StuckSource;

    impl EntropySource for StuckSource {
        fn name(&self) -> &'static str {
            "Stuck"
        }
        fn fill(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
            dest.fill(0x5A);
            Ok(())
        }
        fn entropy_estimate(&self) -> f64 {
            8.0
        }
    }

    #[test]
    fn test_system_source_initializes() {
        let strong = StrongEntropy::system().unwrap();
        assert_eq!(strong.source_name(), "OsRng");

        let mut buf = [0u8; 64];
        strong.fill(&mut buf).unwrap();
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_stuck_source_is_unavailable() {
        let result = StrongEntropy::with_source(Box::new(StuckSource));
        assert!(matches!(result, Err(EntropyError::Unavailable)));
    }

    #[test]
    fn test_short_source_is_unavailable() {
        let short = CustomSource::from_bytes(&[1, 2, 3]);
        let result = StrongEntropy::with_source(Box::new(short));
        assert!(matches!(result, Err(EntropyError::Unavailable)));
    }

    #[test]
    fn test_continuous_failure_wipes_output() {
        let mut bytes: Vec<u8> = (0..STARTUP_SAMPLE_LEN as u32)
            .map(|i| (i.wrapping_mul(97) % 251) as u8)
            .collect();
        bytes.extend_from_slice(&[0x77; 16]);
        let strong = StrongEntropy::with_source(Box::new(CustomSource::from_bytes(&bytes))).unwrap();

        let mut out = [0xFFu8; 16];
        assert_eq!(strong.fill(&mut out), Err(EntropyError::HealthTestFailed));
        assert_eq!(out, [0u8; 16]);
    }
}
