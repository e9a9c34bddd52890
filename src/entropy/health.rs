//! NIST SP 800-90B Health Tests.
//!
//! Continuous health monitoring for raw entropy as per NIST SP 800-90B.
//!
//! # Tests
//! - Repetition Count Test: Detects catastrophic failures where the source becomes stuck.
//! - Adaptive Proportion Test: Detects if a value becomes too common.

use super::EntropyError;

// For H=4.0 (min-entropy per byte), alpha=2^-20:
// C = 1 + ceil(20 / H) = 6, with safety margin 10.
const RCT_CUTOFF: usize = 10;

const APT_WINDOW: usize = 512;
// C ≈ W * (1/2^H + 2.576 * sqrt((1 - 1/2^H) / (W * 2^H))) ≈ 39, rounded up.
const APT_CUTOFF: usize = 50;

/// Health tester for entropy sources.
#[derive(Debug, Clone)]
pub struct HealthTester {
    // Repetition Count Test state
    last_sample: Option<u8>,
    repetition_count: usize,

    // Adaptive Proportion Test state
    window_count: usize,
    sample_value: u8,
    sample_count: usize,
}

impl HealthTester {
    /// Creates a new health tester.
    pub fn new() -> Self {
        Self {
            last_sample: None,
            repetition_count: 0,
            window_count: 0,
            sample_value: 0,
            sample_count: 0,
        }
    }

    /// Feeds a byte sample into the health tests.
    ///
    /// # Returns
    /// * `Ok(())` if tests pass.
    /// * `Err(EntropyError::HealthTestFailed)` if a failure is detected.
    pub fn feed(&mut self, sample: u8) -> Result<(), EntropyError> {
        self.check_repetition_count(sample)?;
        self.check_adaptive_proportion(sample)?;
        Ok(())
    }

    /// Feeds every byte of `samples`.
    pub fn feed_all(&mut self, samples: &[u8]) -> Result<(), EntropyError> {
        samples.iter().try_for_each(|&s| self.feed(s))
    }

    /// Repetition Count Test (RCT)
    fn check_repetition_count(&mut self, sample: u8) -> Result<(), EntropyError> {
        if self.last_sample == Some(sample) {
            self.repetition_count += 1;
            if self.repetition_count >= RCT_CUTOFF {
                return Err(EntropyError::HealthTestFailed);
            }
        } else {
            self.last_sample = Some(sample);
            self.repetition_count = 1;
        }
        Ok(())
    }

    /// Adaptive Proportion Test (APT)
    fn check_adaptive_proportion(&mut self, sample: u8) -> Result<(), EntropyError> {
        if self.window_count == 0 {
            self.sample_value = sample;
            self.sample_count = 1;
            self.window_count = 1;
            return Ok(());
        }

        if sample == self.sample_value {
            self.sample_count += 1;
        }
        self.window_count += 1;

        if self.window_count >= APT_WINDOW {
            if self.sample_count >= APT_CUTOFF {
                return Err(EntropyError::HealthTestFailed);
            }
            self.window_count = 0;
        }
        Ok(())
    }
}

impl Default for HealthTester {
    fn default() -> Self {
        Self::new()
    }
}
