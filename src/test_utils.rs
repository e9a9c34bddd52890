//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::LockConfig;
use crate::dialog::DialogController;
use crate::drbg::{HashDrbg, HashPrimitive};
use crate::entropy::{EntropySource, OsSource};
use crate::lock::{LockKind, PasswordLockFactory, ScryptCost};
use crate::random::DrbgRng;

/// SHA-256 generator straight over the OS source.
pub(crate) fn system_rng() -> DrbgRng {
    let source: Arc<dyn EntropySource> = Arc::new(OsSource);
    let drbg = HashDrbg::new(HashPrimitive::Sha256, source, b"passlock tests", b"iv").unwrap();
    DrbgRng::new(Arc::new(drbg), false)
}

/// Factory with a cheap scrypt cost.
pub(crate) fn fast_factory(kind: LockKind) -> PasswordLockFactory {
    PasswordLockFactory::new(
        LockConfig {
            kind,
            cost: ScryptCost { log_n: 4, r: 8, p: 1 },
        },
        system_rng(),
    )
}

/// Dialog keeping every password buffer it ever handed out.
///
/// It never wipes anything itself, so whatever is zero afterwards was wiped by
/// the caller.
pub(crate) struct RecordingDialog {
    answers: VecDeque<Vec<u8>>,
    handed_out: Vec<Vec<u8>>,
}

impl RecordingDialog {
    pub(crate) fn new<I, P>(answers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        Self {
            answers: answers.into_iter().map(|a| a.as_ref().to_vec()).collect(),
            handed_out: Vec::new(),
        }
    }

    pub(crate) fn handed_out(&self) -> usize {
        self.handed_out.len()
    }

    pub(crate) fn all_wiped(&self) -> bool {
        self.handed_out.iter().flatten().all(|&b| b == 0)
    }
}

impl DialogController for RecordingDialog {
    fn create_dialog(&mut self, _title: &str, _needs_confirmation: bool) {}

    fn show_dialog(&mut self) -> bool {
        match self.answers.pop_front() {
            Some(answer) => {
                self.handed_out.push(answer);
                true
            }
            None => false,
        }
    }

    fn password(&mut self) -> &mut [u8] {
        self.handed_out.last_mut().map(Vec::as_mut_slice).unwrap_or_default()
    }

    fn report_bad_password(&mut self) {}

    fn release_dialog(&mut self) {}
}
