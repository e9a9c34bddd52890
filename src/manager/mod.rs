//! Lock Manager.
//!
//! Creates, caches and resolves password locks for the application.
//!
//! # Resolution
//! 1. **Cache**: a lock already in the cache is returned as is.
//! 2. **Known passwords**: every distinct cached password is tried once
//!    against the lock before the user is bothered.
//! 3. **Dialog**: the user is prompted until a password opens the lock or
//!    the dialog is cancelled.
//!
//! Cached passwords are sealed under the session key. The cache mutex is only
//! held for lookups and inserts, never while the dialog or a key derivation
//! runs.

mod cache;

use std::sync::{Mutex, MutexGuard, PoisonError};

use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::PasslockConfig;
use crate::dialog::{DialogController, DialogGuard};
use crate::drbg::DrbgError;
use crate::lock::{Lock, LockError, LockFactory, PasswordLockFactory};
use crate::random::RandomFactory;
use crate::session::{ChaChaSessionKey, SessionError, SessionKey};

use cache::LockCache;

/// Errors returned by the lock manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// No known or entered password opened the lock.
    #[error("invalid password")]
    InvalidPassword,
    /// The lock was never resolved by this manager.
    #[error("lock not known to this manager")]
    UnknownLock,
    /// Lock decoding or derivation failed.
    #[error(transparent)]
    Lock(#[from] LockError),
    /// Sealing or opening a cached password failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Random generation failed.
    #[error(transparent)]
    Random(#[from] DrbgError),
}

/// Outcome of one dialog round.
enum Attempt {
    Resolved(Lock),
    Rejected,
    Cancelled,
}

/// Password lock manager.
pub struct LockManager<F, D, S = ChaChaSessionKey> {
    factory: F,
    dialog: Mutex<D>,
    session: S,
    cache: LockCache,
}

impl<D: DialogController> LockManager<PasswordLockFactory, D, ChaChaSessionKey> {
    /// Builds a manager with the default factory and a fresh session key,
    /// both drawing from `random`.
    pub fn from_config(
        config: &PasslockConfig,
        random: &RandomFactory,
        dialog: D,
    ) -> Result<Self, ManagerError> {
        let factory = PasswordLockFactory::new(config.lock, random.rng()?);
        let session = ChaChaSessionKey::generate(random.rng()?)?;
        Ok(Self::new(factory, dialog, session))
    }
}

impl<F, D, S> LockManager<F, D, S>
where
    F: LockFactory,
    D: DialogController,
    S: SessionKey,
{
    pub fn new(factory: F, dialog: D, session: S) -> Self {
        Self {
            factory,
            dialog: Mutex::new(dialog),
            session,
            cache: LockCache::default(),
        }
    }

    /// Prompts for a new password (with confirmation) and locks it.
    pub fn new_lock(&self, source_label: &str) -> Result<Lock, ManagerError> {
        self.resolve_lock(None, source_label)
    }

    /// Resolves `existing` lock bytes, or creates a new lock when `None`.
    ///
    /// `source_label` titles the dialog if one is needed.
    pub fn resolve_lock(
        &self,
        existing: Option<&[u8]>,
        source_label: &str,
    ) -> Result<Lock, ManagerError> {
        if let Some(bytes) = existing {
            let lock = Lock::from_bytes(bytes)?;
            if self.cache.contains(&lock) {
                log::debug!("Lock {} found in cache", lock);
                return Ok(lock);
            }
            if let Some(lock) = self.try_known_passwords(bytes)? {
                log::debug!("Lock {} opened with a known password", lock);
                return Ok(lock);
            }
        }

        let mut dialog = self.dialog.lock().unwrap_or_else(PoisonError::into_inner);
        let mut guard = DialogGuard::open(&mut *dialog, source_label, existing.is_none());
        loop {
            match self.attempt(&mut guard, existing)? {
                Attempt::Resolved(lock) => return Ok(lock),
                Attempt::Rejected => guard.report_bad_password(),
                Attempt::Cancelled => break,
            }
        }
        drop(guard);

        log::warn!("No password resolved lock for {}", source_label);
        Err(ManagerError::InvalidPassword)
    }

    /// Creates a fresh lock from the password behind `existing`, with the
    /// same kind and cost as `existing`.
    ///
    /// `existing` must have been created or resolved by this manager.
    pub fn similar_lock(&self, existing: &Lock) -> Result<Lock, ManagerError> {
        let sealed = self
            .cache
            .sealed_password(existing)
            .ok_or(ManagerError::UnknownLock)?;
        let password = self.session.decrypt(&sealed)?;

        let lock = self.factory.generate_similar(existing, &password)?;
        self.remember(&lock, &password)?;
        log::debug!("Lock {} created alongside {}", lock, existing);
        Ok(lock)
    }

    /// Number of cached locks.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `lock` has been created or resolved by this manager.
    pub fn contains(&self, lock: &Lock) -> bool {
        self.cache.contains(lock)
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Exclusive access to the dialog controller.
    ///
    /// Blocks while a resolution is prompting.
    pub fn dialog(&self) -> MutexGuard<'_, D> {
        self.dialog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_known_passwords(&self, bytes: &[u8]) -> Result<Option<Lock>, ManagerError> {
        let mut tried: Vec<Zeroizing<Vec<u8>>> = Vec::new();

        for sealed in self.cache.sealed_passwords() {
            let password = self.session.decrypt(&sealed)?;
            if tried.iter().any(|t| bool::from(t[..].ct_eq(&password[..]))) {
                continue;
            }
            match self.factory.derive_lock(bytes, &password) {
                Ok(lock) => {
                    self.remember(&lock, &password)?;
                    return Ok(Some(lock));
                }
                Err(LockError::Credential) => tried.push(password),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    fn attempt(
        &self,
        guard: &mut DialogGuard<'_, D>,
        existing: Option<&[u8]>,
    ) -> Result<Attempt, ManagerError> {
        if !guard.show() {
            return Ok(Attempt::Cancelled);
        }
        let password = guard.take_password();

        let result = match existing {
            Some(bytes) => self.factory.derive_lock(bytes, &password),
            None => self.factory.generate_lock(&password),
        };
        match result {
            Ok(lock) => {
                self.remember(&lock, &password)?;
                Ok(Attempt::Resolved(lock))
            }
            Err(LockError::Credential) => {
                log::warn!("Entered password does not open the lock");
                Ok(Attempt::Rejected)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remember(&self, lock: &Lock, password: &[u8]) -> Result<(), ManagerError> {
        let sealed = self.session.encrypt(password)?;
        self.cache.insert(lock.clone(), sealed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use crate::config::LockConfig;
    use crate::dialog::ScriptedDialog;
    use crate::entropy::StrongEntropy;
    use crate::lock::{LockKind, ScryptCost};
    use crate::test_utils::{fast_factory, system_rng, RecordingDialog};

    fn manager<D: DialogController>(kind: LockKind, dialog: D) -> LockManager<PasswordLockFactory, D> {
        let session = ChaChaSessionKey::generate(system_rng()).unwrap();
        LockManager::new(fast_factory(kind), dialog, session)
    }

    /// Counts factory calls.
    struct CountingFactory {
        inner: PasswordLockFactory,
        generates: AtomicUsize,
        derives: AtomicUsize,
    }

    impl CountingFactory {
        fn new(kind: LockKind) -> Self {
            Self {
                inner: fast_factory(kind),
                generates: AtomicUsize::new(0),
                derives: AtomicUsize::new(0),
            }
        }
    }

    impl LockFactory for CountingFactory {
        fn generate_lock(&self, password: &[u8]) -> Result<Lock, LockError> {
            self.generates.fetch_add(1, Ordering::SeqCst);
            self.inner.generate_lock(password)
        }

        fn generate_similar(&self, existing: &Lock, password: &[u8]) -> Result<Lock, LockError> {
            self.generates.fetch_add(1, Ordering::SeqCst);
            self.inner.generate_similar(existing, password)
        }

        fn derive_lock(&self, existing: &[u8], password: &[u8]) -> Result<Lock, LockError> {
            self.derives.fetch_add(1, Ordering::SeqCst);
            self.inner.derive_lock(existing, password)
        }
    }

    #[test]
    fn test_new_lock_prompts_with_confirmation() {
        let m = manager(LockKind::Scrypt, ScriptedDialog::new(["open sesame"]));
        assert!(m.is_empty());

        let lock = m.new_lock("archive.zip").unwrap();
        assert!(m.contains(&lock));
        assert_eq!(m.len(), 1);

        let dialog = m.dialog();
        assert_eq!(dialog.last_title(), Some("archive.zip"));
        assert!(dialog.last_confirmation());
        assert_eq!(dialog.created(), 1);
        assert_eq!(dialog.released(), 1);
    }

    #[test]
    fn test_second_resolve_is_cache_hit() {
        let lock = fast_factory(LockKind::Scrypt).generate_lock(b"pw").unwrap();
        let m = manager(LockKind::Scrypt, ScriptedDialog::new(["pw"]));

        let resolved = m.resolve_lock(Some(&lock.to_bytes()), "vault").unwrap();
        assert_eq!(resolved, lock);
        assert!(!m.dialog().last_confirmation());
        assert_eq!(m.dialog().shown(), 1);

        let again = m.resolve_lock(Some(&lock.to_bytes()), "vault").unwrap();
        assert_eq!(again, lock);
        assert_eq!(m.dialog().created(), 1);
        assert_eq!(m.dialog().shown(), 1);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_family_resolves_without_prompt() {
        let creator = manager(LockKind::Scrypt, ScriptedDialog::new(["family pw"]));
        let first = creator.new_lock("a").unwrap();
        let second = creator.similar_lock(&first).unwrap();
        let third = creator.similar_lock(&second).unwrap();
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(creator.len(), 3);

        let resolver = manager(LockKind::Scrypt, ScriptedDialog::new(["family pw"]));
        assert_eq!(resolver.resolve_lock(Some(&second.to_bytes()), "b").unwrap(), second);
        assert_eq!(resolver.dialog().shown(), 1);

        assert_eq!(resolver.resolve_lock(Some(&third.to_bytes()), "c").unwrap(), third);
        assert_eq!(resolver.resolve_lock(Some(&first.to_bytes()), "d").unwrap(), first);
        assert_eq!(resolver.dialog().shown(), 1);
        assert_eq!(resolver.len(), 3);
    }

    #[test]
    fn test_rejected_then_cancelled() {
        let m = manager(LockKind::Blake3, ScriptedDialog::new(["known", "wrong"]));
        m.new_lock("seed").unwrap();
        assert_eq!(m.len(), 1);

        let foreign = fast_factory(LockKind::Blake3).generate_lock(b"right").unwrap();
        assert_eq!(
            m.resolve_lock(Some(&foreign.to_bytes()), "foreign"),
            Err(ManagerError::InvalidPassword)
        );
        assert_eq!(m.len(), 1);
        assert!(!m.contains(&foreign));

        let dialog = m.dialog();
        assert_eq!(dialog.bad_reports(), 1);
        assert_eq!(dialog.created(), 2);
        assert_eq!(dialog.shown(), 3);
        assert_eq!(dialog.released(), 2);
        assert!(!dialog.is_open());
    }

    #[test]
    fn test_retry_after_bad_password() {
        let lock = fast_factory(LockKind::Scrypt).generate_lock(b"second try").unwrap();
        let m = manager(LockKind::Scrypt, ScriptedDialog::new(["first try", "second try"]));

        assert_eq!(m.resolve_lock(Some(&lock.to_bytes()), "x").unwrap(), lock);
        assert_eq!(m.dialog().bad_reports(), 1);
        assert_eq!(m.dialog().created(), 1);
    }

    #[test]
    fn test_similar_lock_on_unknown() {
        let m = manager(LockKind::Blake3, ScriptedDialog::default());
        let stranger = fast_factory(LockKind::Blake3).generate_lock(b"pw").unwrap();
        assert_eq!(m.similar_lock(&stranger), Err(ManagerError::UnknownLock));
        assert_eq!(m.dialog().created(), 0);
    }

    #[test]
    fn test_malformed_bytes_fail_before_prompt() {
        let m = manager(LockKind::Blake3, ScriptedDialog::new(["pw"]));
        assert_eq!(
            m.resolve_lock(Some(b"garbage"), "x"),
            Err(ManagerError::Lock(LockError::Malformed))
        );
        assert_eq!(m.dialog().created(), 0);
        assert_eq!(m.dialog().pending(), 1);
    }

    #[test]
    fn test_excessive_cost_fails_before_any_work() {
        let session = ChaChaSessionKey::generate(system_rng()).unwrap();
        let m = LockManager::new(
            CountingFactory::new(LockKind::Scrypt),
            ScriptedDialog::new(["cached", "never asked"]),
            session,
        );
        m.new_lock("seed").unwrap();
        assert_eq!(m.factory().generates.load(Ordering::SeqCst), 1);

        let template = fast_factory(LockKind::Scrypt).generate_lock(b"cached").unwrap();
        let costs: [(u8, u32, u32); 3] = [(22, 8, 1), (22, 1 << 20, 1), (10, 1, (1 << 29) - 1)];
        for (log_n, r, p) in costs {
            let mut bytes = template.to_bytes();
            bytes[1] = log_n;
            bytes[2..6].copy_from_slice(&r.to_be_bytes());
            bytes[6..10].copy_from_slice(&p.to_be_bytes());
            assert_eq!(
                m.resolve_lock(Some(&bytes), "crafted"),
                Err(ManagerError::Lock(LockError::Malformed))
            );
        }

        assert_eq!(m.factory().derives.load(Ordering::SeqCst), 0);
        assert_eq!(m.factory().generates.load(Ordering::SeqCst), 1);
        let dialog = m.dialog();
        assert_eq!(dialog.created(), 1);
        assert_eq!(dialog.pending(), 1);
    }

    #[test]
    fn test_similar_lock_keeps_kind_and_cost() {
        let m = manager(LockKind::Scrypt, ScriptedDialog::new(["pw", "pw"]));

        let blake3 = fast_factory(LockKind::Blake3).generate_lock(b"pw").unwrap();
        m.resolve_lock(Some(&blake3.to_bytes()), "b3").unwrap();
        let similar = m.similar_lock(&blake3).unwrap();
        assert_eq!(similar.kind(), LockKind::Blake3);

        let cost = ScryptCost { log_n: 5, r: 4, p: 1 };
        let config = LockConfig {
            kind: LockKind::Scrypt,
            cost,
        };
        let scrypt = PasswordLockFactory::new(config, system_rng())
            .generate_lock(b"pw")
            .unwrap();
        assert_eq!(m.resolve_lock(Some(&scrypt.to_bytes()), "sc").unwrap(), scrypt);
        let similar = m.similar_lock(&scrypt).unwrap();
        assert_eq!(similar.cost(), Some(cost));
        assert_eq!(m.len(), 4);
        assert_eq!(m.dialog().shown(), 1);
    }

    #[test]
    fn test_known_passwords_tried_once_each() {
        let factory = CountingFactory::new(LockKind::Blake3);
        let session = ChaChaSessionKey::generate(system_rng()).unwrap();
        let m = LockManager::new(factory, ScriptedDialog::new(["alpha"]), session);

        let first = m.new_lock("a").unwrap();
        m.similar_lock(&first).unwrap();
        m.similar_lock(&first).unwrap();
        assert_eq!(m.len(), 3);

        let other = fast_factory(LockKind::Blake3).generate_lock(b"beta").unwrap();
        assert_eq!(
            m.resolve_lock(Some(&other.to_bytes()), "b"),
            Err(ManagerError::InvalidPassword)
        );
        assert_eq!(m.factory().derives.load(Ordering::SeqCst), 1);

        let sibling = fast_factory(LockKind::Blake3).generate_lock(b"alpha").unwrap();
        assert_eq!(m.resolve_lock(Some(&sibling.to_bytes()), "c").unwrap(), sibling);
        assert_eq!(m.factory().derives.load(Ordering::SeqCst), 2);
        assert_eq!(m.dialog().created(), 2);
        assert_eq!(m.len(), 4);
    }

    #[test]
    fn test_dialog_buffers_wiped_on_every_path() {
        let m = manager(
            LockKind::Blake3,
            RecordingDialog::new(["created", "wrong", "right", "wrong again"]),
        );

        // Success.
        m.new_lock("new").unwrap();

        // Rejection, then success.
        let lock = fast_factory(LockKind::Blake3).generate_lock(b"right").unwrap();
        assert_eq!(m.resolve_lock(Some(&lock.to_bytes()), "retry").unwrap(), lock);

        // Rejection, then cancellation.
        let lost = fast_factory(LockKind::Blake3).generate_lock(b"forgotten").unwrap();
        assert_eq!(
            m.resolve_lock(Some(&lost.to_bytes()), "lost"),
            Err(ManagerError::InvalidPassword)
        );

        let dialog = m.dialog();
        assert_eq!(dialog.handed_out(), 4);
        assert!(dialog.all_wiped());
    }

    #[test]
    fn test_shared_between_threads() {
        let m = Arc::new(manager(LockKind::Blake3, ScriptedDialog::new(["shared"])));
        let first = m.new_lock("seed").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&m);
                let first = first.clone();
                thread::spawn(move || {
                    assert_eq!(m.resolve_lock(Some(&first.to_bytes()), "t").unwrap(), first);
                    m.similar_lock(&first).unwrap()
                })
            })
            .collect();

        for handle in handles {
            let lock = handle.join().unwrap();
            assert!(m.contains(&lock));
        }
        assert_eq!(m.len(), 5);
        assert_eq!(m.dialog().created(), 1);
    }

    #[test]
    fn test_from_config() {
        let entropy = Arc::new(StrongEntropy::system().unwrap());
        let config = PasslockConfig {
            lock: LockConfig {
                kind: LockKind::Blake3,
                ..LockConfig::default()
            },
            ..PasslockConfig::default()
        };
        let random = RandomFactory::new(entropy, &config.drbg);

        let m = LockManager::from_config(&config, &random, ScriptedDialog::new(["pw"])).unwrap();
        let lock = m.new_lock("configured").unwrap();
        assert_eq!(lock.kind(), LockKind::Blake3);
        assert_eq!(m.factory().config().kind, LockKind::Blake3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_resolve_generated_lock(
            password in proptest::collection::vec(any::<u8>(), 0..48),
            label in "[a-z./]{1,24}",
        ) {
            let lock = fast_factory(LockKind::Blake3).generate_lock(&password).unwrap();
            let m = manager(LockKind::Blake3, ScriptedDialog::new([password.clone()]));

            let resolved = m.resolve_lock(Some(&lock.to_bytes()), &label).unwrap();
            prop_assert_eq!(resolved.to_bytes(), lock.to_bytes());

            let title = m.dialog().last_title().map(str::to_owned);
            prop_assert_eq!(title.as_deref(), Some(label.as_str()));
        }
    }
}
