//! Random Factory.
//!
//! Builds Hash-DRBG instances over the process-wide [`StrongEntropy`] and
//! hands out the shared entropy for callers that need raw bytes.
//!
//! # Personalization
//! Every DRBG is personalized with the current thread identifier, the
//! wall-clock time and the configured caller seed. This is domain separation
//! between instances only; unpredictability always comes from the entropy
//! source.

pub mod rng;

pub use rng::DrbgRng;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use zeroize::Zeroizing;

use crate::config::DrbgConfig;
use crate::drbg::primitive::KEYED_KEY_LEN;
use crate::drbg::{DrbgError, HashDrbg, HashPrimitive};
use crate::entropy::{EntropyError, EntropySource, StrongEntropy};

/// Init vector length drawn from the entropy source when none is supplied.
pub const INIT_VECTOR_LEN: usize = 16;

/// Configurable DRBG hash selection.
///
/// Unlike [`HashPrimitive`] this carries no key material: the keyed variant
/// draws a fresh key from the entropy source each time a DRBG is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrbgHash {
    /// SHA-256.
    #[default]
    Sha256,
    /// SHA-512.
    Sha512,
    /// BLAKE3.
    Blake3,
    /// BLAKE3 keyed with a random per-instance key.
    Blake3Keyed,
}

/// Factory for DRBG instances sharing one strong entropy source.
pub struct RandomFactory {
    entropy: Arc<StrongEntropy>,
    hash: DrbgHash,
    prediction_resistant: bool,
    seed: Vec<u8>,
}

impl RandomFactory {
    /// Creates a factory drawing from `entropy`.
    pub fn new(entropy: Arc<StrongEntropy>, config: &DrbgConfig) -> Self {
        Self {
            entropy,
            hash: config.hash,
            prediction_resistant: config.prediction_resistance,
            seed: config.personalization.clone(),
        }
    }

    /// The shared strong entropy source.
    pub fn entropy(&self) -> &Arc<StrongEntropy> {
        &self.entropy
    }

    /// Fills `dest` straight from the strong entropy source.
    pub fn fill_random(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        self.entropy.fill(dest)
    }

    /// Whether DRBGs built here reseed before every request.
    pub fn prediction_resistant(&self) -> bool {
        cfg!(feature = "paranoid") || self.prediction_resistant
    }

    /// Resolves a hash selection into a primitive.
    pub fn primitive(&self, hash: DrbgHash) -> Result<HashPrimitive, DrbgError> {
        Ok(match hash {
            DrbgHash::Sha256 => HashPrimitive::Sha256,
            DrbgHash::Sha512 => HashPrimitive::Sha512,
            DrbgHash::Blake3 => HashPrimitive::Blake3,
            DrbgHash::Blake3Keyed => {
                let mut key = Zeroizing::new([0u8; KEYED_KEY_LEN]);
                self.entropy.fill(&mut *key)?;
                HashPrimitive::Blake3Keyed(key)
            }
        })
    }

    /// Builds a DRBG over `primitive`.
    ///
    /// Without an explicit `init_vector`, [`INIT_VECTOR_LEN`] bytes are drawn
    /// from the entropy source.
    pub fn create(
        &self,
        primitive: HashPrimitive,
        init_vector: Option<&[u8]>,
    ) -> Result<HashDrbg, DrbgError> {
        let drawn;
        let init_vector = match init_vector {
            Some(iv) => iv,
            None => {
                let mut iv = Zeroizing::new([0u8; INIT_VECTOR_LEN]);
                self.entropy.fill(&mut *iv)?;
                drawn = iv;
                &drawn[..]
            }
        };

        let personalization = self.personalization();
        let source: Arc<dyn EntropySource> = self.entropy.clone();
        HashDrbg::new(primitive, source, &personalization, init_vector)
    }

    /// Builds a limit-enforcing generator over the configured hash.
    pub fn rng(&self) -> Result<DrbgRng, DrbgError> {
        self.rng_with(self.hash)
    }

    /// Builds a limit-enforcing generator over `hash`.
    pub fn rng_with(&self, hash: DrbgHash) -> Result<DrbgRng, DrbgError> {
        let drbg = self.create(self.primitive(hash)?, None)?;
        Ok(DrbgRng::new(Arc::new(drbg), self.prediction_resistant()))
    }

    pub(crate) fn personalization(&self) -> Vec<u8> {
        let thread = format!("{:?}", std::thread::current().id());
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(thread.len() + 16 + self.seed.len());
        out.extend_from_slice(thread.as_bytes());
        out.extend_from_slice(&nanos.to_be_bytes());
        out.extend_from_slice(&self.seed);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drbg::Generate;

    fn factory(config: &DrbgConfig) -> RandomFactory {
        RandomFactory::new(Arc::new(StrongEntropy::system().unwrap()), config)
    }

    #[test]
    fn test_create_each_primitive() {
        let f = factory(&DrbgConfig::default());
        for hash in [DrbgHash::Sha256, DrbgHash::Sha512, DrbgHash::Blake3, DrbgHash::Blake3Keyed] {
            let drbg = f.create(f.primitive(hash).unwrap(), None).unwrap();
            let mut out = [0u8; 48];
            assert_eq!(drbg.generate(&mut out, None, false), Ok(Generate::Generated(384)));
            assert!(out.iter().any(|&b| b != 0), "{:?}", hash);
        }
    }

    #[test]
    fn test_same_init_vector_still_unpredictable() {
        let f = factory(&DrbgConfig::default());
        let a = f.create(HashPrimitive::Sha256, Some(b"fixed iv")).unwrap();
        let b = f.create(HashPrimitive::Sha256, Some(b"fixed iv")).unwrap();

        let mut out_a = [0u8; 32];
        let mut out_b = [0u8; 32];
        let _ = a.generate(&mut out_a, None, false).unwrap();
        let _ = b.generate(&mut out_b, None, false).unwrap();
        assert_ne!(out_a, out_b);
    }

    #[test]
    fn test_personalization_carries_seed_and_thread() {
        let config = DrbgConfig {
            personalization: b"caller seed".to_vec(),
            ..DrbgConfig::default()
        };
        let f = Arc::new(factory(&config));
        let here = f.personalization();
        assert!(here.ends_with(b"caller seed"));

        let remote = {
            let f = Arc::clone(&f);
            std::thread::spawn(move || f.personalization()).join().unwrap()
        };
        assert_ne!(here, remote);
    }

    #[test]
    fn test_prediction_resistance_from_config() {
        let config = DrbgConfig {
            prediction_resistance: true,
            ..DrbgConfig::default()
        };
        assert!(factory(&config).prediction_resistant());
        assert_eq!(
            factory(&DrbgConfig::default()).prediction_resistant(),
            cfg!(feature = "paranoid")
        );
    }

    #[test]
    fn test_fill_random() {
        let f = factory(&DrbgConfig::default());
        let mut salt = [0u8; 32];
        f.fill_random(&mut salt).unwrap();
        assert!(salt.iter().any(|&b| b != 0));
    }
}
