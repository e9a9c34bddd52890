//! Hash and keyed-hash primitives usable by the DRBG.

use core::fmt;

use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

/// Key length of the keyed BLAKE3 primitive.
pub const KEYED_KEY_LEN: usize = 32;

/// Hash function selection for the Hash-DRBG.
#[derive(Clone)]
pub enum HashPrimitive {
    /// SHA-256 (seedlen 440 bits, output 256 bits).
    Sha256,
    /// SHA-512 (seedlen 888 bits, output 512 bits).
    Sha512,
    /// BLAKE3 in plain hash mode (seedlen 440 bits, output 256 bits).
    Blake3,
    /// BLAKE3 in keyed mode; the key stays secret for the life of the DRBG.
    Blake3Keyed(Zeroizing<[u8; KEYED_KEY_LEN]>),
}

impl HashPrimitive {
    /// Seed length in bytes (SP 800-90A Table 2).
    pub fn seed_len(&self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 | Self::Blake3Keyed(_) => 55,
            Self::Sha512 => 111,
        }
    }

    /// Digest output size in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 | Self::Blake3Keyed(_) => 32,
            Self::Sha512 => 64,
        }
    }

    /// Fresh entropy drawn per (re)seed.
    pub fn entropy_len(&self) -> usize {
        self.output_len()
    }

    /// Short algorithm name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
            Self::Blake3 => "BLAKE3",
            Self::Blake3Keyed(_) => "BLAKE3-keyed",
        }
    }

    /// Hashes the concatenation of `parts`.
    pub fn digest(&self, parts: &[&[u8]]) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Sha256 => {
                let mut h = Sha256::new();
                for part in parts {
                    h.update(part);
                }
                Zeroizing::new(h.finalize().to_vec())
            }
            Self::Sha512 => {
                let mut h = Sha512::new();
                for part in parts {
                    h.update(part);
                }
                Zeroizing::new(h.finalize().to_vec())
            }
            Self::Blake3 => blake3_digest(blake3::Hasher::new(), parts),
            Self::Blake3Keyed(key) => blake3_digest(blake3::Hasher::new_keyed(key), parts),
        }
    }
}

fn blake3_digest(mut hasher: blake3::Hasher, parts: &[&[u8]]) -> Zeroizing<Vec<u8>> {
    for part in parts {
        hasher.update(part);
    }
    Zeroizing::new(hasher.finalize().as_bytes().to_vec())
}

impl fmt::Debug for HashPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
