//! Digest contexts for candidate hashing

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::digest::{consts::U32, Digest, FixedOutputReset, OutputSizeUser};
use sha2::Sha256;
use sha3::{Keccak256, Sha3_256};

/// Output width of every supported algorithm
pub const DIGEST_LEN: usize = 32;

/// Hash function used to digest candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestAlgorithm {
    /// SHA-256 (FIPS 180-4)
    #[default]
    Sha256,
    /// SHA3-256 (FIPS 202)
    Sha3_256,
    /// Keccak-256 with the original padding (Ethereum style)
    Keccak256,
}

impl DigestAlgorithm {
    /// Digest width in bytes
    pub fn output_len(&self) -> usize {
        DIGEST_LEN
    }

    /// One-shot digest of `data`
    pub fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        match self {
            DigestAlgorithm::Sha256 => sha256(data),
            DigestAlgorithm::Sha3_256 => sha3_256(data),
            DigestAlgorithm::Keccak256 => keccak256(data),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha256 => write!(f, "SHA-256"),
            DigestAlgorithm::Sha3_256 => write!(f, "SHA3-256"),
            DigestAlgorithm::Keccak256 => write!(f, "Keccak-256"),
        }
    }
}

/// A reusable hashing context owned by a single worker.
///
/// Implementations reset their internal state after every call, so one
/// instance can digest any number of inputs without reallocating.
pub trait Digester: Send {
    /// Algorithm implemented by this context
    const ALGORITHM: DigestAlgorithm;

    /// Create a fresh context
    fn new() -> Self
    where
        Self: Sized;

    /// Digest `data` and leave the context ready for the next input
    fn digest(&mut self, data: &[u8]) -> [u8; DIGEST_LEN];

    /// Discard any buffered input
    fn reset(&mut self);
}

/// [`Digester`] backed by a RustCrypto hasher
#[derive(Debug, Clone, Default)]
pub struct HashDigester<H> {
    hasher: H,
}

macro_rules! impl_digester {
    ($hasher:ty, $algorithm:expr) => {
        impl Digester for HashDigester<$hasher> {
            const ALGORITHM: DigestAlgorithm = $algorithm;

            fn new() -> Self {
                Self {
                    hasher: <$hasher>::default(),
                }
            }

            #[inline]
            fn digest(&mut self, data: &[u8]) -> [u8; DIGEST_LEN] {
                finalize_with(&mut self.hasher, data)
            }

            fn reset(&mut self) {
                Digest::reset(&mut self.hasher);
            }
        }
    };
}

#[inline(always)]
fn finalize_with<H>(hasher: &mut H, data: &[u8]) -> [u8; DIGEST_LEN]
where
    H: Digest + FixedOutputReset + OutputSizeUser<OutputSize = U32>,
{
    Digest::update(hasher, data);
    Digest::finalize_reset(hasher).into()
}

pub type Sha256Digester = HashDigester<Sha256>;
pub type Sha3_256Digester = HashDigester<Sha3_256>;
pub type Keccak256Digester = HashDigester<Keccak256>;

impl_digester!(Sha256, DigestAlgorithm::Sha256);
impl_digester!(Sha3_256, DigestAlgorithm::Sha3_256);
impl_digester!(Keccak256, DigestAlgorithm::Keccak256);

/// SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA3-256 hash
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Keccak-256 (NOT SHA3-256)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let result = sha256(b"hello");
        assert_eq!(
            hex::encode(result),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_keccak256() {
        // Empty input
        let result = keccak256(b"");
        assert_eq!(
            hex::encode(result),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_sha3_256() {
        let result = sha3_256(b"");
        assert_eq!(
            hex::encode(result),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_digester_matches_one_shot() {
        let mut digester = Sha256Digester::new();
        assert_eq!(digester.digest(b"hello"), sha256(b"hello"));

        let mut digester = Sha3_256Digester::new();
        assert_eq!(digester.digest(b"1.2.3.4"), sha3_256(b"1.2.3.4"));

        let mut digester = Keccak256Digester::new();
        assert_eq!(digester.digest(b"1.2.3.4"), keccak256(b"1.2.3.4"));
    }

    #[test]
    fn test_digester_reuse_is_deterministic() {
        let mut reused = Sha256Digester::new();
        let first = reused.digest(b"10.0.0.1");
        reused.digest(b"255.255.255.255");
        let again = reused.digest(b"10.0.0.1");

        let mut fresh = Sha256Digester::new();
        assert_eq!(first, again);
        assert_eq!(first, fresh.digest(b"10.0.0.1"));
    }

    #[test]
    fn test_reset_discards_state() {
        let mut digester = Keccak256Digester::new();
        digester.digest(b"192.168.1.1");
        digester.reset();
        assert_eq!(digester.digest(b""), Keccak256Digester::new().digest(b""));
    }

    #[test]
    fn test_algorithm_dispatch() {
        assert_eq!(DigestAlgorithm::default(), DigestAlgorithm::Sha256);
        assert_eq!(DigestAlgorithm::Sha256.digest(b"hello"), sha256(b"hello"));
        assert_eq!(DigestAlgorithm::Keccak256.digest(b""), keccak256(b""));
        assert_eq!(DigestAlgorithm::Sha3_256.output_len(), 32);
        assert_eq!(Sha3_256Digester::ALGORITHM, DigestAlgorithm::Sha3_256);
    }
}
