//! IpSweep Crypto Primitives
//!
//! Candidate encoding and digest contexts for the IPv4 preimage search.

pub mod encoding;
pub mod hash;

pub use self::encoding::{encode_ipv4, CandidateEncoder, MAX_CANDIDATE_LEN};
pub use self::hash::{
    Digester, DigestAlgorithm, HashDigester, Keccak256Digester, Sha256Digester,
    Sha3_256Digester, DIGEST_LEN,
};

// Re-export dependencies for use by other crates
pub use hex;
