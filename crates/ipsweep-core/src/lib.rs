//! IpSweep Core Engine
//!
//! Recovers an IPv4 address from its digest by exhaustive multi-threaded search.

mod error;
mod keyspace;
mod search;
mod stats;

pub use error::SearchError;
pub use keyspace::{partition, Partition, SearchSpace};
pub use search::{
    IpSearch, MatchResult, SearchConfig, SearchOutcome, SearchReport, DEFAULT_BATCH_SIZE,
};
pub use stats::{format_duration, format_keys, ProgressSnapshot, SearchRun, StopReason};

// Re-exports for convenience
pub use ipsweep_crypto::{encode_ipv4, hex, DigestAlgorithm, DIGEST_LEN};
