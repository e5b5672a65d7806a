//! Keyspace and static partitioning

use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Inclusive range of candidate keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub min: u32,
    pub max: u32,
}

impl SearchSpace {
    /// Every IPv4 address
    pub const FULL: SearchSpace = SearchSpace {
        min: 0,
        max: u32::MAX,
    };

    /// Create a validated space
    pub fn new(min: u32, max: u32) -> Result<Self, SearchError> {
        let space = Self { min, max };
        space.validate()?;
        Ok(space)
    }

    /// Space spanning two addresses, inclusive
    pub fn between(first: Ipv4Addr, last: Ipv4Addr) -> Result<Self, SearchError> {
        Self::new(first.into(), last.into())
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.min > self.max {
            return Err(SearchError::InvalidConfiguration(format!(
                "search space start {} is after end {}",
                Ipv4Addr::from(self.min),
                Ipv4Addr::from(self.max)
            )));
        }
        Ok(())
    }

    /// Number of keys; `2^32` for the full space, so widened to u64
    pub fn len(&self) -> u64 {
        u64::from(self.max) - u64::from(self.min) + 1
    }

    pub fn contains(&self, key: u32) -> bool {
        (self.min..=self.max).contains(&key)
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::FULL
    }
}

/// Contiguous slice of the keyspace owned by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub start: u32,
    pub end: u32,
}

impl Partition {
    /// Keys in ascending order
    pub fn keys(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    pub fn len(&self) -> u64 {
        u64::from(self.end) - u64::from(self.start) + 1
    }
}

/// Split `space` into `workers` ordered, disjoint, gap-free partitions.
///
/// Each partition gets `len / workers` keys and the last one also takes the
/// remainder. Every partition must be non-empty, so `workers` may not exceed
/// the size of the space.
pub fn partition(space: SearchSpace, workers: usize) -> Result<Vec<Partition>, SearchError> {
    space.validate()?;

    if workers == 0 {
        return Err(SearchError::InvalidConfiguration(
            "worker count must be at least 1".to_string(),
        ));
    }

    let total = space.len();
    let count = workers as u64;
    if count > total {
        return Err(SearchError::InvalidConfiguration(format!(
            "{} workers cannot split a space of {} keys",
            workers, total
        )));
    }

    // All arithmetic in u64: `max + 1` overflows u32 for the full space
    let size = total / count;
    let min = u64::from(space.min);

    let partitions = (0..count)
        .map(|i| {
            let start = min + i * size;
            let end = if i == count - 1 {
                u64::from(space.max)
            } else {
                start + size - 1
            };
            Partition {
                start: start as u32,
                end: end as u32,
            }
        })
        .collect();

    Ok(partitions)
}
