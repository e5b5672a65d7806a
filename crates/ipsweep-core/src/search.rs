//! IPv4 preimage search engine

use std::net::Ipv4Addr;
use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use ipsweep_crypto::{
    CandidateEncoder, DigestAlgorithm, Digester, Keccak256Digester, Sha256Digester,
    Sha3_256Digester, DIGEST_LEN,
};

use crate::error::SearchError;
use crate::keyspace::{partition, Partition, SearchSpace};
use crate::stats::{ProgressAggregator, ProgressSnapshot, SearchRun, StopReason};

/// Candidates a worker processes between counter flushes
pub const DEFAULT_BATCH_SIZE: u64 = 100_000;

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of threads (0 = auto)
    pub threads: usize,
    /// Candidates per progress counter flush
    pub batch_size: u64,
    /// Hash function the target was produced with
    pub algorithm: DigestAlgorithm,
    /// Keys to search
    pub space: SearchSpace,
    /// Maximum time in seconds (0 = unlimited)
    pub max_time_secs: u64,
    /// Progress sampling interval in milliseconds
    pub progress_interval_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 0, // Auto-detect
            batch_size: DEFAULT_BATCH_SIZE,
            algorithm: DigestAlgorithm::Sha256,
            space: SearchSpace::FULL,
            max_time_secs: 0,
            progress_interval_ms: 1000,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<(), SearchError> {
        self.space.validate()?;
        if self.batch_size == 0 {
            return Err(SearchError::InvalidConfiguration(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.progress_interval_ms == 0 {
            return Err(SearchError::InvalidConfiguration(
                "progress interval must be at least 1ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective worker count, never more than there are keys
    pub fn worker_count(&self) -> usize {
        let requested = if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        };
        let total = self.space.len();
        if requested as u64 > total {
            total as usize
        } else {
            requested
        }
    }

    fn time_limit(&self) -> Option<Duration> {
        (self.max_time_secs > 0).then(|| Duration::from_secs(self.max_time_secs))
    }
}

/// The recovered preimage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matching key
    pub key: u32,
    /// Exact bytes that were hashed, as text
    pub candidate: String,
}

impl MatchResult {
    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.key)
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// A worker found the preimage
    Found(MatchResult),
    /// Every key was tried without a match
    Exhausted,
    /// The deadline expired first
    TimedOut,
    /// The caller stopped the run
    Aborted,
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}

/// Search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    /// Total keys tested
    pub keys_tested: u64,
    /// Size of the searched space
    pub total_keys: u64,
    /// Time taken in seconds
    pub time_secs: f64,
    /// Keys per second achieved
    pub keys_per_second: f64,
}

/// One partition's enumeration loop
struct Worker<'a, D> {
    run: &'a SearchRun,
    target: &'a [u8; DIGEST_LEN],
    matches: &'a Sender<MatchResult>,
    batch_size: u64,
    encoder: CandidateEncoder,
    digester: D,
}

impl<'a, D: Digester> Worker<'a, D> {
    fn new(
        run: &'a SearchRun,
        target: &'a [u8; DIGEST_LEN],
        matches: &'a Sender<MatchResult>,
        batch_size: u64,
    ) -> Self {
        Self {
            run,
            target,
            matches,
            batch_size,
            encoder: CandidateEncoder::new(),
            digester: D::new(),
        }
    }

    /// Try every key of `partition` in ascending order. Returns the number
    /// of candidates processed.
    fn sweep(&mut self, partition: Partition) -> u64 {
        let mut pending = 0u64;
        let mut processed = 0u64;

        for key in partition.keys() {
            if self.run.is_cancelled() {
                break;
            }

            let candidate = self.encoder.encode(key);
            let digest = self.digester.digest(candidate);
            pending += 1;

            if digest == *self.target {
                self.run.add_processed(pending);
                self.publish(key);
                return processed + pending;
            }

            if pending == self.batch_size {
                self.run.add_processed(pending);
                processed += pending;
                pending = 0;
            }
        }

        // Flush the remainder below the batch threshold
        self.run.add_processed(pending);
        processed + pending
    }

    fn publish(&self, key: u32) {
        if !self.run.claim_match() {
            return;
        }

        let found = MatchResult {
            key,
            candidate: self.encoder.to_candidate_string(),
        };
        info!(address = %found.candidate, "match found");

        // Capacity 1 and a single claimant, so this never blocks
        if let Err(err) = self.matches.try_send(found) {
            error!(address = %err.into_inner().candidate, "match could not be published");
        }
        self.run.cancel(StopReason::Matched);
    }
}

/// Parallel preimage search over a keyspace
pub struct IpSearch {
    target: [u8; DIGEST_LEN],
    config: SearchConfig,
}

impl IpSearch {
    /// Create a new search, validating the target width and configuration
    pub fn new(target: &[u8], config: SearchConfig) -> Result<Self, SearchError> {
        let expected = config.algorithm.output_len();
        let invalid = || SearchError::InvalidTarget {
            expected,
            actual: target.len(),
        };
        if target.len() != expected {
            return Err(invalid());
        }
        let target = <[u8; DIGEST_LEN]>::try_from(target).map_err(|_| invalid())?;

        config.validate()?;

        Ok(Self { target, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run the search (blocking until found, exhausted or stopped)
    pub fn run(&self) -> Result<SearchReport, SearchError> {
        self.run_with_progress(|_| ControlFlow::Continue(()))
    }

    /// Run search with a callback for progress.
    ///
    /// The callback runs on the calling thread at every sampling interval and
    /// once after the workers stop. Returning `Break` aborts the run.
    pub fn run_with_progress<F>(&self, callback: F) -> Result<SearchReport, SearchError>
    where
        F: FnMut(&ProgressSnapshot) -> ControlFlow<()>,
    {
        match self.config.algorithm {
            DigestAlgorithm::Sha256 => self.execute::<Sha256Digester, F>(callback),
            DigestAlgorithm::Sha3_256 => self.execute::<Sha3_256Digester, F>(callback),
            DigestAlgorithm::Keccak256 => self.execute::<Keccak256Digester, F>(callback),
        }
    }

    fn execute<D, F>(&self, mut callback: F) -> Result<SearchReport, SearchError>
    where
        D: Digester,
        F: FnMut(&ProgressSnapshot) -> ControlFlow<()>,
    {
        let workers = self.config.worker_count();
        let partitions = partition(self.config.space, workers)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(partitions.len())
            .thread_name(|i| format!("ipsweep-worker-{}", i))
            .build()?;

        let run = SearchRun::new(self.config.space.len());
        let run = &run;
        let target = &self.target;
        let batch_size = self.config.batch_size;

        // Channel for results
        let (match_tx, match_rx) = bounded::<MatchResult>(1);
        // Never sent on; disconnects once every worker has returned
        let (done_tx, done_rx) = bounded::<()>(0);

        let algorithm = D::ALGORITHM;
        info!(
            workers = partitions.len(),
            keys = run.total(),
            algorithm = %algorithm,
            "starting search"
        );

        thread::scope(|s| {
            let partitions = &partitions;
            s.spawn(move || {
                let _done = done_tx;
                let match_tx = match_tx;
                pool.install(|| {
                    partitions
                        .par_iter()
                        .with_max_len(1)
                        .for_each(|&part| {
                            let keys = Worker::<D>::new(run, target, &match_tx, batch_size)
                                .sweep(part);
                            debug!(start = part.start, end = part.end, keys, "worker finished");
                        });
                });
            });

            if let Some(limit) = self.config.time_limit() {
                let done = done_rx.clone();
                s.spawn(move || {
                    if let Err(RecvTimeoutError::Timeout) = done.recv_timeout(limit) {
                        if run.cancel(StopReason::Deadline) {
                            info!(secs = limit.as_secs(), "deadline reached, stopping workers");
                        }
                    }
                });
            }

            let interval = Duration::from_millis(self.config.progress_interval_ms);
            ProgressAggregator::new(run, interval).watch(&done_rx, |snapshot| {
                if callback(snapshot).is_break() && run.cancel(StopReason::Aborted) {
                    info!("search aborted by caller");
                }
            });
        });

        let outcome = match match_rx.try_recv() {
            Ok(found) => SearchOutcome::Found(found),
            Err(_) => match run.stop_reason() {
                Some(StopReason::Deadline) => SearchOutcome::TimedOut,
                Some(StopReason::Aborted) => SearchOutcome::Aborted,
                Some(StopReason::Matched) | None => SearchOutcome::Exhausted,
            },
        };

        let snapshot = run.snapshot();
        info!(
            outcome = ?outcome,
            keys_tested = snapshot.processed,
            secs = snapshot.elapsed_secs,
            "search finished"
        );

        Ok(SearchReport {
            outcome,
            keys_tested: snapshot.processed,
            total_keys: snapshot.total,
            time_secs: snapshot.elapsed_secs,
            keys_per_second: snapshot.rate,
        })
    }
}
