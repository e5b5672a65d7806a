//! Shared run state and live progress

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};

/// Why a run was cancelled before exhausting its space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StopReason {
    Matched = 1,
    Deadline = 2,
    Aborted = 3,
}

impl StopReason {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(StopReason::Matched),
            2 => Some(StopReason::Deadline),
            3 => Some(StopReason::Aborted),
            _ => None,
        }
    }
}

const NOT_STOPPED: u8 = 0;

/// Atomic state shared by every worker of one run.
///
/// Each search creates its own `SearchRun`, so independent searches can run
/// side by side in the same process.
#[derive(Debug)]
pub struct SearchRun {
    /// Candidates processed so far
    processed: AtomicU64,
    /// Cancellation signal, set at most once
    cancelled: AtomicBool,
    /// Reason recorded by whoever set `cancelled`
    reason: AtomicU8,
    /// Claimed by the single worker allowed to publish a match
    match_claimed: AtomicBool,
    /// Start time
    start_time: Instant,
    total: u64,
}

impl SearchRun {
    pub fn new(total: u64) -> Self {
        Self {
            processed: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            reason: AtomicU8::new(NOT_STOPPED),
            match_claimed: AtomicBool::new(false),
            start_time: Instant::now(),
            total,
        }
    }

    /// Increment processed count by amount
    #[inline]
    pub fn add_processed(&self, count: u64) {
        self.processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Raise the cancellation signal. Only the first caller wins; returns
    /// whether this call was the one that set it.
    pub fn cancel(&self, reason: StopReason) -> bool {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.reason.store(reason as u8, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Claim the right to publish a match. Exactly one caller gets `true`.
    pub fn claim_match(&self) -> bool {
        self.match_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        StopReason::from_u8(self.reason.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::compute(self.processed(), self.total, self.elapsed())
    }
}

/// Point-in-time view of a run's progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub total: u64,
    /// Candidates per second
    pub rate: f64,
    /// Completion, 0 to 100
    pub percent: f64,
    /// Estimated seconds remaining
    pub eta_secs: f64,
    pub elapsed_secs: f64,
}

impl ProgressSnapshot {
    /// Derive throughput, completion and ETA. Zero elapsed time or zero
    /// throughput report a rate and ETA of zero instead of infinity.
    pub fn compute(processed: u64, total: u64, elapsed: Duration) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let rate = if elapsed_secs > f64::EPSILON {
            processed as f64 / elapsed_secs
        } else {
            0.0
        };
        let percent = if total > 0 {
            processed as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let remaining = total.saturating_sub(processed);
        let eta_secs = if rate > 0.0 {
            remaining as f64 / rate
        } else {
            0.0
        };

        Self {
            processed,
            total,
            rate,
            percent,
            eta_secs,
            elapsed_secs,
        }
    }

    /// Get formatted progress line
    pub fn format(&self) -> String {
        format!(
            "[{:.2} MIP/s][{}/{}][{:.2}%][ETA {}][Elapsed {}]",
            self.rate / 1_000_000.0,
            format_keys(self.processed),
            format_keys(self.total),
            self.percent,
            format_duration(self.eta_secs),
            format_duration(self.elapsed_secs)
        )
    }
}

/// Samples a run at a fixed cadence until it finishes or is cancelled.
///
/// Purely observational: it reads the counters and never touches the
/// cancellation signal.
pub struct ProgressAggregator<'a> {
    run: &'a SearchRun,
    interval: Duration,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(run: &'a SearchRun, interval: Duration) -> Self {
        Self { run, interval }
    }

    /// Report a snapshot every interval until `done` disconnects or the run
    /// is cancelled. Once every worker has returned, report one final
    /// snapshot that includes their last flushes.
    pub fn watch<F>(&self, done: &Receiver<()>, mut report: F)
    where
        F: FnMut(&ProgressSnapshot),
    {
        loop {
            match done.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if self.run.is_cancelled() {
                        break;
                    }
                    report(&self.run.snapshot());
                }
                // Workers finished (sender dropped) or a stray message
                _ => break,
            }
        }

        // Cancelled workers still flush their pending counts on the way out
        while done.recv().is_ok() {}

        report(&self.run.snapshot());
    }
}

/// Compact count with a K/M/G/T suffix
pub fn format_keys(keys: u64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "G"), (1e6, "M"), (1e3, "K")];

    let value = keys as f64;
    UNITS
        .iter()
        .find(|(scale, _)| value >= *scale)
        .map(|(scale, unit)| format!("{:.2}{}", value / scale, unit))
        .unwrap_or_else(|| keys.to_string())
}

/// Clock-style duration: `250ms`, `42s`, `3m07s`, `5h12m`
pub fn format_duration(seconds: f64) -> String {
    if seconds.is_nan() || seconds <= 0.0 {
        return "0s".to_string();
    }
    if seconds < 1.0 {
        return format!("{}ms", (seconds * 1000.0).round() as u64);
    }

    let whole = seconds.round() as u64;
    let (hours, minutes, secs) = (whole / 3600, whole / 60 % 60, whole % 60);
    match (hours, minutes) {
        (0, 0) => format!("{}s", secs),
        (0, _) => format!("{}m{:02}s", minutes, secs),
        _ => format!("{}h{:02}m", hours, minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::thread;

    #[test]
    fn test_snapshot_math() {
        let snap = ProgressSnapshot::compute(500, 1000, Duration::from_secs(10));
        assert_eq!(snap.rate, 50.0);
        assert_eq!(snap.percent, 50.0);
        assert_eq!(snap.eta_secs, 10.0);
        assert_eq!(snap.elapsed_secs, 10.0);
    }

    #[test]
    fn test_snapshot_zero_elapsed_is_finite() {
        let snap = ProgressSnapshot::compute(100, 1000, Duration::ZERO);
        assert_eq!(snap.rate, 0.0);
        assert_eq!(snap.eta_secs, 0.0);
        assert!(snap.percent.is_finite());
    }

    #[test]
    fn test_snapshot_no_progress_yet() {
        let snap = ProgressSnapshot::compute(0, 1 << 32, Duration::from_millis(500));
        assert_eq!(snap.rate, 0.0);
        assert_eq!(snap.eta_secs, 0.0);
        assert_eq!(snap.percent, 0.0);
    }

    #[test]
    fn test_cancel_is_set_once() {
        let run = SearchRun::new(10);
        assert!(!run.is_cancelled());
        assert_eq!(run.stop_reason(), None);

        assert!(run.cancel(StopReason::Deadline));
        assert!(!run.cancel(StopReason::Aborted));
        assert!(run.is_cancelled());
        assert_eq!(run.stop_reason(), Some(StopReason::Deadline));
    }

    #[test]
    fn test_match_claim_single_winner() {
        let run = SearchRun::new(10);
        let winners: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| run.claim_match())).collect();
            handles.into_iter().map(|h| h.join().unwrap() as usize).sum()
        });
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_counter_accumulates() {
        let run = SearchRun::new(1000);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..25 {
                        run.add_processed(10);
                    }
                });
            }
        });
        assert_eq!(run.processed(), 1000);
        assert_eq!(run.snapshot().percent, 100.0);
    }

    #[test]
    fn test_aggregator_final_report_on_finish() {
        let run = SearchRun::new(100);
        let (done_tx, done_rx) = bounded::<()>(0);
        run.add_processed(100);
        drop(done_tx);

        let mut reports = Vec::new();
        ProgressAggregator::new(&run, Duration::from_secs(60)).watch(&done_rx, |s| reports.push(*s));

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].processed, 100);
    }

    #[test]
    fn test_aggregator_stops_on_cancel() {
        let run = SearchRun::new(100);
        let (done_tx, done_rx) = bounded::<()>(0);
        run.cancel(StopReason::Aborted);

        let mut reports = Vec::new();
        thread::scope(|s| {
            // Late flush from a worker that is still winding down
            s.spawn(|| {
                thread::sleep(Duration::from_millis(30));
                run.add_processed(40);
                drop(done_tx);
            });
            ProgressAggregator::new(&run, Duration::from_millis(5))
                .watch(&done_rx, |snap| reports.push(*snap));
        });

        // One final render only, taken after the last flush
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].processed, 40);
        assert!(run.is_cancelled());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_keys(999), "999");
        assert_eq!(format_keys(1500), "1.50K");
        assert_eq!(format_keys(4_294_967_296), "4.29G");
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(0.25), "250ms");
        assert_eq!(format_duration(42.0), "42s");
        assert_eq!(format_duration(120.0), "2m00s");
        assert_eq!(format_duration(187.4), "3m07s");
        assert_eq!(format_duration(7384.0), "2h03m");
        assert_eq!(format_duration(f64::NAN), "0s");
    }
}
