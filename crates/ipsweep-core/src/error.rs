//! Search errors

use thiserror::Error;

/// Fatal errors, all detected before any worker starts
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid target digest: expected {expected} bytes, got {actual}")]
    InvalidTarget { expected: usize, actual: usize },
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
