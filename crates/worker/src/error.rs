//! Ranking job errors

use std::time::Duration;

/// Result alias for ranking jobs
pub type JobResult<T> = std::result::Result<T, JobError>;

/// Errors raised while running a ranking job
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Event or leaderboard store failure
    #[error("Store error: {0}")]
    Store(#[from] doodling_infrastructure::Error),

    /// The run observed shutdown before touching the leaderboard
    #[error("Run cancelled")]
    Cancelled,

    /// The run exceeded the job timeout and was abandoned
    #[error("Run timed out after {0:?}")]
    TimedOut(Duration),

    /// Ranked output would break rank density
    #[error("Invalid ranking: {0}")]
    InvalidRanking(String),

    /// No job with this name is configured
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// Some partitions of a multi-scope job failed
    #[error("{failed} of {total} scopes failed")]
    ScopesFailed { failed: usize, total: usize },

    /// The scheduler was started more than once
    #[error("Scheduler already started")]
    AlreadyStarted,
}

impl JobError {
    /// Whether the next scheduled run can be expected to succeed
    pub fn is_transient(&self) -> bool {
        match self {
            JobError::Store(e) => e.is_retryable(),
            JobError::TimedOut(_) | JobError::ScopesFailed { .. } => true,
            JobError::Cancelled
            | JobError::InvalidRanking(_)
            | JobError::UnknownJob(_)
            | JobError::AlreadyStarted => false,
        }
    }
}
