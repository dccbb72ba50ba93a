//! Time windows over which engagement is aggregated.

use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Inclusive `[start, end]` window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting a start after the end
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start > end {
            return Err(DomainError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window of the given length that closes at `end`.
    ///
    /// Lengths beyond what chrono can represent saturate to the earliest
    /// representable instant.
    pub fn ending_at(end: DateTime<Utc>, length: Duration) -> Self {
        let start = chrono::Duration::from_std(length)
            .ok()
            .and_then(|length| end.checked_sub_signed(length))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    /// Window start
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Window end
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `ts` falls inside the window, both ends included
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Window length
    pub fn length(&self) -> chrono::Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
