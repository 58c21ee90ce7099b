//! Failover Policy
//!
//! Bounds the candidate search. Always supplied by the caller so tests can
//! run the bounded search with a zero interval.

use std::num::NonZeroU32;
use std::time::Duration;

use super::errors::{FailoverError, FailoverResult};

/// Default number of candidate search attempts.
pub const DEFAULT_FAILOVER_ATTEMPTS: u32 = 10;

/// Default delay between candidate search attempts.
pub const DEFAULT_ATTEMPT_INTERVAL: Duration = Duration::from_secs(60);

/// Attempt bound and inter-attempt delay for one failover search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverPolicy {
    max_attempts: NonZeroU32,
    attempt_interval: Duration,
}

impl FailoverPolicy {
    /// Create a policy. `max_attempts` must be positive.
    pub fn new(max_attempts: u32, attempt_interval: Duration) -> FailoverResult<Self> {
        let max_attempts = NonZeroU32::new(max_attempts).ok_or_else(|| {
            FailoverError::configuration("failover attempts must be greater than zero")
        })?;
        Ok(Self {
            max_attempts,
            attempt_interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    pub fn attempt_interval(&self) -> Duration {
        self.attempt_interval
    }

    /// Upper bound on time spent sleeping during one search.
    ///
    /// There is no sleep after the final attempt.
    pub fn max_search_delay(&self) -> Duration {
        self.attempt_interval
            .saturating_mul(self.max_attempts.get() - 1)
    }
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(DEFAULT_FAILOVER_ATTEMPTS)
                .unwrap_or(NonZeroU32::MIN),
            attempt_interval: DEFAULT_ATTEMPT_INTERVAL,
        }
    }
}
