//! Retry-until-match primitives shared by every cloud collection.
//!
//! Polling is sequential: one fetch, then a fixed sleep, until the condition
//! holds or the deadline passes. The first fetch happens immediately and the
//! last one no later than the deadline, so a condition that becomes true
//! before the deadline is observed at most one interval later.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{HarnessError, Result};

/// Timeout and poll interval for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Accepted number of matches, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub min: usize,
    pub max: Option<usize>,
}

impl Default for CountRange {
    fn default() -> Self {
        Self::at_least(1)
    }
}

impl CountRange {
    pub fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Asserts absence.
    pub fn none() -> Self {
        Self::exactly(0)
    }

    /// Build from optional keyword arguments, defaulting to `min = 1`.
    pub fn from_bounds(min: Option<usize>, max: Option<usize>) -> Self {
        Self {
            min: min.unwrap_or(if max == Some(0) { 0 } else { 1 }),
            max,
        }
    }

    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.is_none_or(|max| n <= max)
    }
}

impl Display for CountRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) => write!(f, "min={}, max={}", self.min, max),
            None => write!(f, "min={}", self.min),
        }
    }
}

/// Poll `fetch` until it yields `Some`.
///
/// Fetch errors are logged and retried; the last one is reported on timeout.
pub async fn wait_for_result<T, F, Fut>(
    config: RetryConfig,
    description: &str,
    mut fetch: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut attempts = 0u32;
    let mut last_error: Option<String> = None;

    loop {
        attempts += 1;
        match fetch().await {
            Ok(Some(value)) => {
                debug!(attempts, "{} satisfied", description);
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) => {
                debug!(attempts, error = %e, "{} attempt failed", description);
                last_error = Some(e.to_string());
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(HarnessError::AssertionTimeout {
                description: description.to_string(),
                criteria: last_error
                    .map(|e| format!("last error: {e}"))
                    .unwrap_or_else(|| format!("{attempts} attempts")),
                last_count: 0,
                timeout: config.timeout,
            });
        }
        sleep(config.interval.min(deadline - now)).await;
    }
}

/// Poll `fetch` until the number of returned records lies in `range`.
///
/// Records are returned in the order the source produced them.
pub async fn assert_count<T, F, Fut>(
    config: RetryConfig,
    description: &str,
    range: CountRange,
    criteria: &(dyn Display + Sync),
    mut fetch: F,
) -> Result<Vec<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let last_count = AtomicUsize::new(0);

    let result = wait_for_result(config, description, || {
        let pending = fetch();
        let last_count = &last_count;
        async move {
            let items = pending.await?;
            last_count.store(items.len(), Ordering::Relaxed);
            Ok(range.contains(items.len()).then_some(items))
        }
    })
    .await;

    result.map_err(|e| match e {
        HarnessError::AssertionTimeout {
            description,
            timeout,
            ..
        } => HarnessError::AssertionTimeout {
            description,
            criteria: format!("{range}, {criteria}"),
            last_count: last_count.load(Ordering::Relaxed),
            timeout,
        },
        other => other,
    })
}
