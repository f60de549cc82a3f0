//! Bounded polling for eventually-consistent provider listings.
//!
//! Freshly-issued credentials and freshly-created resources can take a while
//! to become visible in a cloud provider's read path. This module wraps any
//! listing call with a fixed-interval poll so consumers never need retry
//! logic of their own: failures inside the poll window are treated as "not
//! yet ready", and only budget exhaustion surfaces an error.
//!
//! # Example
//!
//! ```ignore
//! use trellis::retry::{retry_until_ready, PollConfig};
//!
//! let subnets = retry_until_ready(
//!     &PollConfig::default(),
//!     "describe_subnets",
//!     || async { api.describe_subnets().await },
//! ).await?;
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error};

use crate::{Error, Result};

/// Polling policy for eventually-consistent listings.
///
/// An explicit policy object rather than an inline loop, so the poll can be
/// driven by a paused test clock and tuned per call site.
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Fixed delay between attempts
    pub interval: Duration,
    /// Total elapsed budget before the poll gives up
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollConfig {
    /// Create a config with the given interval and total budget
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Execute an async operation repeatedly until it succeeds or the budget is
/// exhausted.
///
/// The operation is invoked immediately; on failure it is retried every
/// `config.interval` until `config.timeout` has elapsed. Errors from the
/// operation are swallowed while polling - only exhaustion reports an
/// [`Error::Timeout`] wrapping the last failure. An already-exhausted budget
/// fails immediately without sleeping for an interval.
///
/// # Arguments
/// * `config` - Polling policy
/// * `operation_name` - Name for logging and the timeout message
/// * `operation` - The async operation to poll
pub async fn retry_until_ready<F, Fut, T, E>(
    config: &PollConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    if config.timeout.is_zero() {
        error!(operation = %operation_name, "Poll budget exhausted before first attempt");
        return Err(Error::timeout(format!(
            "{operation_name}: condition never became true"
        )));
    }

    let deadline = Instant::now() + config.timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let last_error = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                debug!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    "Listing not ready, will retry"
                );
                e
            }
        };

        if Instant::now() >= deadline {
            error!(
                operation = %operation_name,
                attempt = attempt,
                error = %last_error,
                "Poll budget exhausted"
            );
            return Err(Error::timeout(format!(
                "{operation_name}: last error: {last_error}"
            )));
        }

        tokio::time::sleep(config.interval).await;
    }
}
