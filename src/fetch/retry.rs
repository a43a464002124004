use super::Fetcher;
use crate::verify::{verify_artifact, VerificationPolicy};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Bound and pacing of the download attempt loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Result of the attempt loop for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOutcome {
    pub succeeded: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Fetch `url` into `destination` until a copy passes verification or the
/// attempt budget is spent.
///
/// A failed final attempt is left on disk for inspection.
#[allow(clippy::too_many_arguments)]
pub async fn fetch_with_retries(
    fetcher: &dyn Fetcher,
    url: &str,
    destination: &Path,
    token: &str,
    expected_size: Option<u64>,
    expected_hash: Option<&str>,
    verification: VerificationPolicy,
    retry: &RetryPolicy,
) -> RetryOutcome {
    let total = retry.total_attempts();
    let mut last_error = None;

    for attempt in 1..=total {
        debug!(url, attempt, total, "Fetching artifact");

        match fetcher.fetch(url, destination, token).await {
            Ok(()) => {
                if verify_artifact(destination, expected_size, expected_hash, verification).await {
                    return RetryOutcome {
                        succeeded: true,
                        attempts: attempt,
                        last_error: None,
                    };
                }
                last_error = Some("integrity check failed".to_string());
            }
            Err(e) => {
                last_error = Some(e.to_string());
            }
        }

        warn!(
            destination = %destination.display(),
            attempt,
            total,
            error = last_error.as_deref().unwrap_or_default(),
            "Download attempt failed"
        );

        if attempt < total && !retry.delay.is_zero() {
            tokio::time::sleep(retry.delay).await;
        }
    }

    RetryOutcome {
        succeeded: false,
        attempts: total,
        last_error,
    }
}
