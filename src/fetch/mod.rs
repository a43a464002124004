//! Retrieval of single artifacts from the remote archive.

mod retry;
mod wget;

pub use retry::{
    fetch_with_retries, RetryOutcome, RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
};
pub use wget::WgetFetcher;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to launch transfer tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Transfer tool exited with status {0}")]
    ExitStatus(i32),

    #[error("Transfer tool terminated by signal")]
    Terminated,
}

/// Capability to transfer one URL to one local path.
///
/// Implementations write (or overwrite) exactly `destination` and nothing
/// else. The parent directory already exists. Content is not verified here.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path, token: &str) -> Result<(), FetchError>;
}
