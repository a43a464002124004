//! Local artifact verification.
//!
//! A file is accepted under one of four policies. Hash-based checks degrade to
//! size checks when the catalog did not report a hash, and size checks degrade
//! to existence when it did not report a size either.

use crate::utils::{compute_file_digest, HashAlgorithm};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::debug;

/// How strictly a local file is checked against its inventory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationPolicy {
    /// Hash if reported, else size if reported, else existence
    #[default]
    Auto,
    /// Hash required when reported, else size
    Hash,
    /// Size required when reported, else existence
    Size,
    /// Existence only
    None,
}

impl fmt::Display for VerificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationPolicy::Auto => "auto",
            VerificationPolicy::Hash => "hash",
            VerificationPolicy::Size => "size",
            VerificationPolicy::None => "none",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for VerificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(VerificationPolicy::Auto),
            "hash" | "md5" => Ok(VerificationPolicy::Hash),
            "size" => Ok(VerificationPolicy::Size),
            "none" => Ok(VerificationPolicy::None),
            other => Err(format!(
                "unknown verification policy '{}' (expected auto, hash, size or none)",
                other
            )),
        }
    }
}

/// The check actually performed after degrading the policy to what the record reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<'a> {
    Hash(&'a str),
    Size(u64),
    Exists,
}

/// Resolve which check applies for a policy and the metadata at hand
pub fn effective_check<'a>(
    policy: VerificationPolicy,
    expected_size: Option<u64>,
    expected_hash: Option<&'a str>,
) -> Check<'a> {
    let hash = expected_hash.map(str::trim).filter(|h| !h.is_empty());

    match policy {
        VerificationPolicy::None => Check::Exists,
        VerificationPolicy::Auto | VerificationPolicy::Hash => match (hash, expected_size) {
            (Some(h), _) => Check::Hash(h),
            (None, Some(size)) => Check::Size(size),
            (None, None) => Check::Exists,
        },
        VerificationPolicy::Size => match expected_size {
            Some(size) => Check::Size(size),
            None => Check::Exists,
        },
    }
}

/// Decide whether the file at `path` is acceptable.
///
/// Never errors: a missing file, a stat failure or a read failure while
/// hashing all count as "not acceptable".
pub async fn verify_artifact(
    path: &Path,
    expected_size: Option<u64>,
    expected_hash: Option<&str>,
    policy: VerificationPolicy,
) -> bool {
    let metadata = match fs::metadata(path).await {
        Ok(m) if m.is_file() => m,
        _ => return false,
    };

    match effective_check(policy, expected_size, expected_hash) {
        Check::Exists => true,
        Check::Size(size) => metadata.len() == size,
        Check::Hash(expected) => {
            let Some(algorithm) = HashAlgorithm::for_hex_digest(expected) else {
                debug!(path = %path.display(), expected, "Unrecognized digest width");
                return false;
            };
            match compute_file_digest(path, algorithm).await {
                Ok(actual) => actual.eq_ignore_ascii_case(expected),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Hashing failed");
                    false
                }
            }
        }
    }
}
