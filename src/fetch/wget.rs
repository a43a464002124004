use super::{FetchError, Fetcher};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

fn default_program() -> String {
    "wget".to_string()
}

/// Transfers artifacts by running `wget` as a child process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WgetFetcher {
    #[serde(default = "default_program")]
    pub program: String,
    /// Pass `--no-check-certificate`. Off unless the config file turns it on.
    #[serde(default)]
    pub no_check_certificate: bool,
}

impl Default for WgetFetcher {
    fn default() -> Self {
        Self {
            program: default_program(),
            no_check_certificate: false,
        }
    }
}

impl WgetFetcher {
    /// Arguments for one transfer. Recursion and mirroring stay off so only
    /// the target URL is retrieved, and `-O` writes it straight to `destination`.
    pub fn args(&self, url: &str, destination: &Path, token: &str) -> Vec<String> {
        let mut args = vec![
            "--no-verbose".to_string(),
            "-e".to_string(),
            "robots=off".to_string(),
        ];
        if self.no_check_certificate {
            args.push("--no-check-certificate".to_string());
        }
        args.push("--header".to_string());
        args.push(format!("Authorization: Bearer {}", token));
        args.push("-O".to_string());
        args.push(destination.to_string_lossy().to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl Fetcher for WgetFetcher {
    async fn fetch(&self, url: &str, destination: &Path, token: &str) -> Result<(), FetchError> {
        debug!(
            program = %self.program,
            url,
            destination = %destination.display(),
            "Running transfer (Authorization: Bearer <redacted>)"
        );

        let status = Command::new(&self.program)
            .args(self.args(url, destination, token))
            .kill_on_drop(true)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(status
                .code()
                .map(FetchError::ExitStatus)
                .unwrap_or(FetchError::Terminated))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_carry_token_and_destination() {
        let fetcher = WgetFetcher::default();
        let dest = PathBuf::from("/data/A.nc");
        let args = fetcher.args("http://x/A.nc", &dest, "secret");

        assert!(args.contains(&"Authorization: Bearer secret".to_string()));
        let o = args.iter().position(|a| a == "-O").unwrap();
        assert_eq!(args[o + 1], "/data/A.nc");
        assert_eq!(args.last().unwrap(), "http://x/A.nc");
        assert!(!args.iter().any(|a| a == "-m" || a == "-r" || a == "--mirror"));
        assert!(!args.contains(&"--no-check-certificate".to_string()));
    }

    #[test]
    fn test_certificates_checked_unless_configured() {
        let fetcher: WgetFetcher = serde_json::from_str("{}").unwrap();
        assert!(!fetcher.no_check_certificate);
        assert_eq!(fetcher.program, "wget");
        let args = fetcher.args("u", Path::new("d"), "t");
        assert!(!args.contains(&"--no-check-certificate".to_string()));
    }

    #[test]
    fn test_insecure_flag() {
        let fetcher = WgetFetcher {
            no_check_certificate: true,
            ..Default::default()
        };
        let args = fetcher.args("u", Path::new("d"), "t");
        assert!(args.contains(&"--no-check-certificate".to_string()));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let fetcher = WgetFetcher {
            program: "/nonexistent/wget-binary".to_string(),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = fetcher
            .fetch("http://x/A.nc", &dir.path().join("A.nc"), "t")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Spawn(_)));
    }
}
