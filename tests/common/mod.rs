#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use granule_sync::fetch::{FetchError, Fetcher, RetryPolicy};
use granule_sync::reconciliation::{DateLayout, ReconcileConfig};
use granule_sync::utils::inventory_path;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const PRODUCT: &str = "VJ114IMG";
pub const TOKEN: &str = "test-token";

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Should create temp dir")
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Roots laid out under one temp dir: INFOR/, DATA/ and STAGE/
pub struct Roots {
    pub dir: TempDir,
}

impl Roots {
    pub fn new() -> Self {
        Self {
            dir: create_test_dir(),
        }
    }

    pub fn inventory_root(&self) -> std::path::PathBuf {
        self.dir.path().join("INFOR")
    }

    pub fn data_root(&self) -> std::path::PathBuf {
        self.dir.path().join("DATA")
    }

    pub fn staging_root(&self) -> std::path::PathBuf {
        self.dir.path().join("STAGE")
    }

    /// Config without a separate staging root and without retry delay
    pub fn config(&self) -> ReconcileConfig {
        let mut config = ReconcileConfig::new(self.inventory_root(), self.data_root(), TOKEN);
        config.retry = RetryPolicy {
            max_retries: 2,
            delay: Duration::ZERO,
        };
        config
    }

    pub fn config_with_staging(&self) -> ReconcileConfig {
        let mut config = self.config();
        config.staging_root = Some(self.staging_root());
        config
    }

    /// Canonical under DATA/, staging under STAGE/
    pub fn staged_layout(&self, date: NaiveDate) -> DateLayout {
        DateLayout::resolve(&self.data_root(), Some(&self.staging_root()), PRODUCT, date)
    }

    pub fn write_inventory(&self, date: NaiveDate, csv: &str) {
        let path = inventory_path(&self.inventory_root(), PRODUCT, date);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, csv).unwrap();
    }
}

/// One inventory row
pub fn row(name: &str, size: Option<u64>, hash: Option<&str>, url: &str) -> String {
    format!(
        "{},{},{},{}\n",
        name,
        size.map(|s| s.to_string()).unwrap_or_default(),
        hash.unwrap_or(""),
        url
    )
}

pub fn inventory_csv(rows: &[String]) -> String {
    let mut csv = String::from("name,size,md5sum,downloadsLink\n");
    for r in rows {
        csv.push_str(r);
    }
    csv
}

pub fn md5_hex(content: &[u8]) -> String {
    use md5::{Digest, Md5};
    hex::encode(Md5::digest(content))
}

pub fn write_file(path: &Path, content: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Fetcher stub serving fixed content per URL and counting calls
#[derive(Default)]
pub struct StubFetcher {
    content: HashMap<String, Vec<u8>>,
    calls: AtomicU32,
    seen_tokens: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving(mut self, url: &str, content: &[u8]) -> Self {
        self.content.insert(url.to_string(), content.to_vec());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str, destination: &Path, token: &str) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens.lock().unwrap().push(token.to_string());
        match self.content.get(url) {
            Some(bytes) => {
                tokio::fs::write(destination, bytes).await?;
                Ok(())
            }
            None => Err(FetchError::ExitStatus(8)),
        }
    }
}
