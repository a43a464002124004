use crate::verify::VerificationPolicy;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// What happened to one inventory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconciliationOutcome {
    /// A valid copy already exists under the canonical root
    AlreadyValidCanonical,
    /// A valid copy already exists under the staging root
    AlreadyValidStaging,
    DownloadedOk,
    FailedAfterRetries,
    /// The record has no download URL
    Unfetchable,
    /// The inventory row has a blank, path-like or duplicate name
    InvalidRecord,
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReconciliationOutcome::AlreadyValidCanonical => "already valid (canonical)",
            ReconciliationOutcome::AlreadyValidStaging => "already valid (staging)",
            ReconciliationOutcome::DownloadedOk => "downloaded",
            ReconciliationOutcome::FailedAfterRetries => "failed after retries",
            ReconciliationOutcome::Unfetchable => "unfetchable",
            ReconciliationOutcome::InvalidRecord => "invalid record",
        };
        write!(f, "{}", s)
    }
}

/// Per-record detail kept for the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReport {
    pub product: String,
    pub date: NaiveDate,
    pub name: String,
    pub outcome: ReconciliationOutcome,
    /// The copy that satisfied the record, or the download destination
    pub path: PathBuf,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Tally of outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCounts {
    pub already_valid_canonical: usize,
    pub already_valid_staging: usize,
    pub downloaded_ok: usize,
    pub failed_after_retries: usize,
    pub unfetchable: usize,
    pub invalid_records: usize,
    /// Records never started because the run was cancelled
    pub skipped_cancelled: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: ReconciliationOutcome) {
        match outcome {
            ReconciliationOutcome::AlreadyValidCanonical => self.already_valid_canonical += 1,
            ReconciliationOutcome::AlreadyValidStaging => self.already_valid_staging += 1,
            ReconciliationOutcome::DownloadedOk => self.downloaded_ok += 1,
            ReconciliationOutcome::FailedAfterRetries => self.failed_after_retries += 1,
            ReconciliationOutcome::Unfetchable => self.unfetchable += 1,
            ReconciliationOutcome::InvalidRecord => self.invalid_records += 1,
        }
    }

    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.already_valid_canonical += other.already_valid_canonical;
        self.already_valid_staging += other.already_valid_staging;
        self.downloaded_ok += other.downloaded_ok;
        self.failed_after_retries += other.failed_after_retries;
        self.unfetchable += other.unfetchable;
        self.invalid_records += other.invalid_records;
        self.skipped_cancelled += other.skipped_cancelled;
    }

    /// Records that ended with a usable local copy
    pub fn present(&self) -> usize {
        self.already_valid_canonical + self.already_valid_staging + self.downloaded_ok
    }

    pub fn total(&self) -> usize {
        self.present()
            + self.failed_after_retries
            + self.unfetchable
            + self.invalid_records
            + self.skipped_cancelled
    }
}

/// How a date's processing ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reason")]
pub enum DateStatus {
    Reconciled,
    /// No inventory file exists for the date
    NoInventory,
    /// The inventory exists but could not be trusted
    InventoryUnusable(String),
    /// The staging directory could not be created
    StagingUnavailable(String),
    /// The run was cancelled before this date started
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSummary {
    pub date: NaiveDate,
    pub status: DateStatus,
    /// Number of data rows in the inventory, rejected rows included
    pub expected: usize,
    pub counts: OutcomeCounts,
    pub records: Vec<RecordReport>,
}

impl DateSummary {
    pub fn skipped(date: NaiveDate, status: DateStatus) -> Self {
        Self {
            date,
            status,
            expected: 0,
            counts: OutcomeCounts::default(),
            records: Vec::new(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordReport> {
        self.records
            .iter()
            .filter(|r| r.outcome == ReconciliationOutcome::FailedAfterRetries)
    }
}

/// Outcome of a whole date range
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub product: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub policy: VerificationPolicy,
    pub started_at: String,
    pub finished_at: String,
    pub cancelled: bool,
    pub totals: OutcomeCounts,
    pub dates: Vec<DateSummary>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.totals.failed_after_retries > 0
    }

    /// Every record that ended as `FailedAfterRetries`, across dates
    pub fn failures(&self) -> impl Iterator<Item = &RecordReport> {
        self.dates.iter().flat_map(|d| d.failures())
    }

    /// Dates skipped because of a missing or unusable inventory
    pub fn skipped_dates(&self) -> impl Iterator<Item = &DateSummary> {
        self.dates.iter().filter(|d| {
            !matches!(d.status, DateStatus::Reconciled | DateStatus::Cancelled)
        })
    }
}
