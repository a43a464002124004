use super::cancel::CancelToken;
use super::plan::{assess_record, plan_date, DateLayout, PlannedRecord, RecordAction};
use super::summary::{
    DateStatus, DateSummary, OutcomeCounts, ReconciliationOutcome, RecordReport, RunSummary,
};
use crate::fetch::{fetch_with_retries, Fetcher, RetryPolicy};
use crate::inventory::{load_inventory, Inventory, InventoryRecord, RejectedRow};
use crate::utils::{inventory_path, now_iso};
use crate::verify::VerificationPolicy;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("End date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Archive token is empty")]
    EmptyToken,
}

/// Everything a reconciliation run needs, fixed for the duration of the run
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub inventory_root: PathBuf,
    /// Canonical root, authoritative for presence checks
    pub data_root: PathBuf,
    /// Download destination when it differs from `data_root`
    pub staging_root: Option<PathBuf>,
    pub token: String,
    pub policy: VerificationPolicy,
    pub retry: RetryPolicy,
    /// Records processed at the same time within one date
    pub concurrency: usize,
}

impl ReconcileConfig {
    pub fn new(
        inventory_root: impl Into<PathBuf>,
        data_root: impl Into<PathBuf>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            inventory_root: inventory_root.into(),
            data_root: data_root.into(),
            staging_root: None,
            token: token.into(),
            policy: VerificationPolicy::default(),
            retry: RetryPolicy::default(),
            concurrency: 1,
        }
    }

    fn layout(&self, product: &str, date: NaiveDate) -> DateLayout {
        DateLayout::resolve(&self.data_root, self.staging_root.as_deref(), product, date)
    }
}

/// Dry-run result for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatePlan {
    pub date: NaiveDate,
    pub status: DateStatus,
    pub records: Vec<PlannedRecord>,
    /// Rows a real run would report as `InvalidRecord`
    pub rejected: Vec<RejectedRow>,
}

impl DatePlan {
    pub fn downloads(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.action == RecordAction::Download)
            .count()
    }
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ReconcileError> {
    if end < start {
        return Err(ReconcileError::InvalidRange { start, end });
    }
    Ok(())
}

fn days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Number of regular files directly inside `dir`
fn count_present_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

/// `count_present_files` on the blocking pool
async fn present_file_count(dir: PathBuf) -> usize {
    tokio::task::spawn_blocking(move || count_present_files(&dir))
        .await
        .unwrap_or(0)
}

/// Resolve directories and load the inventory, or say why the date is skipped
async fn prepare_date(
    product: &str,
    date: NaiveDate,
    config: &ReconcileConfig,
    create_staging: bool,
) -> Result<(DateLayout, Inventory), DateStatus> {
    let layout = config.layout(product, date);

    if create_staging {
        if let Err(e) = fs::create_dir_all(&layout.staging_dir).await {
            warn!(
                date = %date,
                dir = %layout.staging_dir.display(),
                error = %e,
                "Failed to create staging directory"
            );
            return Err(DateStatus::StagingUnavailable(e.to_string()));
        }
    }

    match load_inventory(&config.inventory_root, product, date).await {
        Ok(Some(inventory)) => Ok((layout, inventory)),
        Ok(None) => {
            let path = inventory_path(&config.inventory_root, product, date);
            warn!(date = %date, path = %path.display(), "Inventory missing");
            Err(DateStatus::NoInventory)
        }
        Err(e) => {
            warn!(date = %date, error = %e, "Inventory unusable, skipping date");
            Err(DateStatus::InventoryUnusable(e.to_string()))
        }
    }
}

/// Shared, read-only state for the records of one date
struct RecordContext {
    product: String,
    date: NaiveDate,
    layout: DateLayout,
    token: String,
    policy: VerificationPolicy,
    retry: RetryPolicy,
    fetcher: Arc<dyn Fetcher>,
}

impl RecordContext {
    fn report(
        &self,
        name: &str,
        outcome: ReconciliationOutcome,
        path: PathBuf,
        attempts: u32,
        last_error: Option<String>,
    ) -> RecordReport {
        RecordReport {
            product: self.product.clone(),
            date: self.date,
            name: name.to_string(),
            outcome,
            path,
            attempts,
            last_error,
        }
    }
}

/// Report a row whose name could not be used, without touching the filesystem
fn reject_record(row: &RejectedRow, ctx: &RecordContext) -> RecordReport {
    warn!(date = %ctx.date, row = row.row, reason = %row.reason, "Invalid inventory row");
    ctx.report(
        &row.name,
        ReconciliationOutcome::InvalidRecord,
        ctx.layout.staging_dir.clone(),
        0,
        Some(format!("inventory row {}: {}", row.row, row.reason)),
    )
}

/// Verify, then fetch if needed, one record
async fn process_record(record: InventoryRecord, ctx: Arc<RecordContext>) -> RecordReport {
    let name = record.name.as_str();

    match assess_record(&record, &ctx.layout, ctx.policy).await {
        RecordAction::UseCanonical => {
            debug!(name, "Already valid in canonical root");
            ctx.report(
                name,
                ReconciliationOutcome::AlreadyValidCanonical,
                ctx.layout.canonical_path(name),
                0,
                None,
            )
        }
        RecordAction::UseStaging => {
            info!(name, "Already staged in output directory");
            ctx.report(
                name,
                ReconciliationOutcome::AlreadyValidStaging,
                ctx.layout.staging_path(name),
                0,
                None,
            )
        }
        RecordAction::Unfetchable => {
            warn!(date = %ctx.date, name, "No download link, cannot fetch");
            ctx.report(
                name,
                ReconciliationOutcome::Unfetchable,
                ctx.layout.staging_path(name),
                0,
                Some("blank download URL".to_string()),
            )
        }
        RecordAction::Download => {
            let destination = ctx.layout.staging_path(name);
            info!(
                date = %ctx.date,
                name,
                destination = %destination.display(),
                "Missing or invalid in canonical root, downloading"
            );

            let outcome = fetch_with_retries(
                ctx.fetcher.as_ref(),
                &record.source_url,
                &destination,
                &ctx.token,
                record.expected_size,
                record.expected_hash.as_deref(),
                ctx.policy,
                &ctx.retry,
            )
            .await;

            if outcome.succeeded {
                ctx.report(
                    name,
                    ReconciliationOutcome::DownloadedOk,
                    destination,
                    outcome.attempts,
                    None,
                )
            } else {
                error!(
                    date = %ctx.date,
                    name,
                    attempts = outcome.attempts,
                    error = outcome.last_error.as_deref().unwrap_or_default(),
                    "Failed after retries"
                );
                ctx.report(
                    name,
                    ReconciliationOutcome::FailedAfterRetries,
                    destination,
                    outcome.attempts,
                    outcome.last_error,
                )
            }
        }
    }
}

/// Reconcile a single (product, date)
pub async fn reconcile_date(
    product: &str,
    date: NaiveDate,
    config: &ReconcileConfig,
    fetcher: Arc<dyn Fetcher>,
    cancel: &CancelToken,
) -> DateSummary {
    let (layout, inventory) = match prepare_date(product, date, config, true).await {
        Ok(prepared) => prepared,
        Err(status) => return DateSummary::skipped(date, status),
    };

    info!(
        date = %date,
        present = present_file_count(layout.canonical_dir.clone()).await,
        expected = inventory.row_count(),
        "Checking date"
    );

    let ctx = Arc::new(RecordContext {
        product: product.to_string(),
        date,
        layout,
        token: config.token.clone(),
        policy: config.policy,
        retry: config.retry,
        fetcher,
    });

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut handles = Vec::with_capacity(inventory.len());
    let mut skipped_cancelled = 0;

    for (index, record) in inventory.records.iter().enumerate() {
        // The semaphore is never closed, so acquisition only fails if that changes
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            skipped_cancelled = inventory.len() - index;
            break;
        };
        if cancel.is_cancelled() {
            skipped_cancelled = inventory.len() - index;
            info!(
                date = %date,
                remaining = skipped_cancelled,
                "Cancelled, not starting remaining records"
            );
            break;
        }

        let record = record.clone();
        let name = record.name.clone();
        let ctx = Arc::clone(&ctx);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            process_record(record, ctx).await
        });
        handles.push((name, handle));
    }

    let mut summary = DateSummary {
        date,
        status: DateStatus::Reconciled,
        expected: inventory.row_count(),
        counts: OutcomeCounts::default(),
        records: Vec::with_capacity(handles.len() + inventory.rejected.len()),
    };

    for (name, handle) in handles {
        let report = match handle.await {
            Ok(report) => report,
            Err(e) => {
                error!(date = %date, name = %name, error = %e, "Record worker failed");
                ctx.report(
                    &name,
                    ReconciliationOutcome::FailedAfterRetries,
                    ctx.layout.staging_path(&name),
                    0,
                    Some(format!("worker failed: {}", e)),
                )
            }
        };
        summary.counts.record(report.outcome);
        summary.records.push(report);
    }
    for row in &inventory.rejected {
        let report = reject_record(row, &ctx);
        summary.counts.record(report.outcome);
        summary.records.push(report);
    }
    summary.counts.skipped_cancelled = skipped_cancelled;

    info!(
        date = %date,
        present = summary.counts.present(),
        downloaded = summary.counts.downloaded_ok,
        failed = summary.counts.failed_after_retries,
        unfetchable = summary.counts.unfetchable,
        invalid = summary.counts.invalid_records,
        "Date reconciled"
    );

    summary
}

/// Reconcile every date from `start` to `end` inclusive.
///
/// Per-date and per-record problems are reported in the summary; only an
/// invalid request is an error.
pub async fn reconcile_range(
    product: &str,
    start: NaiveDate,
    end: NaiveDate,
    config: &ReconcileConfig,
    fetcher: Arc<dyn Fetcher>,
    cancel: &CancelToken,
) -> Result<RunSummary, ReconcileError> {
    validate_range(start, end)?;
    if config.token.trim().is_empty() {
        return Err(ReconcileError::EmptyToken);
    }

    let started_at = now_iso();
    let mut totals = OutcomeCounts::default();
    let mut dates = Vec::new();

    for date in days(start, end) {
        if cancel.is_cancelled() {
            dates.push(DateSummary::skipped(date, DateStatus::Cancelled));
            continue;
        }
        let summary = reconcile_date(product, date, config, Arc::clone(&fetcher), cancel).await;
        totals.merge(&summary.counts);
        dates.push(summary);
    }

    let cancelled = totals.skipped_cancelled > 0
        || dates.iter().any(|d| d.status == DateStatus::Cancelled);

    Ok(RunSummary {
        product: product.to_string(),
        start,
        end,
        policy: config.policy,
        started_at,
        finished_at: now_iso(),
        cancelled,
        totals,
        dates,
    })
}

/// Decide what a run would do for each date, without creating directories or fetching
pub async fn plan_range(
    product: &str,
    start: NaiveDate,
    end: NaiveDate,
    config: &ReconcileConfig,
) -> Result<Vec<DatePlan>, ReconcileError> {
    validate_range(start, end)?;

    let mut plans = Vec::new();
    for date in days(start, end) {
        let plan = match prepare_date(product, date, config, false).await {
            Ok((layout, inventory)) => DatePlan {
                date,
                status: DateStatus::Reconciled,
                records: plan_date(&inventory, &layout, config.policy).await,
                rejected: inventory.rejected,
            },
            Err(status) => DatePlan {
                date,
                status,
                records: Vec::new(),
                rejected: Vec::new(),
            },
        };
        plans.push(plan);
    }
    Ok(plans)
}
