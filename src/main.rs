use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use granule_sync::config::{read_config, SyncConfig, DEFAULT_CONFIG_FILE, TOKEN_ENV_VAR};
use granule_sync::fetch::{RetryPolicy, DEFAULT_MAX_RETRIES};
use granule_sync::reconciliation::{
    cancellation, plan_range, reconcile_range, DatePlan, ReconcileConfig, RecordAction,
    RunSummary,
};
use granule_sync::utils::parse_date;
use granule_sync::VerificationPolicy;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status for configuration problems detected before any date is processed
const EXIT_CONFIG_ERROR: u8 = 2;

/// Granule Sync - download missing or corrupted granules listed in daily inventories
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Product short name (e.g. VJ114IMG)
    product: String,

    /// First date to reconcile (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    start: NaiveDate,

    /// Last date to reconcile, inclusive (defaults to --start)
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// Integrity check: size, hash (alias md5), auto or none
    #[arg(long, default_value_t = VerificationPolicy::Size)]
    verify: VerificationPolicy,

    /// Download destination root, if different from the configured data root
    #[arg(long, alias = "output_dir")]
    output_dir: Option<PathBuf>,

    /// Retries after the first download attempt
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    retries: u32,

    /// Pause between download attempts, in milliseconds
    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Records processed in parallel within a date
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=64))]
    jobs: u16,

    /// Only report what would be downloaded
    #[arg(long)]
    dry_run: bool,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Path to the JSON config file
    #[arg(long, env = "GRANULE_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

async fn load_config(explicit: Option<&Path>) -> Result<SyncConfig> {
    match explicit {
        Some(path) => read_config(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                read_config(path)
                    .await
                    .with_context(|| format!("Failed to load config {}", path.display()))
            } else {
                info!("No {} found, using default roots", DEFAULT_CONFIG_FILE);
                Ok(SyncConfig::default())
            }
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref()).await?;

    let env_token = std::env::var(TOKEN_ENV_VAR).ok();
    let target = config.resolve_target(&args.product, env_token.as_deref())?;
    let product = target.product.as_str();

    let start = args.start;
    let end = args.end.unwrap_or(start);

    let mut reconcile = ReconcileConfig::new(
        config.inventory_root.clone(),
        config.data_root.clone(),
        target.token.clone(),
    );
    reconcile.staging_root = args.output_dir.clone();
    reconcile.policy = args.verify;
    reconcile.retry = RetryPolicy {
        max_retries: args.retries,
        delay: Duration::from_millis(args.retry_delay_ms),
    };
    reconcile.concurrency = usize::from(args.jobs);

    info!(
        product,
        start = %start,
        end = %end,
        verify = %reconcile.policy,
        data_root = %reconcile.data_root.display(),
        staging_root = %reconcile
            .staging_root
            .as_deref()
            .unwrap_or(&reconcile.data_root)
            .display(),
        "Starting reconciliation"
    );

    if args.dry_run {
        let plans = plan_range(product, start, end, &reconcile).await?;
        log_plans(&plans);
        if let Some(path) = &args.summary_json {
            write_json(path, &plans).await?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (handle, cancel) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing downloads already in progress");
            handle.cancel();
        }
    });

    let fetcher = Arc::new(config.wget.clone());
    let summary = reconcile_range(product, start, end, &reconcile, fetcher, &cancel).await?;

    log_summary(&summary);
    if let Some(path) = &args.summary_json {
        write_json(path, &summary).await?;
    }

    if summary.has_failures() || summary.cancelled {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Summary written");
    Ok(())
}

fn log_plans(plans: &[DatePlan]) {
    for plan in plans {
        for record in &plan.records {
            if matches!(record.action, RecordAction::Download | RecordAction::Unfetchable) {
                info!(
                    date = %plan.date,
                    name = %record.name,
                    action = ?record.action,
                    path = %record.path.display(),
                    "Planned"
                );
            }
        }
        for row in &plan.rejected {
            warn!(
                date = %plan.date,
                row = row.row,
                name = %row.name,
                reason = %row.reason,
                "Invalid inventory row"
            );
        }
        info!(
            date = %plan.date,
            status = ?plan.status,
            expected = plan.records.len() + plan.rejected.len(),
            downloads = plan.downloads(),
            "Dry run"
        );
    }
}

fn log_summary(summary: &RunSummary) {
    for date in summary.skipped_dates() {
        warn!(date = %date.date, status = ?date.status, "Date skipped");
    }
    for failure in summary.failures() {
        error!(
            product = %failure.product,
            date = %failure.date,
            name = %failure.name,
            error = failure.last_error.as_deref().unwrap_or_default(),
            "Failed after retries"
        );
    }

    let totals = &summary.totals;
    info!(
        already_valid_canonical = totals.already_valid_canonical,
        already_valid_staging = totals.already_valid_staging,
        downloaded = totals.downloaded_ok,
        failed = totals.failed_after_retries,
        unfetchable = totals.unfetchable,
        invalid = totals.invalid_records,
        skipped_cancelled = totals.skipped_cancelled,
        "Done. Files present: {}",
        totals.present()
    );

    if summary.cancelled {
        warn!("Run was cancelled before all records were processed");
    }
}
