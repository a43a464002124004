pub mod config;
pub mod fetch;
pub mod inventory;
pub mod product;
pub mod reconciliation;
pub mod utils;
pub mod verify;

// Re-export commonly used types
pub use config::{read_config, ConfigError, SyncConfig};
pub use fetch::{
    fetch_with_retries, FetchError, Fetcher, RetryOutcome, RetryPolicy, WgetFetcher,
};
pub use inventory::{load_inventory, Inventory, InventoryError, InventoryRecord, RejectedRow};
pub use product::{ProductError, ProductRegistry};
pub use reconciliation::{
    cancellation, plan_range, reconcile_range, CancelToken, DatePlan, DateStatus, DateSummary,
    OutcomeCounts, ReconcileConfig, ReconcileError, ReconciliationOutcome, RecordReport,
    RunSummary,
};
pub use verify::{verify_artifact, VerificationPolicy};
