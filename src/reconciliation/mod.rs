mod cancel;
mod execute;
mod plan;
mod summary;

pub use cancel::{cancellation, CancelHandle, CancelToken};
pub use execute::{
    plan_range, reconcile_date, reconcile_range, DatePlan, ReconcileConfig, ReconcileError,
};
pub use plan::{
    assess_record, decide_action, plan_date, DateLayout, PlannedRecord, RecordAction,
};
pub use summary::{
    DateStatus, DateSummary, OutcomeCounts, ReconciliationOutcome, RecordReport, RunSummary,
};
