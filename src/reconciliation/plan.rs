//! Decision logic: which records need a download.
//!
//! `decide_action` is pure. `assess_record` feeds it with verification
//! results for the canonical and staging copies and performs no writes.

use crate::inventory::{Inventory, InventoryRecord};
use crate::utils::artifact_dir;
use crate::verify::{verify_artifact, VerificationPolicy};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What to do for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordAction {
    UseCanonical,
    UseStaging,
    Unfetchable,
    Download,
}

/// Canonical before staging, staging before fetching
pub fn decide_action(canonical_valid: bool, staging_valid: bool, fetchable: bool) -> RecordAction {
    if canonical_valid {
        RecordAction::UseCanonical
    } else if staging_valid {
        RecordAction::UseStaging
    } else if !fetchable {
        RecordAction::Unfetchable
    } else {
        RecordAction::Download
    }
}

/// Canonical and staging directories for one (product, date)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateLayout {
    pub canonical_dir: PathBuf,
    pub staging_dir: PathBuf,
}

impl DateLayout {
    pub fn resolve(
        data_root: &Path,
        staging_root: Option<&Path>,
        product: &str,
        date: NaiveDate,
    ) -> Self {
        let canonical_dir = artifact_dir(data_root, product, date);
        let staging_dir = match staging_root {
            Some(root) => artifact_dir(root, product, date),
            None => canonical_dir.clone(),
        };
        Self {
            canonical_dir,
            staging_dir,
        }
    }

    /// False when staging and canonical are the same directory
    pub fn has_separate_staging(&self) -> bool {
        self.canonical_dir != self.staging_dir
    }

    pub fn canonical_path(&self, name: &str) -> PathBuf {
        self.canonical_dir.join(name)
    }

    pub fn staging_path(&self, name: &str) -> PathBuf {
        self.staging_dir.join(name)
    }
}

/// Verify the existing copies of a record and decide what to do
pub async fn assess_record(
    record: &InventoryRecord,
    layout: &DateLayout,
    policy: VerificationPolicy,
) -> RecordAction {
    let size = record.expected_size;
    let hash = record.expected_hash.as_deref();

    let canonical_valid =
        verify_artifact(&layout.canonical_path(&record.name), size, hash, policy).await;

    let staging_valid = !canonical_valid
        && layout.has_separate_staging()
        && verify_artifact(&layout.staging_path(&record.name), size, hash, policy).await;

    decide_action(canonical_valid, staging_valid, record.is_fetchable())
}

/// A record with the action a real run would take
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRecord {
    pub name: String,
    pub action: RecordAction,
    pub path: PathBuf,
}

/// Assess every record of an inventory, in inventory order
pub async fn plan_date(
    inventory: &Inventory,
    layout: &DateLayout,
    policy: VerificationPolicy,
) -> Vec<PlannedRecord> {
    let mut planned = Vec::with_capacity(inventory.len());
    for record in &inventory.records {
        let action = assess_record(record, layout, policy).await;
        let path = match action {
            RecordAction::UseCanonical => layout.canonical_path(&record.name),
            _ => layout.staging_path(&record.name),
        };
        planned.push(PlannedRecord {
            name: record.name.clone(),
            action,
            path,
        });
    }
    planned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_action_precedence() {
        assert_eq!(decide_action(true, true, true), RecordAction::UseCanonical);
        assert_eq!(decide_action(true, false, false), RecordAction::UseCanonical);
        assert_eq!(decide_action(false, true, false), RecordAction::UseStaging);
        assert_eq!(decide_action(false, false, false), RecordAction::Unfetchable);
        assert_eq!(decide_action(false, false, true), RecordAction::Download);
    }

    #[test]
    fn test_layout_without_staging_root() {
        let date = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        let layout = DateLayout::resolve(Path::new("/data"), None, "MOD14", date);
        assert!(!layout.has_separate_staging());
        assert_eq!(layout.staging_path("a"), PathBuf::from("/data/MOD14/2020/032/a"));
    }

    #[test]
    fn test_layout_with_staging_root() {
        let date = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        let layout = DateLayout::resolve(
            Path::new("/data"),
            Some(Path::new("/stage")),
            "MOD14",
            date,
        );
        assert!(layout.has_separate_staging());
        assert_eq!(layout.canonical_path("a"), PathBuf::from("/data/MOD14/2020/032/a"));
        assert_eq!(layout.staging_path("a"), PathBuf::from("/stage/MOD14/2020/032/a"));
    }

    #[tokio::test]
    async fn test_assess_prefers_canonical_over_stale_staging() {
        let canonical = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let layout = DateLayout::resolve(canonical.path(), Some(staging.path()), "P", date);
        tokio::fs::create_dir_all(&layout.canonical_dir).await.unwrap();
        tokio::fs::create_dir_all(&layout.staging_dir).await.unwrap();
        tokio::fs::write(layout.canonical_path("a"), "12345").await.unwrap();
        tokio::fs::write(layout.staging_path("a"), "1").await.unwrap();

        let record = InventoryRecord {
            name: "a".into(),
            expected_size: Some(5),
            expected_hash: None,
            source_url: String::new(),
        };
        let action = assess_record(&record, &layout, VerificationPolicy::Size).await;
        assert_eq!(action, RecordAction::UseCanonical);
    }
}
