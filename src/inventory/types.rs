use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One expected artifact from a day's catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub name: String,
    pub expected_size: Option<u64>,
    /// Lowercase hex digest
    pub expected_hash: Option<String>,
    pub source_url: String,
}

impl InventoryRecord {
    /// A record without a retrieval location can never be fetched
    pub fn is_fetchable(&self) -> bool {
        !self.source_url.trim().is_empty()
    }
}

/// A row left out of the inventory because its artifact name cannot be used
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    /// Line in the inventory file, the header being line 1
    pub row: usize,
    pub name: String,
    pub reason: String,
}

/// The ordered records catalogued for one (product, date)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    pub product: String,
    pub date: NaiveDate,
    pub records: Vec<InventoryRecord>,
    /// Rows with a blank, path-like or duplicate name, in file order
    pub rejected: Vec<RejectedRow>,
}

impl Inventory {
    pub fn new(product: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            product: product.into(),
            date,
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Usable records only
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Every data row of the file, rejected ones included
    pub fn row_count(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
