use super::types::{Inventory, InventoryRecord, RejectedRow};
use crate::utils::inventory_path;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::warn;

/// Logical columns every inventory table must provide, matched case-insensitively
pub const NAME_COLUMN: &str = "name";
pub const SIZE_COLUMN: &str = "size";
pub const HASH_COLUMN: &str = "md5sum";
pub const LINK_COLUMN: &str = "downloadslink";

/// Cell values the catalog uses for "not reported"
const MISSING_MARKERS: [&str; 3] = ["", "nan", "none"];

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse inventory: {0}")]
    Parse(#[from] csv::Error),

    #[error("Inventory is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Inventory has more than one column matching '{0}'")]
    AmbiguousColumn(&'static str),
}

/// Positions of the four logical fields in a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    name: usize,
    size: usize,
    hash: usize,
    link: usize,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, InventoryError> {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let find = |want: &'static str| -> Result<usize, InventoryError> {
            let mut hits = lowered
                .iter()
                .enumerate()
                .filter(|(_, h)| h.as_str() == want)
                .map(|(i, _)| i);
            let first = hits.next().ok_or(InventoryError::MissingColumn(want))?;
            if hits.next().is_some() {
                return Err(InventoryError::AmbiguousColumn(want));
            }
            Ok(first)
        };

        Ok(Self {
            name: find(NAME_COLUMN)?,
            size: find(SIZE_COLUMN)?,
            hash: find(HASH_COLUMN)?,
            link: find(LINK_COLUMN)?,
        })
    }
}

fn is_missing(cell: &str) -> bool {
    let lowered = cell.trim().to_lowercase();
    MISSING_MARKERS.contains(&lowered.as_str())
}

/// Parse a size cell. Integral floats such as `1234.0` are accepted.
pub fn normalize_size(cell: &str) -> Option<u64> {
    if is_missing(cell) {
        return None;
    }
    let cell = cell.trim();
    if let Ok(n) = cell.parse::<u64>() {
        return Some(n);
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Some(f as u64)
        }
        _ => None,
    }
}

/// Normalize a hash cell to lowercase hex, or `None` when not reported
pub fn normalize_hash(cell: &str) -> Option<String> {
    if is_missing(cell) {
        None
    } else {
        Some(cell.trim().to_lowercase())
    }
}

fn normalize_url(cell: &str) -> String {
    if is_missing(cell) {
        String::new()
    } else {
        cell.trim().to_string()
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("blank artifact name".to_string());
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(format!("artifact name '{}' is not a plain file name", name));
    }
    Ok(())
}

/// Parse the raw bytes of an inventory table into a typed inventory.
///
/// A row whose name is blank, path-like or repeated is kept aside in
/// `Inventory::rejected`; the other rows are still returned.
pub fn parse_inventory(
    product: &str,
    date: NaiveDate,
    content: &[u8],
) -> Result<Inventory, InventoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let columns = ColumnMap::resolve(reader.headers()?)?;

    let mut inventory = Inventory::new(product, date);
    let mut seen = HashSet::new();

    for (index, row) in reader.records().enumerate() {
        let row = row?;
        // Header is line 1
        let line = index + 2;
        let cell = |i: usize| row.get(i).unwrap_or("");

        let name = cell(columns.name).trim().to_string();
        let checked = validate_name(&name).and_then(|()| {
            if seen.contains(&name) {
                Err(format!("duplicate artifact name '{}'", name))
            } else {
                Ok(())
            }
        });
        if let Err(reason) = checked {
            warn!(
                product,
                date = %date,
                row = line,
                name = %name,
                %reason,
                "Rejecting inventory row"
            );
            inventory.rejected.push(RejectedRow {
                row: line,
                name,
                reason,
            });
            continue;
        }
        seen.insert(name.clone());

        inventory.records.push(InventoryRecord {
            name,
            expected_size: normalize_size(cell(columns.size)),
            expected_hash: normalize_hash(cell(columns.hash)),
            source_url: normalize_url(cell(columns.link)),
        });
    }

    Ok(inventory)
}

/// Load the inventory for a (product, date).
///
/// Returns `Ok(None)` when no inventory file exists for the date, which is not
/// an error: some days have nothing catalogued.
pub async fn load_inventory(
    inventory_root: &Path,
    product: &str,
    date: NaiveDate,
) -> Result<Option<Inventory>, InventoryError> {
    let path = inventory_path(inventory_root, product, date);

    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read(&path)
        .await
        .map_err(|source| InventoryError::Read {
            path: path.clone(),
            source,
        })?;

    parse_inventory(product, date, &content).map(Some)
}
