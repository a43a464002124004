mod hash;

pub use hash::{compute_file_digest, HashAlgorithm, HASH_BLOCK_SIZE};

use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

/// Extension of the per-day inventory tables
pub const INVENTORY_EXTENSION: &str = "csv";

/// Date format used on the command line and in inventory file names
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ordinal day of year (1-366)
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

/// Get the path of a day's inventory: `<root>/<product>/<YYYY>/<YYYY-MM-DD>.csv`
pub fn inventory_path(inventory_root: &Path, product: &str, date: NaiveDate) -> PathBuf {
    inventory_root
        .join(product)
        .join(format!("{:04}", date.year()))
        .join(format!("{}.{}", date.format(DATE_FORMAT), INVENTORY_EXTENSION))
}

/// Get the directory holding a day's artifacts: `<root>/<product>/<YYYY>/<DDD>`
pub fn artifact_dir(root: &Path, product: &str, date: NaiveDate) -> PathBuf {
    root.join(product)
        .join(format!("{:04}", date.year()))
        .join(format!("{:03}", day_of_year(date)))
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}
