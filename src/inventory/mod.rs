mod loader;
mod types;

pub use loader::{
    load_inventory, normalize_hash, normalize_size, parse_inventory, InventoryError, HASH_COLUMN,
    LINK_COLUMN, NAME_COLUMN, SIZE_COLUMN,
};
pub use types::{Inventory, InventoryRecord, RejectedRow};
