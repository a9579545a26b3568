//! Database layer for the shop
//!
//! This module provides the `ShopStore` trait that the intake workflow talks
//! to, the SQLite implementation of it, id allocation, and the fixed reports.

mod allocator;
mod reports;
mod sqlite_backend;
mod traits;

pub use reports::{CustomerBillRow, FleetOwnerRow, LowBillRow, ServiceCountRow, VintageCarRow};
pub use sqlite_backend::SqliteStore;
pub use traits::{IdTable, ShopStore, StoreConfig, StoreStats};

use crate::error::Result;

/// Opens an existing database or creates a new one
pub fn open_or_create(config: &StoreConfig) -> Result<SqliteStore> {
    SqliteStore::open(config)
}
