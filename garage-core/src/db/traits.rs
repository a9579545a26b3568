//! Relational store traits
//!
//! This module defines the boundary between the intake workflow and the
//! storage engine that persists customers, cars, ownership links and
//! service requests.

use std::path::PathBuf;

use crate::error::Result;
use crate::models::{Car, Customer, Mechanic, NewServiceRequest, Ownership, ServiceRequest};

/// Tables whose identifiers are allocated by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdTable {
    ServiceRequest,
    Ownership,
}

impl IdTable {
    /// Table name, also used as the key in the id sequence bookkeeping
    pub fn table_name(&self) -> &'static str {
        match self {
            IdTable::ServiceRequest => "service_requests",
            IdTable::Ownership => "owns",
        }
    }

    /// Primary key column of the table
    pub fn id_column(&self) -> &'static str {
        match self {
            IdTable::ServiceRequest => "rid",
            IdTable::Ownership => "ownership_id",
        }
    }
}

/// Configuration for opening a store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the database file
    pub path: PathBuf,
    /// How long a writer waits for a competing session's lock, in milliseconds
    pub busy_timeout_ms: u64,
    /// Whether to enable write-ahead logging
    pub wal_mode: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("garage.db"),
            busy_timeout_ms: 5000,
            wal_mode: true,
        }
    }
}

/// Core trait for shop storage
///
/// Single-row inserts map one-to-one onto table rows. Operations that must
/// create several rows, or allocate an identifier for the row they insert,
/// are exposed as single calls so a backend can run them in one transaction.
pub trait ShopStore: Send + Sync {
    // =========================================================================
    // Single-row inserts
    // =========================================================================

    /// Inserts a customer; fails with `Conflict` if the id exists
    fn insert_customer(&self, customer: &Customer) -> Result<()>;

    /// Inserts a mechanic; fails with `Conflict` if the id exists
    fn insert_mechanic(&self, mechanic: &Mechanic) -> Result<()>;

    /// Inserts a car; fails with `Conflict` if the VIN exists
    fn insert_car(&self, car: &Car) -> Result<()>;

    /// Inserts an ownership row with an explicit id
    ///
    /// Fails with `Reference` if the customer or car does not exist.
    fn insert_ownership(&self, ownership: &Ownership) -> Result<()>;

    /// Inserts a service request with an explicit id
    ///
    /// Fails with `Reference` if the customer or car does not exist, or the
    /// customer does not own the car.
    fn insert_service_request(&self, request: &ServiceRequest) -> Result<()>;

    // =========================================================================
    // Atomic multi-step operations
    // =========================================================================

    /// Creates a car and links it to a customer in one transaction
    ///
    /// Either both rows exist afterwards or neither does.
    fn register_car(&self, customer_id: i64, car: &Car) -> Result<Ownership>;

    /// Allocates a service request id and inserts the request in one transaction
    fn open_service_request(&self, request: &NewServiceRequest) -> Result<ServiceRequest>;

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Customers whose last name matches exactly, ordered by id
    fn find_customers_by_last_name(&self, last_name: &str) -> Result<Vec<Customer>>;

    /// Cars linked to a customer, ordered by VIN
    fn find_cars_owned_by(&self, customer_id: i64) -> Result<Vec<Car>>;

    fn get_customer(&self, id: i64) -> Result<Option<Customer>>;

    fn get_car(&self, vin: &str) -> Result<Option<Car>>;

    fn get_service_request(&self, id: i64) -> Result<Option<ServiceRequest>>;

    /// The id the next allocation for `table` would hand out, without consuming it
    fn next_available_id(&self, table: IdTable) -> Result<i64>;

    /// Returns statistics about the store
    fn stats(&self) -> Result<StoreStats>;
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub customer_count: usize,
    pub mechanic_count: usize,
    pub car_count: usize,
    pub ownership_count: usize,
    pub service_request_count: usize,
}
