//! SQLite database storage backend
//!
//! This backend stores shop data in a SQLite database file. Several operator
//! sessions may share one file; every write that allocates an id or creates
//! more than one row runs in a `BEGIN IMMEDIATE` transaction so sessions
//! serialize on the write lock.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Result, ShopError};
use crate::models::{Car, Customer, Mechanic, NewServiceRequest, Ownership, ServiceRequest};

use super::allocator;
use super::traits::{IdTable, ShopStore, StoreConfig, StoreStats};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite backend implementation
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a store at `path` with default settings
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(&StoreConfig {
            path: path.as_ref().to_path_buf(),
            ..StoreConfig::default()
        })
    }

    /// Opens (or creates) a store described by `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.path.clone();

        // Create parent directories if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ShopError::Connectivity(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(&path)?;
        Self::from_connection(path, conn, config)
    }

    /// Opens a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(PathBuf::from(":memory:"), conn, &StoreConfig::default())
    }

    fn from_connection(path: PathBuf, conn: Connection, config: &StoreConfig) -> Result<Self> {
        // Wait for competing sessions before touching the journal mode
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self {
            path,
            conn: Mutex::new(conn),
        };

        store.init_schema()?;
        tracing::debug!(path = %store.path.display(), "opened shop database");
        Ok(store)
    }

    /// Returns the path to the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ShopError::Connectivity("connection lock poisoned".to_string()))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        let has_version_table: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
            [],
            |row| row.get(0),
        )?;

        let current_version: i32 = if has_version_table {
            conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
                .optional()?
                .unwrap_or(0)
        } else {
            0
        };

        if current_version == 0 {
            conn.execute_batch(include_str!("schema.sql"))?;
        } else if current_version != SCHEMA_VERSION {
            return Err(ShopError::Connectivity(format!(
                "database schema version {} is not supported, expected {}",
                current_version, SCHEMA_VERSION
            )));
        }

        Ok(())
    }

    fn count(conn: &Connection, table: &str) -> Result<usize> {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

// =========================================================================
// Row mapping
// =========================================================================

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
    })
}

fn car_from_row(row: &Row<'_>) -> rusqlite::Result<Car> {
    Ok(Car {
        vin: row.get(0)?,
        make: row.get(1)?,
        model: row.get(2)?,
        year: row.get(3)?,
    })
}

fn service_request_from_row(row: &Row<'_>) -> rusqlite::Result<ServiceRequest> {
    let created_at_str: String = row.get(3)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ServiceRequest {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        car_vin: row.get(2)?,
        created_at,
        odometer: row.get(4)?,
        complaint: row.get(5)?,
    })
}

// =========================================================================
// Statement helpers, usable on a plain connection or inside a transaction
// =========================================================================

fn customer_exists(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?)
}

fn car_exists(conn: &Connection, vin: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM cars WHERE vin = ?1)",
        [vin],
        |row| row.get(0),
    )?)
}

fn is_owner(conn: &Connection, customer_id: i64, vin: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM owns WHERE customer_id = ?1 AND car_vin = ?2)",
        params![customer_id, vin],
        |row| row.get(0),
    )?)
}

fn require_customer_and_car(conn: &Connection, customer_id: i64, vin: &str) -> Result<()> {
    if !customer_exists(conn, customer_id)? {
        return Err(ShopError::reference(format!("customer {customer_id} does not exist")));
    }
    if !car_exists(conn, vin)? {
        return Err(ShopError::reference(format!("car {vin} does not exist")));
    }
    Ok(())
}

fn insert_car_row(conn: &Connection, car: &Car) -> Result<()> {
    if car_exists(conn, &car.vin)? {
        return Err(ShopError::conflict(format!("a car with VIN {} already exists", car.vin)));
    }
    conn.execute(
        "INSERT INTO cars (vin, make, model, year) VALUES (?1, ?2, ?3, ?4)",
        params![car.vin, car.make, car.model, car.year],
    )?;
    Ok(())
}

fn insert_ownership_row(conn: &Connection, ownership: &Ownership) -> Result<()> {
    require_customer_and_car(conn, ownership.customer_id, &ownership.car_vin)?;
    conn.execute(
        "INSERT INTO owns (ownership_id, customer_id, car_vin) VALUES (?1, ?2, ?3)",
        params![ownership.id, ownership.customer_id, ownership.car_vin],
    )?;
    Ok(())
}

fn insert_service_request_row(conn: &Connection, request: &ServiceRequest) -> Result<()> {
    require_customer_and_car(conn, request.customer_id, &request.car_vin)?;
    if !is_owner(conn, request.customer_id, &request.car_vin)? {
        return Err(ShopError::reference(format!(
            "customer {} does not own car {}",
            request.customer_id, request.car_vin
        )));
    }
    conn.execute(
        "INSERT INTO service_requests (rid, customer_id, car_vin, date, odometer, complain)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            request.id,
            request.customer_id,
            request.car_vin,
            request.created_at.to_rfc3339(),
            request.odometer,
            request.complaint,
        ],
    )?;
    Ok(())
}

impl ShopStore for SqliteStore {
    fn insert_customer(&self, customer: &Customer) -> Result<()> {
        let conn = self.lock()?;
        if customer_exists(&conn, customer.id)? {
            return Err(ShopError::conflict(format!("customer {} already exists", customer.id)));
        }
        conn.execute(
            "INSERT INTO customers (id, fname, lname, phone, address) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                customer.id,
                customer.first_name,
                customer.last_name,
                customer.phone,
                customer.address,
            ],
        )?;
        tracing::info!(customer_id = customer.id, "customer added");
        Ok(())
    }

    fn insert_mechanic(&self, mechanic: &Mechanic) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO mechanics (id, fname, lname, experience) VALUES (?1, ?2, ?3, ?4)",
            params![mechanic.id, mechanic.first_name, mechanic.last_name, mechanic.experience],
        )
        .map_err(|e| match ShopError::from(e) {
            ShopError::Conflict(_) => {
                ShopError::conflict(format!("mechanic {} already exists", mechanic.id))
            }
            other => other,
        })?;
        tracing::info!(mechanic_id = mechanic.id, "mechanic added");
        Ok(())
    }

    fn insert_car(&self, car: &Car) -> Result<()> {
        let conn = self.lock()?;
        insert_car_row(&conn, car)?;
        tracing::info!(vin = %car.vin, "car added");
        Ok(())
    }

    fn insert_ownership(&self, ownership: &Ownership) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_ownership_row(&tx, ownership)?;
        allocator::observe(&tx, IdTable::Ownership, ownership.id)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_service_request(&self, request: &ServiceRequest) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_service_request_row(&tx, request)?;
        allocator::observe(&tx, IdTable::ServiceRequest, request.id)?;
        tx.commit()?;
        Ok(())
    }

    fn register_car(&self, customer_id: i64, car: &Car) -> Result<Ownership> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !customer_exists(&tx, customer_id)? {
            return Err(ShopError::reference(format!("customer {customer_id} does not exist")));
        }
        insert_car_row(&tx, car)?;

        let ownership = Ownership {
            id: allocator::allocate(&tx, IdTable::Ownership)?,
            customer_id,
            car_vin: car.vin.clone(),
        };
        insert_ownership_row(&tx, &ownership)?;

        tx.commit()?;
        tracing::info!(
            customer_id,
            vin = %car.vin,
            ownership_id = ownership.id,
            "car registered to customer"
        );
        Ok(ownership)
    }

    fn open_service_request(&self, request: &NewServiceRequest) -> Result<ServiceRequest> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created = ServiceRequest {
            id: allocator::allocate(&tx, IdTable::ServiceRequest)?,
            customer_id: request.customer_id,
            car_vin: request.car_vin.clone(),
            created_at: Utc::now(),
            odometer: request.odometer,
            complaint: request.complaint.clone(),
        };
        insert_service_request_row(&tx, &created)?;

        tx.commit()?;
        tracing::info!(
            request_id = created.id,
            customer_id = created.customer_id,
            vin = %created.car_vin,
            "service request opened"
        );
        Ok(created)
    }

    fn find_customers_by_last_name(&self, last_name: &str) -> Result<Vec<Customer>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, fname, lname, phone, address FROM customers WHERE lname = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([last_name.trim()], customer_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_cars_owned_by(&self, customer_id: i64) -> Result<Vec<Car>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.vin, c.make, c.model, c.year
             FROM owns o JOIN cars c ON c.vin = o.car_vin
             WHERE o.customer_id = ?1
             ORDER BY c.vin",
        )?;
        let rows = stmt.query_map([customer_id], car_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, fname, lname, phone, address FROM customers WHERE id = ?1",
                [id],
                customer_from_row,
            )
            .optional()?)
    }

    fn get_car(&self, vin: &str) -> Result<Option<Car>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT vin, make, model, year FROM cars WHERE vin = ?1",
                [vin],
                car_from_row,
            )
            .optional()?)
    }

    fn get_service_request(&self, id: i64) -> Result<Option<ServiceRequest>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT rid, customer_id, car_vin, date, odometer, complain
                 FROM service_requests WHERE rid = ?1",
                [id],
                service_request_from_row,
            )
            .optional()?)
    }

    fn next_available_id(&self, table: IdTable) -> Result<i64> {
        let conn = self.lock()?;
        allocator::peek(&conn, table)
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        Ok(StoreStats {
            customer_count: Self::count(&conn, "customers")?,
            mechanic_count: Self::count(&conn, "mechanics")?,
            car_count: Self::count(&conn, "cars")?,
            ownership_count: Self::count(&conn, "owns")?,
            service_request_count: Self::count(&conn, "service_requests")?,
        })
    }
}
