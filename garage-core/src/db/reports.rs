//! Fixed aggregate reports over the shop database

use serde::Serialize;

use super::sqlite_backend::SqliteStore;
use crate::error::{Result, ShopError};

/// A customer whose closed request was billed below the limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowBillRow {
    pub first_name: String,
    pub last_name: String,
    pub bill: i64,
    pub request_date: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetOwnerRow {
    pub first_name: String,
    pub last_name: String,
    pub car_count: i64,
}

/// An old car serviced at a low odometer reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VintageCarRow {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub odometer: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCountRow {
    pub make: String,
    pub model: String,
    pub service_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerBillRow {
    pub first_name: String,
    pub last_name: String,
    pub total_bill: i64,
}

impl SqliteStore {
    /// Customers with a closed request billed strictly below `limit`
    pub fn customers_with_bill_below(&self, limit: i64) -> Result<Vec<LowBillRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.fname, c.lname, cr.bill, sr.date, cr.comment
             FROM closed_requests cr
             JOIN service_requests sr ON sr.rid = cr.rid
             JOIN customers c ON c.id = sr.customer_id
             WHERE cr.bill < ?1
             ORDER BY cr.bill, c.lname, c.fname",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(LowBillRow {
                first_name: row.get(0)?,
                last_name: row.get(1)?,
                bill: row.get(2)?,
                request_date: row.get(3)?,
                comment: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Customers owning strictly more than `threshold` cars
    pub fn customers_with_more_cars_than(&self, threshold: i64) -> Result<Vec<FleetOwnerRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.fname, c.lname, COUNT(*) AS car_count
             FROM owns o JOIN customers c ON c.id = o.customer_id
             GROUP BY o.customer_id, c.fname, c.lname
             HAVING COUNT(*) > ?1
             ORDER BY car_count DESC, c.lname, c.fname",
        )?;
        let rows = stmt.query_map([threshold], |row| {
            Ok(FleetOwnerRow {
                first_name: row.get(0)?,
                last_name: row.get(1)?,
                car_count: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Service visits of cars built before `year` with an odometer below `max_odometer`
    pub fn cars_before_year_under_odometer(
        &self,
        year: i32,
        max_odometer: u32,
    ) -> Result<Vec<VintageCarRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.make, c.model, c.year, sr.odometer
             FROM service_requests sr JOIN cars c ON c.vin = sr.car_vin
             WHERE c.year < ?1 AND sr.odometer < ?2
             ORDER BY c.year, c.make, c.model",
        )?;
        let rows = stmt.query_map(rusqlite::params![year, max_odometer], |row| {
            Ok(VintageCarRow {
                make: row.get(0)?,
                model: row.get(1)?,
                year: row.get(2)?,
                odometer: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The `k` cars with the most service requests
    pub fn cars_with_most_services(&self, k: usize) -> Result<Vec<ServiceCountRow>> {
        if k == 0 {
            return Err(ShopError::validation("number of cars must be at least 1"));
        }
        let limit = i64::try_from(k)
            .map_err(|_| ShopError::validation("number of cars is too large"))?;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.make, c.model, COUNT(sr.rid) AS service_count
             FROM service_requests sr JOIN cars c ON c.vin = sr.car_vin
             GROUP BY c.vin, c.make, c.model
             ORDER BY service_count DESC, c.vin
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(ServiceCountRow {
                make: row.get(0)?,
                model: row.get(1)?,
                service_count: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Customers ordered by their total billed amount, highest first
    pub fn customers_by_total_bill(&self) -> Result<Vec<CustomerBillRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.fname, c.lname, SUM(cr.bill) AS total
             FROM closed_requests cr
             JOIN service_requests sr ON sr.rid = cr.rid
             JOIN customers c ON c.id = sr.customer_id
             GROUP BY sr.customer_id, c.fname, c.lname
             ORDER BY total DESC, c.lname, c.fname",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CustomerBillRow {
                first_name: row.get(0)?,
                last_name: row.get(1)?,
                total_bill: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ShopStore;
    use crate::models::{Car, Customer, Mechanic, NewServiceRequest};

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        for (id, first, last) in [(1, "Ada", "Smith"), (2, "Bo", "Jones")] {
            store
                .insert_customer(&Customer {
                    id,
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    phone: String::new(),
                    address: String::new(),
                })
                .unwrap();
        }
        store
            .insert_mechanic(&Mechanic {
                id: 1,
                first_name: "Lin".to_string(),
                last_name: "Park".to_string(),
                experience: 5,
            })
            .unwrap();

        let cars = [(1, "OLD1", "Ford", 1990), (1, "NEW1", "Kia", 2019), (2, "OLD2", "Fiat", 1985)];
        for (owner, vin, make, year) in cars {
            store
                .register_car(
                    owner,
                    &Car {
                        vin: vin.to_string(),
                        make: make.to_string(),
                        model: "Base".to_string(),
                        year,
                    },
                )
                .unwrap();
        }

        let visits = [
            (1, "OLD1", 40000),
            (1, "OLD1", 45000),
            (1, "NEW1", 10000),
            (2, "OLD2", 90000),
        ];
        for (customer_id, vin, odometer) in visits {
            store
                .open_service_request(&NewServiceRequest {
                    customer_id,
                    car_vin: vin.to_string(),
                    odometer,
                    complaint: "check".to_string(),
                })
                .unwrap();
        }

        // Billing rows are written by the billing side; seed them directly
        let conn = store.lock().unwrap();
        conn.execute_batch(
            "INSERT INTO closed_requests (wid, rid, mid, date, comment, bill) VALUES
                (1, 1, 1, '2024-02-01', 'oil change', 60),
                (2, 2, 1, '2024-03-01', 'brakes', 300),
                (3, 4, 1, '2024-03-02', 'tires', 90);",
        )
        .unwrap();
        drop(conn);
        store
    }

    #[test]
    fn test_customers_with_bill_below() {
        let store = seeded_store();
        let rows = store.customers_with_bill_below(100).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.last_name.as_str()).collect();
        assert_eq!(names, vec!["Smith", "Jones"]);
        assert_eq!(rows[0].bill, 60);
    }

    #[test]
    fn test_customers_with_more_cars_than() {
        let store = seeded_store();
        let rows = store.customers_with_more_cars_than(1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].last_name, "Smith");
        assert_eq!(rows[0].car_count, 2);
        assert!(store.customers_with_more_cars_than(20).unwrap().is_empty());
    }

    #[test]
    fn test_cars_before_year_under_odometer() {
        let store = seeded_store();
        let rows = store.cars_before_year_under_odometer(1995, 50000).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.make == "Ford"));
    }

    #[test]
    fn test_cars_with_most_services() {
        let store = seeded_store();
        let rows = store.cars_with_most_services(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].make, "Ford");
        assert_eq!(rows[0].service_count, 2);
        assert!(store.cars_with_most_services(0).unwrap_err().is_validation());
    }

    #[test]
    fn test_customers_by_total_bill() {
        let store = seeded_store();
        let rows = store.customers_by_total_bill().unwrap();
        let totals: Vec<(String, i64)> = rows
            .into_iter()
            .map(|r| (r.last_name, r.total_bill))
            .collect();
        assert_eq!(totals, vec![("Smith".to_string(), 360), ("Jones".to_string(), 90)]);
    }
}
