//! Identifier allocation for service requests and ownership links
//!
//! Each allocated table keeps a high-water mark in `id_sequences`. The next
//! id is one past the larger of the mark and the table's current maximum,
//! so ids deleted out-of-band are never handed out again and rows inserted
//! with explicit ids are never collided with. Allocation must run inside the
//! same write transaction as the insert that uses the id; a rollback then
//! restores the mark.

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use super::traits::IdTable;
use crate::error::Result;

/// Returns the id the next allocation would produce, without consuming it
pub fn peek(conn: &Connection, table: IdTable) -> Result<i64> {
    let mark = high_water_mark(conn, table)?;
    let max_id = max_id(conn, table)?;
    Ok(mark.max(max_id) + 1)
}

/// Reserves the next id for `table` within `tx`
pub fn allocate(tx: &Transaction<'_>, table: IdTable) -> Result<i64> {
    let next = peek(tx, table)?;
    raise_mark(tx, table, next)?;
    tracing::debug!(table = table.table_name(), id = next, "allocated id");
    Ok(next)
}

/// Records an id inserted explicitly so later allocations stay above it
///
/// Must run in the transaction that inserted the row.
pub fn observe(tx: &Transaction<'_>, table: IdTable, id: i64) -> Result<()> {
    raise_mark(tx, table, id)
}

fn raise_mark(conn: &Connection, table: IdTable, id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO id_sequences (table_name, last_value) VALUES (?1, ?2)
         ON CONFLICT(table_name) DO UPDATE
         SET last_value = MAX(last_value, excluded.last_value)",
        params![table.table_name(), id],
    )?;
    Ok(())
}

fn high_water_mark(conn: &Connection, table: IdTable) -> Result<i64> {
    let mark: Option<i64> = conn
        .query_row(
            "SELECT last_value FROM id_sequences WHERE table_name = ?1",
            [table.table_name()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(mark.unwrap_or(0))
}

fn max_id(conn: &Connection, table: IdTable) -> Result<i64> {
    let sql = format!(
        "SELECT COALESCE(MAX({}), 0) FROM {}",
        table.id_column(),
        table.table_name()
    );
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::TransactionBehavior;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("schema.sql")).unwrap();
        conn.execute_batch(
            "INSERT INTO customers (id, fname, lname, phone, address) VALUES (1, 'A', 'B', '', '');
             INSERT INTO cars (vin, make, model, year) VALUES ('V1', 'Ford', 'T', 1920);
             INSERT INTO owns (ownership_id, customer_id, car_vin) VALUES (1, 1, 'V1');",
        )
        .unwrap();
        conn
    }

    fn insert_request(conn: &Connection, rid: i64) {
        conn.execute(
            "INSERT INTO service_requests (rid, customer_id, car_vin, date, odometer, complain)
             VALUES (?1, 1, 'V1', '2024-01-01T00:00:00Z', 10, 'noise')",
            [rid],
        )
        .unwrap();
    }

    #[test]
    fn test_empty_table_starts_at_one() {
        let conn = fixture();
        assert_eq!(peek(&conn, IdTable::ServiceRequest).unwrap(), 1);
        assert_eq!(peek(&conn, IdTable::Ownership).unwrap(), 2);
    }

    #[test]
    fn test_allocation_is_monotonic_across_deletions() {
        let mut conn = fixture();
        for _ in 0..3 {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate).unwrap();
            let id = allocate(&tx, IdTable::ServiceRequest).unwrap();
            insert_request(&tx, id);
            tx.commit().unwrap();
        }
        conn.execute("DELETE FROM service_requests WHERE rid = 3", []).unwrap();
        // Row count is now 2 and MAX(rid) is 2; neither may produce 3 again
        assert_eq!(peek(&conn, IdTable::ServiceRequest).unwrap(), 4);
    }

    #[test]
    fn test_rolled_back_allocation_is_not_consumed() {
        let mut conn = fixture();
        {
            let tx = conn.transaction().unwrap();
            assert_eq!(allocate(&tx, IdTable::ServiceRequest).unwrap(), 1);
            // dropped without commit
        }
        assert_eq!(peek(&conn, IdTable::ServiceRequest).unwrap(), 1);
    }

    #[test]
    fn test_observed_id_survives_deletion() {
        let mut conn = fixture();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate).unwrap();
        insert_request(&tx, 7);
        observe(&tx, IdTable::ServiceRequest, 7).unwrap();
        // A lower explicit id never lowers the mark
        insert_request(&tx, 2);
        observe(&tx, IdTable::ServiceRequest, 2).unwrap();
        tx.commit().unwrap();

        conn.execute("DELETE FROM service_requests", []).unwrap();
        assert_eq!(peek(&conn, IdTable::ServiceRequest).unwrap(), 8);
    }

    #[test]
    fn test_explicit_ids_raise_the_floor() {
        let conn = fixture();
        insert_request(&conn, 40);
        assert_eq!(peek(&conn, IdTable::ServiceRequest).unwrap(), 41);
    }
}
