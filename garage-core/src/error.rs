//! Error types shared by the store, the resolvers and the intake workflow

use rusqlite::ffi;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Result alias used throughout the core library
pub type Result<T> = std::result::Result<T, ShopError>;

/// Errors raised by store operations and operator input handling
#[derive(Error, Debug)]
pub enum ShopError {
    /// Malformed or out-of-range operator input
    #[error("invalid input: {0}")]
    Validation(String),

    /// Uniqueness violation (duplicate id or VIN, or an id allocation race)
    #[error("conflict: {0}")]
    Conflict(String),

    /// An insert referenced a customer or car that does not exist
    #[error("unknown reference: {0}")]
    Reference(String),

    /// The database could not be reached or stayed locked past the busy timeout
    #[error("database unavailable: {0}")]
    Connectivity(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// The operator's input device failed (closed stdin, not a terminal)
    #[error("input unavailable: {0}")]
    Input(String),

    /// The operator abandoned a prompt
    #[error("cancelled by operator")]
    Cancelled,
}

impl ShopError {
    pub fn validation(message: impl Into<String>) -> Self {
        ShopError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ShopError::Conflict(message.into())
    }

    pub fn reference(message: impl Into<String>) -> Self {
        ShopError::Reference(message.into())
    }

    /// True for errors that an interactive session recovers from by asking again
    pub fn is_validation(&self) -> bool {
        matches!(self, ShopError::Validation(_))
    }
}

impl From<rusqlite::Error> for ShopError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            let detail = message
                .clone()
                .unwrap_or_else(|| failure.to_string());
            match failure.code {
                ErrorCode::ConstraintViolation => match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                        return ShopError::Conflict(detail)
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return ShopError::Reference(detail),
                    ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                        return ShopError::Validation(detail)
                    }
                    _ => {}
                },
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure => return ShopError::Connectivity(detail),
                _ => {}
            }
        }
        ShopError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn constraint_error(sql: &str) -> ShopError {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys=ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id),
                                 qty INTEGER NOT NULL CHECK (qty >= 0));
             INSERT INTO parent (id, name) VALUES (1, 'a');",
        )
        .unwrap();
        conn.execute(sql, []).unwrap_err().into()
    }

    #[test]
    fn test_duplicate_primary_key_is_conflict() {
        let err = constraint_error("INSERT INTO parent (id, name) VALUES (1, 'b')");
        assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");
    }

    #[test]
    fn test_duplicate_unique_column_is_conflict() {
        let err = constraint_error("INSERT INTO parent (id, name) VALUES (2, 'a')");
        assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");
    }

    #[test]
    fn test_missing_foreign_key_is_reference() {
        let err = constraint_error("INSERT INTO child (id, parent_id, qty) VALUES (1, 99, 1)");
        assert!(matches!(err, ShopError::Reference(_)), "{err:?}");
    }

    #[test]
    fn test_check_violation_is_validation() {
        let err = constraint_error("INSERT INTO child (id, parent_id, qty) VALUES (1, 1, -1)");
        assert!(err.is_validation(), "{err:?}");
    }

    #[test]
    fn test_other_errors_fall_through_to_database() {
        let err = constraint_error("INSERT INTO nowhere VALUES (1)");
        assert!(matches!(err, ShopError::Database(_)), "{err:?}");
        assert!(std::error::Error::source(&err).is_some());
    }
}
