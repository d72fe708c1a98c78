//! Relational store bootstrap and generic table primitives.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by relational data sources.
//! - Expose the small set of model-agnostic primitives (`create_table`,
//!   `insert_into`, `select_from`, `delete_from`, `count_from`) that the
//!   generic CRUD layer is built on.
//!
//! # Invariants
//! - Table and column names are validated before they reach SQL text.
//! - Field values are always bound as parameters, never interpolated.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
mod store;

pub(crate) use store::ensure_identifier;
pub use store::{FieldMap, SqliteStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// Table or column name that cannot be safely placed in SQL text.
    InvalidIdentifier(String),
    /// Another thread panicked while holding the connection lock.
    LockPoisoned,
    /// Identifier counter has no value left to hand out.
    IdentifiersExhausted,
}

impl StoreError {
    /// Returns true when SQLite rejected a write because of a schema
    /// constraint (`NOT NULL`, `UNIQUE`, `CHECK`, foreign key).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(name) => {
                write!(f, "`{name}` is not a valid table or column name")
            }
            Self::LockPoisoned => write!(f, "store connection lock poisoned"),
            Self::IdentifiersExhausted => write!(f, "no identifiers left to assign"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidIdentifier(_) => None,
            Self::LockPoisoned => None,
            Self::IdentifiersExhausted => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
