//! Model-agnostic table primitives over one SQLite connection.
//!
//! # Invariants
//! - Every primitive holds the connection lock only for its own statement;
//!   a sequence of primitives is never atomic.
//! - `select_from` returns rows in rowid order.

use super::{StoreError, StoreResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

static SQL_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Column name to store-primitive value mapping used as insert parameters.
///
/// Ordered by column name so generated SQL is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: BTreeMap<String, Value>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one column value, replacing any earlier value for the column.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.fields.insert(column.into(), value);
    }

    /// Removes one column, returning its value when present.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.fields.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// SQLite-backed relational store shared by persistence data sources.
///
/// The connection sits behind a mutex, so one store can be handed to several
/// data sources through `Arc<SqliteStore>`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub(crate) fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Creates a table when it does not exist yet.
    ///
    /// `column_defs` are raw SQL column definitions such as
    /// `"id INTEGER PRIMARY KEY"`.
    pub fn create_table(&self, name: &str, column_defs: &[&str]) -> StoreResult<()> {
        ensure_identifier(name)?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {name} ({});",
            column_defs.join(", ")
        );
        self.lock()?.execute_batch(&sql)?;
        debug!("event=store_create_table module=db status=ok table={name}");
        Ok(())
    }

    /// Inserts one row and returns the store-assigned rowid.
    pub fn insert_into(&self, name: &str, fields: &FieldMap) -> StoreResult<i64> {
        ensure_identifier(name)?;
        for column in fields.columns() {
            ensure_identifier(column)?;
        }

        let sql = if fields.is_empty() {
            format!("INSERT INTO {name} DEFAULT VALUES;")
        } else {
            let columns = fields.columns().collect::<Vec<_>>().join(", ");
            let placeholders = (1..=fields.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("INSERT INTO {name} ({columns}) VALUES ({placeholders});")
        };

        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(fields.iter().map(|(_, value)| value)))?;
        let row_id = conn.last_insert_rowid();
        debug!("event=store_insert module=db status=ok table={name} row_id={row_id}");
        Ok(row_id)
    }

    /// Scans a table, optionally filtered by a raw SQL boolean expression,
    /// mapping every row through `mapper`.
    ///
    /// `where_expr` is placed into the statement verbatim; callers must only
    /// build it from values that are safe to interpolate.
    pub fn select_from<T, F>(
        &self,
        name: &str,
        where_expr: Option<&str>,
        mut mapper: F,
    ) -> StoreResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        ensure_identifier(name)?;
        let sql = match where_expr {
            Some(expr) => format!("SELECT * FROM {name} WHERE {expr} ORDER BY rowid;"),
            None => format!("SELECT * FROM {name} ORDER BY rowid;"),
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut mapped = Vec::new();
        while let Some(row) = rows.next()? {
            mapped.push(mapper(row)?);
        }

        debug!(
            "event=store_select module=db status=ok table={name} filtered={} rows={}",
            where_expr.is_some(),
            mapped.len()
        );
        Ok(mapped)
    }

    /// Deletes rows by rowid and returns how many rows were removed.
    pub fn delete_from(&self, name: &str, row_ids: &[i64]) -> StoreResult<usize> {
        ensure_identifier(name)?;
        if row_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = (1..=row_ids.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("DELETE FROM {name} WHERE rowid IN ({placeholders});");
        let removed = self.lock()?.execute(&sql, params_from_iter(row_ids.iter()))?;
        debug!("event=store_delete module=db status=ok table={name} removed={removed}");
        Ok(removed)
    }

    /// Returns the number of rows in a table.
    pub fn count_from(&self, name: &str) -> StoreResult<i64> {
        ensure_identifier(name)?;
        let count = self
            .lock()?
            .query_row(&format!("SELECT COUNT(*) FROM {name};"), [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(count)
    }

    /// Returns whether a table with this name exists.
    pub fn table_exists(&self, name: &str) -> StoreResult<bool> {
        let exists = self.lock()?.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [name],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(exists == 1)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

pub(crate) fn ensure_identifier(name: &str) -> StoreResult<()> {
    if SQL_IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}
