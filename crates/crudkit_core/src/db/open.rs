//! Connection bootstrap for `SqliteStore`.
//!
//! # Invariants
//! - Returned stores have `foreign_keys=ON` and a busy timeout configured.

use super::store::SqliteStore;
use super::StoreResult;
use crate::container::config::StoreConfig;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl SqliteStore {
    /// Opens (or creates) a SQLite database file.
    ///
    /// # Side effects
    /// - Emits `store_open` logging events with duration and status.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        open_logged("file", DEFAULT_BUSY_TIMEOUT, || {
            Connection::open(path.as_ref())
        })
    }

    /// Opens a private in-memory SQLite database.
    pub fn open_in_memory() -> StoreResult<Self> {
        open_logged("memory", DEFAULT_BUSY_TIMEOUT, Connection::open_in_memory)
    }

    /// Opens a store described by container configuration.
    ///
    /// `path = None` selects an in-memory database.
    pub fn open_with(config: &StoreConfig) -> StoreResult<Self> {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        match config.path.as_deref() {
            Some(path) => open_logged("file", busy_timeout, || Connection::open(path)),
            None => open_logged("memory", busy_timeout, Connection::open_in_memory),
        }
    }
}

fn open_logged(
    mode: &str,
    busy_timeout: Duration,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> StoreResult<SqliteStore> {
    let started_at = Instant::now();
    info!("event=store_open module=db status=start mode={mode}");

    let conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=store_open module=db status=error mode={mode} duration_ms={} error_code=store_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn, busy_timeout) {
        Ok(()) => {
            info!(
                "event=store_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(SqliteStore::from_connection(conn))
        }
        Err(err) => {
            error!(
                "event=store_open module=db status=error mode={mode} duration_ms={} error_code=store_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn bootstrap_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}
