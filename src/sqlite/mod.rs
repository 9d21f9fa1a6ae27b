// ABOUTME: SQLite connection handling for the card store
// ABOUTME: Path validation, opening, and the per-connection pragmas applied on every open

pub mod converter;
pub mod execute;
pub mod schema;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use execute::Executor;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Resolve a caller-supplied path to an absolute path
///
/// The target does not need to exist yet. Empty paths are rejected before
/// any filesystem access.
pub fn validate_path(path: &Path, what: &str) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(StoreError::Argument(format!("{} path cannot be empty", what)));
    }

    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir()
        .map_err(|e| StoreError::io("Failed to resolve current directory", e))?;
    Ok(cwd.join(path))
}

/// Open (creating if needed) a read-write connection and configure it
pub fn open_connection(path: &Path, config: &StoreConfig) -> Result<Connection> {
    tracing::debug!("Opening SQLite database: {}", path.display());

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;

    configure_connection(&conn, config)?;
    Ok(conn)
}

/// Apply the connection-scoped settings every handle needs
///
/// None of these persist across connections (or, for the encoding, only
/// matter before the first table exists), so they run on every open.
/// Extended result codes are already switched on by rusqlite when it opens
/// the handle.
pub fn configure_connection(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.busy_timeout(config.busy_timeout())?;

    // Encoding is fixed once the first page is written, so it goes before WAL
    conn.execute_non_query("PRAGMA encoding = 'UTF-16'", &[])?;
    conn.execute_non_query("PRAGMA journal_mode = WAL", &[])?;
    conn.execute_non_query("PRAGMA foreign_keys = ON", &[])?;

    Ok(())
}
