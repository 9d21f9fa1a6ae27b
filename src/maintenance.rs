// ABOUTME: Storage footprint reporting and VACUUM compaction
// ABOUTME: Sizes are page_size * page_count as reported by the engine

use crate::error::Result;
use crate::sqlite::execute::Executor;
use rusqlite::Connection;

/// Database size around a VACUUM, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VacuumStats {
    pub old_size: i64,
    pub new_size: i64,
}

impl VacuumStats {
    /// Bytes given back by the compaction; negative if the file grew
    pub fn reclaimed(&self) -> i64 {
        self.old_size - self.new_size
    }
}

/// Current on-disk size of the main database
pub fn database_size(conn: &Connection) -> Result<i64> {
    let page_size = conn.execute_scalar_int("PRAGMA page_size", &[])?;
    let page_count = conn.execute_scalar_int64("PRAGMA page_count", &[])?;
    Ok(page_count * i64::from(page_size))
}

/// Rebuild the database file, reclaiming free pages
///
/// Blocks until the engine finishes and needs exclusive use of the
/// connection for the duration.
pub fn vacuum(conn: &Connection) -> Result<VacuumStats> {
    let old_size = database_size(conn)?;
    conn.execute_non_query("VACUUM", &[])?;
    let new_size = database_size(conn)?;

    tracing::info!(
        "Vacuumed database: {} -> {} bytes",
        old_size,
        new_size
    );

    Ok(VacuumStats { old_size, new_size })
}
