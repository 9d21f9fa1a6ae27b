// ABOUTME: Statement execution primitives every store operation is built from
// ABOUTME: Prepare, bind positionally, step to completion and finalize on every path

use crate::error::Result;
use rusqlite::types::ToSql;
use rusqlite::{Connection, Statement};

/// Narrow execution seam over the embedded engine
///
/// Higher-level code only ever runs SQL through these three calls, so the
/// engine behind them can be swapped without touching export, import or
/// migration logic. `rusqlite::Transaction` derefs to `Connection` and gets
/// the same implementation.
///
/// Parameters bind positionally starting at `?1`. `None` binds a real NULL.
/// Text and BLOB values are copied by the engine at bind time, so callers may
/// reuse their buffers as soon as the call returns.
pub trait Executor {
    /// Run a statement to completion, discarding any rows, and return the
    /// number of rows it changed
    fn execute_non_query(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize>;

    /// Column 0 of the first row as an `i32`, or 0 when no row comes back
    fn execute_scalar_int(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i32>;

    /// Column 0 of the first row as an `i64`, or 0 when no row comes back
    fn execute_scalar_int64(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64>;
}

impl Executor for Connection {
    fn execute_non_query(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        // The statement is finalized when it drops, on success and on `?`
        let mut stmt = self.prepare(sql)?;
        bind_parameters(&mut stmt, params)?;

        let mut rows = stmt.raw_query();
        while rows.next()?.is_some() {}
        drop(rows);

        Ok(self.changes() as usize)
    }

    fn execute_scalar_int(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i32> {
        scalar(self, sql, params)
    }

    fn execute_scalar_int64(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64> {
        scalar(self, sql, params)
    }
}

fn scalar<T>(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<T>
where
    T: rusqlite::types::FromSql + Default,
{
    let mut stmt = conn.prepare(sql)?;
    bind_parameters(&mut stmt, params)?;

    let mut rows = stmt.raw_query();
    let value = match rows.next()? {
        Some(row) => row.get::<_, Option<T>>(0)?.unwrap_or_default(),
        None => T::default(),
    };
    Ok(value)
}

fn bind_parameters(stmt: &mut Statement<'_>, params: &[&dyn ToSql]) -> Result<()> {
    for (idx, param) in params.iter().enumerate() {
        stmt.raw_bind_parameter(idx + 1, *param)?;
    }
    Ok(())
}
