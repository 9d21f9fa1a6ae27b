// ABOUTME: The card store handle: open, import, export, vacuum and close
// ABOUTME: Every operation on a closed handle fails with StoreError::Disposed

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::export::{export_cards, read_card};
use crate::import::{import_database, insert_documents, ImportCounts};
use crate::maintenance::{self, VacuumStats};
use crate::model::CardDocument;
use crate::sqlite::execute::Executor;
use crate::sqlite::schema::{self, migrate};
use crate::sqlite::{open_connection, validate_path};
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};

/// An open card database
///
/// Created by [`Database::open`] or [`Database::import`]. The connection is
/// configured and migrated before the handle is returned. After
/// [`Database::close`] the handle cannot be reopened.
#[derive(Debug)]
pub struct Database {
    conn: Option<Connection>,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `path`, applying pending migrations
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &StoreConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        let path = validate_path(path.as_ref(), "Database")?;
        tracing::info!("Opening card database {}", path.display());

        let conn = open_connection(&path, config)?;
        migrate(&conn)?;

        Ok(Self {
            conn: Some(conn),
            path,
        })
    }

    /// Create a new database at `output_file` from an export rooted at `source`
    ///
    /// All-or-nothing: on failure nothing is left at `output_file`.
    pub fn import(source: impl AsRef<Path>, output_file: impl AsRef<Path>) -> Result<Self> {
        Self::import_with_config(source, output_file, &StoreConfig::default())
    }

    pub fn import_with_config(
        source: impl AsRef<Path>,
        output_file: impl AsRef<Path>,
        config: &StoreConfig,
    ) -> Result<Self> {
        let source = validate_path(source.as_ref(), "Import source")?;
        let output = validate_path(output_file.as_ref(), "Import output")?;

        let conn = import_database(&source, &output, config)?;

        Ok(Self {
            conn: Some(conn),
            path: output,
        })
    }

    /// Write one JSON document per card under `<path>/card/`
    ///
    /// Returns the number of documents written.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<usize> {
        let conn = self.connection()?;
        let path = validate_path(path.as_ref(), "Export")?;
        export_cards(conn, &path)
    }

    /// Compact the database and return its new size in bytes
    pub fn vacuum(&mut self) -> Result<i64> {
        Ok(self.vacuum_with_old_size()?.new_size)
    }

    /// Compact the database, reporting the size before and after
    pub fn vacuum_with_old_size(&mut self) -> Result<VacuumStats> {
        maintenance::vacuum(self.connection_mut()?)
    }

    /// Current size in bytes without compacting
    pub fn size(&self) -> Result<i64> {
        maintenance::database_size(self.connection()?)
    }

    pub fn schema_version(&self) -> Result<i32> {
        schema::schema_version(self.connection()?)
    }

    /// Insert cards directly, in one transaction
    pub fn insert_cards(&mut self, cards: &[CardDocument]) -> Result<ImportCounts> {
        let conn = self.connection_mut()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let counts = insert_documents(&tx, cards)?;
        tx.commit()?;

        tracing::debug!("Inserted {} cards", counts.cards);
        Ok(counts)
    }

    /// Read one card with all of its child rows
    pub fn card(&self, cardid: &str) -> Result<Option<CardDocument>> {
        read_card(self.connection()?, cardid)
    }

    pub fn card_ids(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT cardid FROM card ORDER BY cardid ASC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    pub fn card_count(&self) -> Result<i64> {
        self.connection()?
            .execute_scalar_int64("SELECT COUNT(*) FROM card", &[])
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Release the connection; closing twice is a no-op
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            tracing::debug!("Closing card database {}", self.path.display());
            conn.close().map_err(|(_, err)| StoreError::from(err))?;
        }
        Ok(())
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(StoreError::Disposed)
    }

    fn connection_mut(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(StoreError::Disposed)
    }
}
