// ABOUTME: Builds a new card database from exported JSON documents
// ABOUTME: All rows go in under one IMMEDIATE transaction; any failure removes the output file

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::export::CARD_DIRECTORY;
use crate::maintenance;
use crate::model::CardDocument;
use crate::sqlite::open_connection;
use crate::sqlite::schema::migrate;
use rusqlite::{params, Connection, Statement, TransactionBehavior};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Prepared INSERT statements, one per table
///
/// Statements are prepared once and re-bound for every document; rusqlite
/// resets each statement after it runs.
pub struct CardInserter<'conn> {
    card: Statement<'conn>,
    detail: Statement<'conn>,
    faq: Statement<'conn>,
    related: Statement<'conn>,
    image: Statement<'conn>,
}

/// Rows written by a [`CardInserter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub cards: usize,
    pub details: usize,
    pub faqs: usize,
    pub related: usize,
    pub images: usize,
}

impl<'conn> CardInserter<'conn> {
    pub fn new(conn: &'conn Connection) -> Result<Self> {
        Ok(Self {
            card: conn.prepare("INSERT INTO card (cardid, type, color, rarity) VALUES (?1, ?2, ?3, ?4)")?,
            detail: conn.prepare(
                "INSERT INTO carddetail \
                 (cardid, side, language, name, cost, specifiedcost, power, combopower, traits, effect) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?,
            faq: conn.prepare(
                "INSERT INTO cardfaq (cardid, faqid, language, question, answer) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?,
            related: conn.prepare(
                "INSERT INTO cardfaqrelated (cardid, faqid, language, relatedcardid) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?,
            image: conn.prepare(
                "INSERT INTO cardimage (cardid, side, language, format, image) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?,
        })
    }

    /// Insert one card and all of its child rows
    pub fn insert(&mut self, card: &CardDocument, counts: &mut ImportCounts) -> Result<()> {
        let cardid = card.cardid.as_str();

        self.card
            .execute(params![cardid, card.card_type, card.color, card.rarity])?;
        counts.cards += 1;

        for detail in card.details() {
            self.detail.execute(params![
                cardid,
                detail.side,
                detail.language,
                detail.name,
                detail.cost,
                detail.specifiedcost,
                detail.power,
                detail.combopower,
                detail.traits,
                detail.effect,
            ])?;
            counts.details += 1;
        }

        for faq in card.faqs() {
            self.faq
                .execute(params![cardid, faq.faqid, faq.language, faq.question, faq.answer])?;
            counts.faqs += 1;

            for related in faq.related_ids() {
                self.related
                    .execute(params![cardid, faq.faqid, faq.language, related])?;
                counts.related += 1;
            }
        }

        for image in card.images() {
            self.image
                .execute(params![cardid, image.side, image.language, image.format, image.image])?;
            counts.images += 1;
        }

        Ok(())
    }
}

/// Insert documents through an existing connection or transaction
pub fn insert_documents(conn: &Connection, cards: &[CardDocument]) -> Result<ImportCounts> {
    let mut inserter = CardInserter::new(conn)?;
    let mut counts = ImportCounts::default();
    for card in cards {
        inserter.insert(card, &mut counts)?;
    }
    Ok(counts)
}

/// Import every document file found directly inside `card_path`
///
/// Files are processed in file name order so failures are reproducible.
pub fn import_card_files(conn: &Connection, card_path: &Path) -> Result<ImportCounts> {
    let files = list_document_files(card_path)?;
    tracing::info!(
        "Importing {} card documents from {}",
        files.len(),
        card_path.display()
    );

    let mut inserter = CardInserter::new(conn)?;
    let mut counts = ImportCounts::default();

    for file in &files {
        let json = fs::read_to_string(file)
            .map_err(|e| StoreError::io_at("read card document", file, e))?;

        let card: CardDocument = serde_json::from_str(&json).map_err(|e| {
            StoreError::Integrity(format!(
                "Malformed card document '{}': {}",
                file.display(),
                e
            ))
        })?;

        inserter.insert(&card, &mut counts).map_err(|e| {
            tracing::warn!("Failed to import card document {}: {}", file.display(), e);
            e
        })?;
    }

    tracing::info!(
        "Imported {} cards ({} details, {} faqs, {} related, {} images)",
        counts.cards,
        counts.details,
        counts.faqs,
        counts.related,
        counts.images
    );

    Ok(counts)
}

fn list_document_files(card_path: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(card_path)
        .map_err(|e| StoreError::io_at("read card import directory", card_path, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| StoreError::io_at("read card import directory", card_path, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| StoreError::io_at("inspect", &entry.path(), e))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Create a brand-new database at `output` from an export rooted at `source`
///
/// Any existing database at `output` is deleted first. On failure the
/// transaction is rolled back, the connection closed and the output file
/// (with its WAL side files) deleted before the error is returned.
pub fn import_database(source: &Path, output: &Path, config: &StoreConfig) -> Result<Connection> {
    if !source.is_dir() {
        return Err(StoreError::Argument(format!(
            "Unable to access import path '{}'",
            source.display()
        )));
    }

    let card_path = source.join(CARD_DIRECTORY);
    if !card_path.is_dir() {
        return Err(StoreError::Argument(format!(
            "Unable to access card import directory '{}'",
            card_path.display()
        )));
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            StoreError::io(
                format!("Unable to create output directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    remove_database_files(output)?;

    tracing::info!(
        "Importing {} into new database {}",
        source.display(),
        output.display()
    );

    let result = open_connection(output, config).and_then(|mut conn| {
        populate(&mut conn, &card_path, config)?;
        Ok(conn)
    });

    match result {
        Ok(conn) => Ok(conn),
        Err(err) => {
            tracing::warn!("Import failed, removing {}: {}", output.display(), err);
            if let Err(cleanup) = remove_database_files(output) {
                tracing::warn!("Failed to remove partial database: {}", cleanup);
            }
            Err(err)
        }
    }
}

fn populate(conn: &mut Connection, card_path: &Path, config: &StoreConfig) -> Result<()> {
    migrate(conn)?;

    // Dropping the transaction on any error rolls it back
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    import_card_files(&tx, card_path)?;
    tx.commit()?;

    if config.vacuum_after_import {
        maintenance::vacuum(conn)?;
    }

    Ok(())
}

/// Delete a database file and the journal files SQLite keeps beside it
pub fn remove_database_files(path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        let file = PathBuf::from(name);

        match fs::remove_file(&file) {
            Ok(()) => tracing::debug!("Removed {}", file.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io_at("delete", &file, e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardType, Color, FaqDocument, Language, Rarity};

    fn migrated_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_documents_counts_rows() {
        let conn = migrated_conn();
        let mut card = CardDocument::new("EX1-001", CardType::Extra, Color::Green, Rarity::SR);
        card.faq = Some(vec![FaqDocument {
            faqid: "F1".to_string(),
            language: Language::EN,
            question: "Can it attack?".to_string(),
            answer: None,
            related: Some(vec!["EX1-002".to_string(), "EX1-003".to_string()]),
        }]);

        let counts = insert_documents(&conn, &[card]).unwrap();

        assert_eq!(
            counts,
            ImportCounts {
                cards: 1,
                faqs: 1,
                related: 2,
                ..Default::default()
            }
        );
        assert_eq!(count(&conn, "cardfaqrelated"), 2);
    }

    #[test]
    fn test_duplicate_card_is_sqlite_error() {
        let conn = migrated_conn();
        let card = CardDocument::new("EX1-001", CardType::Extra, Color::Green, Rarity::SR);

        let err = insert_documents(&conn, &[card.clone(), card]).unwrap_err();
        assert!(matches!(err, StoreError::Sqlite { .. }));
    }

    #[test]
    fn test_list_document_files_is_sorted_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_document_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_malformed_document_is_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ \"cardid\": ").unwrap();

        let conn = migrated_conn();
        let err = import_card_files(&conn, dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_missing_source_is_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.db");

        let err = import_database(&dir.path().join("missing"), &output, &StoreConfig::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Argument(_)));

        // Source exists but has no card directory
        let err = import_database(dir.path(), &output, &StoreConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::Argument(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_remove_database_files() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cards.db");
        fs::write(&db, "x").unwrap();
        fs::write(dir.path().join("cards.db-wal"), "x").unwrap();

        remove_database_files(&db).unwrap();

        assert!(!db.exists());
        assert!(!dir.path().join("cards.db-wal").exists());
        // Nothing left to remove is not an error
        remove_database_files(&db).unwrap();
    }
}
