// ABOUTME: Exports the card tables into one pretty-printed JSON document per card
// ABOUTME: Child rows are nested in a fixed order so exports are stable across runs

use crate::error::{Result, StoreError};
use crate::model::{
    CardDocument, CardType, Color, DetailDocument, FaqDocument, ImageDocument, Rarity,
};
use rusqlite::{params, Connection, Statement};
use std::fs;
use std::path::Path;

/// Subdirectory of an export root that holds the card documents
pub const CARD_DIRECTORY: &str = "card";

/// Assembles [`CardDocument`]s from the normalized tables
///
/// The child queries are prepared once and reused for every card read
/// through the same reader.
pub struct CardReader<'conn> {
    detail: Statement<'conn>,
    faq: Statement<'conn>,
    related: Statement<'conn>,
    image: Statement<'conn>,
}

impl<'conn> CardReader<'conn> {
    pub fn new(conn: &'conn Connection) -> Result<Self> {
        Ok(Self {
            detail: conn.prepare(
                "SELECT side, language, name, cost, specifiedcost, power, combopower, traits, effect \
                 FROM carddetail WHERE cardid = ?1 \
                 ORDER BY language ASC, side DESC",
            )?,
            faq: conn.prepare(
                "SELECT faqid, language, question, answer \
                 FROM cardfaq WHERE cardid = ?1 \
                 ORDER BY language ASC, faqid ASC",
            )?,
            related: conn.prepare(
                "SELECT relatedcardid FROM cardfaqrelated \
                 WHERE cardid = ?1 AND faqid = ?2 AND language = ?3 \
                 ORDER BY relatedcardid ASC",
            )?,
            image: conn.prepare(
                "SELECT side, language, format, image \
                 FROM cardimage WHERE cardid = ?1 \
                 ORDER BY language ASC, side DESC",
            )?,
        })
    }

    /// Build the full document for one `card` row
    pub fn read(
        &mut self,
        cardid: &str,
        card_type: CardType,
        color: Color,
        rarity: Rarity,
    ) -> Result<CardDocument> {
        let details = self
            .detail
            .query_map(params![cardid], |row| {
                Ok(DetailDocument {
                    side: row.get(0)?,
                    language: row.get(1)?,
                    name: row.get(2)?,
                    cost: row.get(3)?,
                    specifiedcost: row.get(4)?,
                    power: row.get(5)?,
                    combopower: row.get(6)?,
                    traits: row.get(7)?,
                    effect: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut faqs = self
            .faq
            .query_map(params![cardid], |row| {
                Ok(FaqDocument {
                    faqid: row.get(0)?,
                    language: row.get(1)?,
                    question: row.get(2)?,
                    answer: row.get(3)?,
                    related: None,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for faq in &mut faqs {
            let related = self
                .related
                .query_map(params![cardid, faq.faqid, faq.language], |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            faq.related = non_empty(related);
        }

        let images = self
            .image
            .query_map(params![cardid], |row| {
                Ok(ImageDocument {
                    side: row.get(0)?,
                    language: row.get(1)?,
                    format: row.get(2)?,
                    image: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(CardDocument {
            cardid: cardid.to_string(),
            card_type,
            color,
            rarity,
            detail: non_empty(details),
            faq: non_empty(faqs),
            image: non_empty(images),
        })
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Read a single card by identity
pub fn read_card(conn: &Connection, cardid: &str) -> Result<Option<CardDocument>> {
    let mut stmt =
        conn.prepare("SELECT cardid, type, color, rarity FROM card WHERE cardid = ?1")?;
    let mut rows = stmt.query(params![cardid])?;

    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let (card_type, color, rarity) = (row.get(1)?, row.get(2)?, row.get(3)?);

    let mut reader = CardReader::new(conn)?;
    Ok(Some(reader.read(cardid, card_type, color, rarity)?))
}

/// Export every card under `<path>/card/<cardid>.json`
///
/// Directories are created as needed and existing documents are overwritten.
/// Cards whose identity is missing or cannot be a file name inside `card/`
/// are skipped with a warning.
/// A failure partway through leaves the documents written so far on disk.
/// Returns the number of documents written.
pub fn export_cards(conn: &Connection, path: &Path) -> Result<usize> {
    create_directory(path, "export")?;
    let card_path = path.join(CARD_DIRECTORY);
    create_directory(&card_path, "card export")?;

    tracing::info!("Exporting cards to {}", card_path.display());

    let mut reader = CardReader::new(conn)?;
    let mut cards =
        conn.prepare("SELECT cardid, type, color, rarity FROM card ORDER BY cardid ASC")?;
    let mut rows = cards.query([])?;

    let mut written = 0usize;
    while let Some(row) = rows.next()? {
        let Some(cardid) = row.get::<_, Option<String>>(0)? else {
            tracing::warn!("Skipping card row without an identity");
            continue;
        };

        let file_name = match document_file_name(&cardid) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("Skipping card: {}", e);
                continue;
            }
        };

        let document = reader.read(&cardid, row.get(1)?, row.get(2)?, row.get(3)?)?;
        let file_path = card_path.join(file_name);
        let json = serde_json::to_string_pretty(&document)?;

        fs::write(&file_path, json)
            .map_err(|e| StoreError::io_at("write card document", &file_path, e))?;

        tracing::debug!("Exported card '{}'", cardid);
        written += 1;
    }

    tracing::info!("Exported {} cards to {}", written, card_path.display());

    Ok(written)
}

/// File name for a card document, refusing identities that would escape the
/// export directory
pub fn document_file_name(cardid: &str) -> Result<String> {
    if cardid.is_empty()
        || cardid == "."
        || cardid == ".."
        || cardid.contains(['/', '\\', '\0'])
    {
        return Err(StoreError::Integrity(format!(
            "Card identity '{}' cannot be used as a file name",
            cardid
        )));
    }
    Ok(format!("{}.json", cardid))
}

fn create_directory(path: &Path, what: &str) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| {
        StoreError::io(
            format!("Unable to create {} directory '{}'", what, path.display()),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, Side};
    use crate::sqlite::schema::migrate;

    fn seeded_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        migrate(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO card VALUES ('BT1-001', 'LEADER', 'Red', 'L');
             INSERT INTO card VALUES ('BT1-002', 'BATTLE', 'Blue', 'C');

             INSERT INTO carddetail (cardid, side, language, name, cost) VALUES
                ('BT1-001', 'BACK', 'EN', 'Back EN', NULL),
                ('BT1-001', 'FRONT', 'JP', 'Front JP', 1),
                ('BT1-001', 'FRONT', 'EN', 'Front EN', 2),
                ('BT1-001', 'BACK', 'JP', 'Back JP', NULL);

             INSERT INTO cardfaq VALUES
                ('BT1-001', 'Q2', 'EN', 'Second?', 'Yes'),
                ('BT1-001', 'Q1', 'JP', 'First JP?', NULL),
                ('BT1-001', 'Q1', 'EN', 'First?', 'No');

             INSERT INTO cardfaqrelated VALUES
                ('BT1-001', 'Q1', 'EN', 'BT1-002'),
                ('BT1-001', 'Q1', 'EN', 'BT1-000');

             INSERT INTO cardimage VALUES
                ('BT1-001', 'FRONT', 'JP', 'webp', X'0102'),
                ('BT1-001', 'BACK', 'EN', 'webp', X'0304'),
                ('BT1-001', 'FRONT', 'EN', 'webp', X'0506');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_child_rows_are_ordered() {
        let conn = seeded_conn();
        let card = read_card(&conn, "BT1-001").unwrap().unwrap();

        let details: Vec<(Language, Option<Side>)> =
            card.details().iter().map(|d| (d.language, d.side)).collect();
        assert_eq!(
            details,
            vec![
                (Language::EN, Some(Side::Front)),
                (Language::EN, Some(Side::Back)),
                (Language::JP, Some(Side::Front)),
                (Language::JP, Some(Side::Back)),
            ]
        );

        let faqs: Vec<(Language, &str)> = card
            .faqs()
            .iter()
            .map(|f| (f.language, f.faqid.as_str()))
            .collect();
        assert_eq!(
            faqs,
            vec![(Language::EN, "Q1"), (Language::EN, "Q2"), (Language::JP, "Q1")]
        );

        let images: Vec<(Language, Option<Side>)> =
            card.images().iter().map(|i| (i.language, i.side)).collect();
        assert_eq!(
            images,
            vec![
                (Language::EN, Some(Side::Front)),
                (Language::EN, Some(Side::Back)),
                (Language::JP, Some(Side::Front)),
            ]
        );
    }

    #[test]
    fn test_related_ids_and_nulls() {
        let conn = seeded_conn();
        let card = read_card(&conn, "BT1-001").unwrap().unwrap();

        let faqs = card.faqs();
        assert_eq!(faqs[0].related_ids(), ["BT1-000", "BT1-002"]);
        assert!(faqs[1].related.is_none());
        assert!(faqs[2].answer.is_none());
    }

    #[test]
    fn test_card_without_children_has_null_collections() {
        let conn = seeded_conn();
        let card = read_card(&conn, "BT1-002").unwrap().unwrap();

        assert!(card.detail.is_none());
        assert!(card.faq.is_none());
        assert!(card.image.is_none());
    }

    #[test]
    fn test_read_missing_card() {
        let conn = seeded_conn();
        assert!(read_card(&conn, "NOPE").unwrap().is_none());
    }

    #[test]
    fn test_export_writes_one_file_per_card() {
        let conn = seeded_conn();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("export");

        let written = export_cards(&conn, &root).unwrap();
        assert_eq!(written, 2);

        let leader = fs::read_to_string(root.join("card").join("BT1-001.json")).unwrap();
        // Two-space indentation
        assert!(leader.starts_with("{\n  \"cardid\": \"BT1-001\""));

        let battle: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(root.join("card").join("BT1-002.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(battle["detail"], serde_json::Value::Null);
        assert_eq!(battle["type"], "BATTLE");
    }

    #[test]
    fn test_export_overwrites_existing_documents() {
        let conn = seeded_conn();
        let dir = tempfile::tempdir().unwrap();
        let card_dir = dir.path().join("card");
        fs::create_dir_all(&card_dir).unwrap();
        fs::write(card_dir.join("BT1-002.json"), "stale").unwrap();

        export_cards(&conn, dir.path()).unwrap();

        let contents = fs::read_to_string(card_dir.join("BT1-002.json")).unwrap();
        assert!(contents.contains("\"cardid\": \"BT1-002\""));
    }

    #[test]
    fn test_export_into_file_path_fails() {
        let conn = seeded_conn();
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = export_cards(&conn, &blocker).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_export_skips_unusable_identities() {
        let conn = seeded_conn();
        conn.execute_batch(
            "INSERT INTO card VALUES ('', 'EXTRA', 'Green', 'C');
             INSERT INTO card VALUES ('../escape', 'EXTRA', 'Green', 'C');
             INSERT INTO card VALUES ('Z', 'EXTRA', 'Green', 'C');",
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();

        let written = export_cards(&conn, dir.path()).unwrap();

        assert_eq!(written, 3);
        let card_dir = dir.path().join("card");
        assert!(card_dir.join("Z.json").is_file());
        assert!(card_dir.join("BT1-001.json").is_file());
        assert!(!card_dir.join(".json").exists());
        assert!(!dir.path().join("escape.json").exists());
    }

    #[test]
    fn test_document_file_name_rejects_traversal() {
        assert_eq!(document_file_name("BT1-001").unwrap(), "BT1-001.json");
        assert!(document_file_name("../etc/passwd").is_err());
        assert!(document_file_name("a\\b").is_err());
        assert!(document_file_name("..").is_err());
        assert!(document_file_name("").is_err());
    }
}
