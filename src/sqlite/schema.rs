// ABOUTME: Version-gated schema migrations stored in PRAGMA user_version
// ABOUTME: Each version step runs exactly once and only ever moves forward

use crate::error::{Result, StoreError};
use crate::sqlite::execute::Executor;
use rusqlite::Connection;

/// Highest schema version this build knows how to produce
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Known on-disk schema versions
///
/// New versions are added as new variants with their own step in
/// [`migrate`]; existing steps are never edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    /// Freshly created file, no tables yet
    Uninitialized,
    /// card, carddetail, cardfaq, cardfaqrelated, cardimage
    V1,
}

impl SchemaVersion {
    pub fn from_user_version(version: i32) -> Result<Self> {
        match version {
            0 => Ok(SchemaVersion::Uninitialized),
            1 => Ok(SchemaVersion::V1),
            other => Err(StoreError::Integrity(format!(
                "Unsupported schema version {} (this build supports up to {})",
                other, CURRENT_SCHEMA_VERSION
            ))),
        }
    }

    pub fn as_user_version(&self) -> i32 {
        match self {
            SchemaVersion::Uninitialized => 0,
            SchemaVersion::V1 => 1,
        }
    }
}

/// Read the raw schema version integer
pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.execute_scalar_int("PRAGMA user_version", &[])
}

/// Bring the schema up to [`CURRENT_SCHEMA_VERSION`]
///
/// Every step and its version bump commit together, so a failed step leaves
/// the file at the previous version.
pub fn migrate(conn: &Connection) -> Result<SchemaVersion> {
    let mut version = SchemaVersion::from_user_version(schema_version(conn)?)?;
    tracing::debug!("Database schema version is {}", version.as_user_version());

    loop {
        version = match version {
            SchemaVersion::Uninitialized => {
                apply_step(conn, SchemaVersion::V1, V1_SCHEMA)?;
                SchemaVersion::V1
            }
            SchemaVersion::V1 => break,
        };
    }

    Ok(version)
}

fn apply_step(conn: &Connection, target: SchemaVersion, statements: &[&str]) -> Result<()> {
    tracing::info!(
        "Migrating database schema to version {}",
        target.as_user_version()
    );

    let tx = conn.unchecked_transaction()?;
    for sql in statements {
        tx.execute_non_query(sql, &[])?;
    }
    // PRAGMA arguments cannot be bound as parameters
    tx.execute_non_query(
        &format!("PRAGMA user_version = {}", target.as_user_version()),
        &[],
    )?;
    tx.commit()?;

    Ok(())
}

// Version 0 -> 1: original schema
const V1_SCHEMA: &[&str] = &[
    // cardid(pk) | type | color | rarity
    "CREATE TABLE card (
        cardid TEXT NOT NULL,
        type TEXT NOT NULL,
        color TEXT NOT NULL,
        rarity TEXT NOT NULL,
        PRIMARY KEY (cardid),
        CHECK (type IN ('LEADER', 'BATTLE', 'EXTRA')),
        CHECK (color IN ('Red', 'Blue', 'Green', 'Yellow', 'Black')),
        CHECK (rarity IN ('L', 'C', 'R', 'SR', 'SCR', 'PR'))
    )",
    // cardid(pk|fk) | side(pk) | language(pk) | name | cost | specifiedcost | power | combopower | traits | effect
    "CREATE TABLE carddetail (
        cardid TEXT NOT NULL,
        side TEXT NULL,
        language TEXT NOT NULL,
        name TEXT NOT NULL,
        cost INTEGER NULL,
        specifiedcost TEXT NULL,
        power INTEGER NULL,
        combopower INTEGER NULL,
        traits TEXT NULL,
        effect TEXT NULL,
        PRIMARY KEY (cardid, side, language),
        FOREIGN KEY (cardid) REFERENCES card (cardid),
        CHECK (side IN (NULL, 'FRONT', 'BACK')),
        CHECK (language IN ('EN', 'JP'))
    )",
    // cardid(pk|fk) | faqid(pk) | language(pk) | question | answer
    "CREATE TABLE cardfaq (
        cardid TEXT NOT NULL,
        faqid TEXT NOT NULL,
        language TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NULL,
        PRIMARY KEY (cardid, faqid, language),
        FOREIGN KEY (cardid) REFERENCES card (cardid),
        CHECK (language IN ('EN', 'JP'))
    )",
    // cardid(pk|fk) | faqid(pk|fk) | language(pk|fk) | relatedcardid(pk)
    "CREATE TABLE cardfaqrelated (
        cardid TEXT NOT NULL,
        faqid TEXT NULL,
        language TEXT NOT NULL,
        relatedcardid TEXT NOT NULL,
        PRIMARY KEY (cardid, faqid, language, relatedcardid),
        FOREIGN KEY (cardid, faqid, language) REFERENCES cardfaq (cardid, faqid, language),
        CHECK (language IN ('EN', 'JP'))
    )",
    // cardid(pk|fk) | side(pk) | language(pk) | format | image
    "CREATE TABLE cardimage (
        cardid TEXT NOT NULL,
        side TEXT NULL,
        language TEXT NOT NULL,
        format TEXT NOT NULL,
        image BLOB NOT NULL,
        PRIMARY KEY (cardid, side, language),
        FOREIGN KEY (cardid) REFERENCES card (cardid),
        CHECK (side IN (NULL, 'FRONT', 'BACK')),
        CHECK (language IN ('EN', 'JP'))
    )",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        names
    }

    #[test]
    fn test_migrate_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        let version = migrate(&conn).unwrap();

        assert_eq!(version, SchemaVersion::V1);
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(
            table_names(&conn),
            vec!["card", "carddetail", "cardfaq", "cardfaqrelated", "cardimage"]
        );
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let schema_before = conn
            .execute_scalar_int("PRAGMA schema_version", &[])
            .unwrap();

        // A second pass must not run any DDL
        assert_eq!(migrate(&conn).unwrap(), SchemaVersion::V1);

        let schema_after = conn
            .execute_scalar_int("PRAGMA schema_version", &[])
            .unwrap();
        assert_eq!(schema_before, schema_after);
        assert_eq!(schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_unknown_future_version_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 42").unwrap();

        let err = migrate(&conn).unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
        assert!(table_names(&conn).is_empty());
    }

    #[test]
    fn test_check_constraints_reject_unknown_labels() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let err = conn
            .execute_non_query(
                "INSERT INTO card VALUES ('X-1', 'MONSTER', 'Red', 'C')",
                &[],
            )
            .unwrap_err();
        // SQLITE_CONSTRAINT_CHECK
        assert_eq!(err.sqlite_code(), Some(275));
    }

    #[test]
    fn test_detail_side_may_be_null() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        conn.execute_non_query("INSERT INTO card VALUES ('X-1', 'EXTRA', 'Red', 'C')", &[])
            .unwrap();
        let side: Option<&str> = None;
        conn.execute_non_query(
            "INSERT INTO carddetail (cardid, side, language, name) VALUES ('X-1', ?1, 'EN', 'Name')",
            &[&side],
        )
        .unwrap();
    }

    #[test]
    fn test_version_labels() {
        assert_eq!(SchemaVersion::from_user_version(0).unwrap(), SchemaVersion::Uninitialized);
        assert_eq!(SchemaVersion::V1.as_user_version(), 1);
        assert!(SchemaVersion::from_user_version(-1).is_err());
    }
}
