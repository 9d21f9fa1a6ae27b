// ABOUTME: Error type shared by every store operation
// ABOUTME: Separates argument, engine, integrity, filesystem and disposed-handle failures

use std::path::Path;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A caller-supplied argument was rejected before any I/O happened
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The SQLite engine (or the client library wrapping it) reported a failure
    #[error("SQLite error {code}: {}", .message.as_deref().unwrap_or("no message"))]
    Sqlite { code: i32, message: Option<String> },

    /// Data could not be converted between its stored and document forms
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database handle has been closed")]
    Disposed,
}

impl StoreError {
    /// Extended SQLite result code, if this is an engine failure
    pub fn sqlite_code(&self) -> Option<i32> {
        match self {
            StoreError::Sqlite { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn io_at(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("Failed to {} '{}'", action, path.display()), source)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message) => StoreError::Sqlite {
                code: failure.extended_code,
                message: message.or_else(|| Some(failure.to_string())),
            },
            // Conversion failures never reach the engine; they are bad data
            rusqlite::Error::FromSqlConversionFailure(idx, _, source) => {
                StoreError::Integrity(format!("Column {} could not be converted: {}", idx, source))
            }
            rusqlite::Error::InvalidColumnType(idx, name, ty) => StoreError::Integrity(format!(
                "Column {} ('{}') has unexpected type {}",
                idx, name, ty
            )),
            other => StoreError::Sqlite {
                code: -1,
                message: Some(other.to_string()),
            },
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Integrity(format!("Malformed card document: {}", err))
    }
}
