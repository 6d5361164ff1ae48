use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::error::LedgerError;

/// A catalog entry as stored at key = `id`.
///
/// `available` mirrors `borrower`: a book is available exactly when nobody
/// holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Book {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub author: String,
    pub isbn: String,
    pub description: String,
    pub available: bool,
    pub borrower: String,
    pub publisher: String,
    /// Content fingerprint used for de-duplication.
    #[serde(rename = "bookKey")]
    pub book_key: String,
}

/// Lending state derived from the borrower field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookState {
    Available,
    Borrowed,
}

impl Book {
    pub fn state(&self) -> BookState {
        if self.borrower.is_empty() {
            BookState::Available
        } else {
            BookState::Borrowed
        }
    }

    /// Recompute `book_key` from the descriptive fields.
    pub fn rekey(&mut self) {
        self.book_key =
            super::key::derive_book_key(&self.name, &self.author, &self.publisher, &self.isbn);
    }
}

/// Descriptive fields supplied when adding a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BookDraft {
    /// Caller-assigned identifier; a fresh one is generated when absent.
    #[serde(default, rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    #[serde(default)]
    pub description: String,
}

/// One borrow-to-return cycle, stored at `record-{bookID}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingRecord {
    #[serde(rename = "bookID")]
    pub book_id: String,
    pub borrower: String,
    /// Seconds since the epoch.
    #[serde(rename = "lendingTime")]
    pub lending_time: i64,
    /// Zero while the book is out.
    #[serde(rename = "returnTime")]
    pub return_time: i64,
}

impl LendingRecord {
    pub fn is_open(&self) -> bool {
        self.return_time == 0
    }
}

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, LedgerError> {
    serde_json::to_vec(value).map_err(|source| LedgerError::EncodeFailure {
        key: key.to_string(),
        source,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, LedgerError> {
    serde_json::from_slice(bytes).map_err(|source| LedgerError::DecodeFailure {
        key: key.to_string(),
        source,
    })
}
