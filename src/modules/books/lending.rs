use std::sync::Arc;

use serde::Serialize;
use shelf_db::WorldState;

use super::error::{LedgerError, LedgerResult};
use super::models::{decode, encode, Book, BookState, LendingRecord};

/// Key prefix of the lending-record namespace.
pub const RECORD_PREFIX: &str = "record-";

pub fn record_key(book_id: &str) -> String {
    format!("{RECORD_PREFIX}{book_id}")
}

/// Lending history, one record per book, amended in place on return.
#[derive(Clone)]
pub struct LendingLedger {
    state: Arc<dyn WorldState>,
}

impl LendingLedger {
    pub fn new(state: Arc<dyn WorldState>) -> Self {
        Self { state }
    }

    /// Open a record for `book_id`.
    ///
    /// Overwrites whatever record was stored for the book, open or not. The
    /// one-borrower guard lives on the book, in the borrow transition.
    pub fn record_lend(
        &self,
        book_id: &str,
        borrower: &str,
        lending_time: i64,
    ) -> LedgerResult<LendingRecord> {
        let record = LendingRecord {
            book_id: book_id.to_string(),
            borrower: borrower.to_string(),
            lending_time,
            return_time: 0,
        };
        self.write(&record)?;
        tracing::debug!(book_id, borrower, lending_time, "lending record opened");
        Ok(record)
    }

    /// Close the stored record for `book_id`, keeping borrower and lending time.
    pub fn record_return(&self, book_id: &str, return_time: i64) -> LedgerResult<LendingRecord> {
        let mut record = self.read(book_id)?;
        record.return_time = return_time;
        self.write(&record)?;
        tracing::debug!(book_id, return_time, "lending record closed");
        Ok(record)
    }

    pub fn read(&self, book_id: &str) -> LedgerResult<LendingRecord> {
        self.find(book_id)?
            .ok_or_else(|| LedgerError::RecordNotFound(book_id.to_string()))
    }

    pub fn find(&self, book_id: &str) -> LedgerResult<Option<LendingRecord>> {
        let key = record_key(book_id);
        match self.state.get(&key)? {
            Some(bytes) if !bytes.is_empty() => decode(&key, &bytes).map(Some),
            _ => Ok(None),
        }
    }

    fn write(&self, record: &LendingRecord) -> LedgerResult<()> {
        let key = record_key(&record.book_id);
        let bytes = encode(&key, record)?;
        self.state.put(&key, bytes)?;
        Ok(())
    }
}

/// Agreement between a book and its lending record.
///
/// Borrow and return write the record and the book separately, so a failure
/// between the two writes leaves them disagreeing. Nothing here repairs that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Consistency {
    Consistent,
    /// Never borrowed; no record stored.
    NoHistory,
    /// Book is out but its record is closed or missing.
    BorrowedWithoutOpenRecord,
    /// Book is on the shelf but its record is still open.
    AvailableWithOpenRecord { borrower: String },
    /// Book and record name different borrowers.
    BorrowerMismatch { book: String, record: String },
}

impl Consistency {
    pub fn is_consistent(&self) -> bool {
        matches!(self, Consistency::Consistent | Consistency::NoHistory)
    }
}

pub fn inspect(book: &Book, record: Option<&LendingRecord>) -> Consistency {
    match (book.state(), record) {
        (BookState::Available, None) => Consistency::NoHistory,
        (BookState::Available, Some(record)) if record.is_open() => {
            Consistency::AvailableWithOpenRecord {
                borrower: record.borrower.clone(),
            }
        }
        (BookState::Available, Some(_)) => Consistency::Consistent,
        (BookState::Borrowed, Some(record)) if record.is_open() => {
            if record.borrower == book.borrower {
                Consistency::Consistent
            } else {
                Consistency::BorrowerMismatch {
                    book: book.borrower.clone(),
                    record: record.borrower.clone(),
                }
            }
        }
        (BookState::Borrowed, _) => Consistency::BorrowedWithoutOpenRecord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_db::MemoryWorldState;

    fn ledger() -> LendingLedger {
        LendingLedger::new(Arc::new(MemoryWorldState::new()))
    }

    #[test]
    fn lend_writes_an_open_record() {
        let ledger = ledger();
        ledger.record_lend("B1", "alice", 100).unwrap();
        let record = ledger.read("B1").unwrap();
        assert_eq!(record.borrower, "alice");
        assert_eq!(record.lending_time, 100);
        assert!(record.is_open());
    }

    #[test]
    fn return_amends_the_existing_record() {
        let ledger = ledger();
        ledger.record_lend("B1", "alice", 100).unwrap();
        let closed = ledger.record_return("B1", 250).unwrap();
        assert_eq!(
            closed,
            LendingRecord {
                book_id: "B1".into(),
                borrower: "alice".into(),
                lending_time: 100,
                return_time: 250,
            }
        );
        assert_eq!(ledger.read("B1").unwrap(), closed);
    }

    #[test]
    fn return_without_record_fails() {
        let err = ledger().record_return("B9", 1).unwrap_err();
        assert!(matches!(err, LedgerError::RecordNotFound(ref id) if id == "B9"));
    }

    #[test]
    fn lend_overwrites_an_open_record() {
        let ledger = ledger();
        ledger.record_lend("B1", "alice", 100).unwrap();
        ledger.record_lend("B1", "bob", 200).unwrap();
        let record = ledger.read("B1").unwrap();
        assert_eq!(record.borrower, "bob");
        assert_eq!(record.lending_time, 200);
    }

    #[test]
    fn records_live_under_their_own_prefix() {
        assert_eq!(record_key("B1"), "record-B1");
    }

    fn book(borrower: &str) -> Book {
        Book {
            id: "B1".into(),
            available: borrower.is_empty(),
            borrower: borrower.into(),
            ..Book::default()
        }
    }

    fn record(borrower: &str, return_time: i64) -> LendingRecord {
        LendingRecord {
            book_id: "B1".into(),
            borrower: borrower.into(),
            lending_time: 10,
            return_time,
        }
    }

    #[test]
    fn inspect_reports_each_disagreement() {
        assert_eq!(inspect(&book(""), None), Consistency::NoHistory);
        assert_eq!(inspect(&book(""), Some(&record("alice", 20))), Consistency::Consistent);
        assert_eq!(inspect(&book("alice"), Some(&record("alice", 0))), Consistency::Consistent);
        assert_eq!(
            inspect(&book(""), Some(&record("alice", 0))),
            Consistency::AvailableWithOpenRecord {
                borrower: "alice".into()
            }
        );
        assert_eq!(
            inspect(&book("alice"), None),
            Consistency::BorrowedWithoutOpenRecord
        );
        assert_eq!(
            inspect(&book("alice"), Some(&record("alice", 20))),
            Consistency::BorrowedWithoutOpenRecord
        );
        assert_eq!(
            inspect(&book("alice"), Some(&record("bob", 0))),
            Consistency::BorrowerMismatch {
                book: "alice".into(),
                record: "bob".into()
            }
        );
    }
}
