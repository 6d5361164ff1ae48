use std::sync::Arc;

use shelf_authz::{AuthorizationGate, CallerIdentity};
use shelf_db::WorldState;

use super::catalog::BookCatalog;
use super::clock::{Clock, SystemClock};
use super::error::{LedgerError, LedgerResult};
use super::key::derive_book_key;
use super::lending::{self, Consistency, LendingLedger};
use super::models::{Book, BookDraft, BookState, LendingRecord};
use super::search::SearchIndex;

/// (id, name, author, publisher, isbn, description)
const STARTER_BOOKS: [(&str, &str, &str, &str, &str, &str); 5] = [
    ("B1", "Book1", "Author1", "p1", "111-1111111111", "This is book 1"),
    ("B2", "Book2", "Author2", "P1", "222-2222222222", "This is book 2"),
    ("B3", "Book3", "Author3", "p1", "333-3333333333", "This is book 3"),
    ("B4", "Book4", "Author4", "p2", "444-4444444444", "This is book 4"),
    ("B5", "Book5", "Author5", "p2", "555-5555555555", "This is book 5"),
];

/// Operation surface of the lending ledger.
///
/// Borrow and return are two independent writes: the lending record first,
/// then the book. A failure between them is surfaced as-is and leaves the
/// pair inconsistent; [`LibraryService::inspect_consistency`] reports such
/// pairs.
#[derive(Clone)]
pub struct LibraryService {
    catalog: BookCatalog,
    ledger: LendingLedger,
    gate: AuthorizationGate,
    clock: Arc<dyn Clock>,
}

impl LibraryService {
    pub fn new(state: Arc<dyn WorldState>, gate: AuthorizationGate) -> Self {
        Self {
            catalog: BookCatalog::new(state.clone()),
            ledger: LendingLedger::new(state),
            gate,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn search(&self) -> &SearchIndex {
        self.catalog.search()
    }

    /// Write the five starter books, all available. Existing entries at
    /// those ids are overwritten.
    pub fn init_catalog(&self) -> LedgerResult<Vec<Book>> {
        let mut seeded = Vec::with_capacity(STARTER_BOOKS.len());

        for (id, name, author, publisher, isbn, description) in STARTER_BOOKS {
            let book = Book {
                id: id.to_string(),
                name: name.to_string(),
                author: author.to_string(),
                isbn: isbn.to_string(),
                description: description.to_string(),
                available: true,
                borrower: String::new(),
                publisher: publisher.to_string(),
                book_key: derive_book_key(name, author, publisher, isbn),
            };
            self.catalog.write(&book)?;
            seeded.push(book);
        }

        tracing::info!(books = seeded.len(), "catalog seeded");
        Ok(seeded)
    }

    pub fn create_book(
        &self,
        caller: &dyn CallerIdentity,
        draft: BookDraft,
    ) -> LedgerResult<String> {
        self.gate.authorize(caller)?;
        Ok(self.catalog.create(draft)?.id)
    }

    pub fn read_book(&self, id: &str) -> LedgerResult<Book> {
        self.catalog.read(id)
    }

    pub fn book_exists(&self, id: &str) -> LedgerResult<bool> {
        self.catalog.exists(id)
    }

    pub fn update_book(&self, book: &Book) -> LedgerResult<()> {
        self.catalog.update(book)
    }

    pub fn delete_book(&self, id: &str) -> LedgerResult<()> {
        self.catalog.delete(id)
    }

    /// Available -> Borrowed.
    pub fn borrow_book(
        &self,
        caller: &dyn CallerIdentity,
        id: &str,
        borrower: &str,
    ) -> LedgerResult<Book> {
        self.gate.authorize(caller)?;

        if borrower.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "borrower must not be empty".to_string(),
            ));
        }

        let mut book = self.catalog.read(id)?;
        if book.state() == BookState::Borrowed {
            return Err(LedgerError::AlreadyBorrowed(id.to_string()));
        }

        book.borrower = borrower.to_string();
        book.available = false;

        self.ledger.record_lend(id, borrower, self.clock.now())?;
        self.catalog.update(&book).inspect_err(|err| {
            tracing::error!(
                book_id = id,
                borrower,
                error = %err,
                "lending record opened but book update failed"
            );
        })?;

        tracing::info!(book_id = id, borrower, "book borrowed");
        Ok(book)
    }

    /// Borrowed -> Available.
    pub fn return_book(&self, caller: &dyn CallerIdentity, id: &str) -> LedgerResult<Book> {
        self.gate.authorize(caller)?;

        let mut book = self.catalog.read(id)?;
        if book.state() == BookState::Available {
            return Err(LedgerError::NotBorrowed(id.to_string()));
        }

        let borrower = std::mem::take(&mut book.borrower);
        book.available = true;

        self.ledger.record_return(id, self.clock.now())?;
        self.catalog.update(&book).inspect_err(|err| {
            tracing::error!(
                book_id = id,
                borrower = %borrower,
                error = %err,
                "lending record closed but book update failed"
            );
        })?;

        tracing::info!(book_id = id, borrower = %borrower, "book returned");
        Ok(book)
    }

    pub fn query_by_pattern(&self, pattern: &str) -> LedgerResult<Vec<Book>> {
        self.search().query_by_pattern(pattern)
    }

    pub fn list_all(&self) -> LedgerResult<Vec<Book>> {
        self.search().list_all()
    }

    pub fn lending_record(&self, id: &str) -> LedgerResult<LendingRecord> {
        self.ledger.read(id)
    }

    /// Compare a book with its lending record. Read-only.
    pub fn inspect_consistency(&self, id: &str) -> LedgerResult<Consistency> {
        let book = self.catalog.read(id)?;
        let record = self.ledger.find(id)?;
        let consistency = lending::inspect(&book, record.as_ref());
        if !consistency.is_consistent() {
            tracing::warn!(book_id = id, ?consistency, "book and lending record disagree");
        }
        Ok(consistency)
    }
}
