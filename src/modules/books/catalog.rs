use std::sync::Arc;

use shelf_db::WorldState;
use uuid::Uuid;

use super::error::{LedgerError, LedgerResult};
use super::key::derive_book_key;
use super::lending::RECORD_PREFIX;
use super::models::{decode, encode, Book, BookDraft};
use super::search::SearchIndex;

/// Book records keyed by book id.
#[derive(Clone)]
pub struct BookCatalog {
    state: Arc<dyn WorldState>,
    search: SearchIndex,
}

impl BookCatalog {
    pub fn new(state: Arc<dyn WorldState>) -> Self {
        Self {
            search: SearchIndex::new(state.clone()),
            state,
        }
    }

    pub fn search(&self) -> &SearchIndex {
        &self.search
    }

    /// Add a book. Rejects drafts whose book key is already in the catalog.
    ///
    /// Authorization is the caller's job.
    pub fn create(&self, draft: BookDraft) -> LedgerResult<Book> {
        let book_key = derive_book_key(&draft.name, &draft.author, &draft.publisher, &draft.isbn);

        if let Some(existing) = self.search.find_by_book_key(&book_key)? {
            return Err(LedgerError::DuplicateBook {
                book_key,
                existing_id: existing.id,
            });
        }

        let id = match draft.id.filter(|id| !id.is_empty()) {
            Some(id) => {
                validate_id(&id)?;
                if self.exists(&id)? {
                    return Err(LedgerError::BookExists(id));
                }
                id
            }
            None => Uuid::now_v7().to_string(),
        };

        let book = Book {
            id,
            name: draft.name,
            author: draft.author,
            isbn: draft.isbn,
            description: draft.description,
            available: true,
            borrower: String::new(),
            publisher: draft.publisher,
            book_key,
        };
        self.write(&book)?;

        tracing::info!(book_id = %book.id, book_key = %book.book_key, "book added to catalog");
        Ok(book)
    }

    /// Fails with `NotFound` when nothing, or an empty value, is stored at `id`.
    /// Ids in the lending-record namespace never name a book.
    pub fn read(&self, id: &str) -> LedgerResult<Book> {
        match self.stored(id)? {
            Some(bytes) => decode(id, &bytes),
            None => Err(LedgerError::NotFound(id.to_string())),
        }
    }

    pub fn exists(&self, id: &str) -> LedgerResult<bool> {
        Ok(self.stored(id)?.is_some())
    }

    fn stored(&self, id: &str) -> LedgerResult<Option<Vec<u8>>> {
        if id.starts_with(RECORD_PREFIX) {
            return Ok(None);
        }
        Ok(self.state.get(id)?.filter(|bytes| !bytes.is_empty()))
    }

    /// Replace every field of an existing book. Last writer wins.
    pub fn update(&self, book: &Book) -> LedgerResult<()> {
        let mut existing = self.read(&book.id)?;

        existing.name.clone_from(&book.name);
        existing.author.clone_from(&book.author);
        existing.isbn.clone_from(&book.isbn);
        existing.publisher.clone_from(&book.publisher);
        existing.description.clone_from(&book.description);
        existing.book_key.clone_from(&book.book_key);
        existing.borrower.clone_from(&book.borrower);
        existing.available = book.available;

        self.write(&existing)
    }

    pub fn delete(&self, id: &str) -> LedgerResult<()> {
        if !self.exists(id)? {
            return Err(LedgerError::NotFound(id.to_string()));
        }
        self.state.delete(id)?;
        tracing::info!(book_id = id, "book removed from catalog");
        Ok(())
    }

    /// Unconditional write, used when seeding.
    pub(crate) fn write(&self, book: &Book) -> LedgerResult<()> {
        let bytes = encode(&book.id, book)?;
        self.state.put(&book.id, bytes)?;
        Ok(())
    }
}

/// Path segments routed ahead of `/{id}`.
const RESERVED_IDS: [&str; 1] = ["search"];

fn validate_id(id: &str) -> LedgerResult<()> {
    if id.starts_with(RECORD_PREFIX) {
        return Err(LedgerError::InvalidArgument(format!(
            "book id '{}' uses the reserved prefix '{}'",
            id, RECORD_PREFIX
        )));
    }
    if RESERVED_IDS.contains(&id) {
        return Err(LedgerError::InvalidArgument(format!("book id '{}' is reserved", id)));
    }
    Ok(())
}
