use std::sync::Arc;

use shelf_db::WorldState;

use super::error::LedgerResult;
use super::lending::RECORD_PREFIX;
use super::models::{decode, Book};

/// Pattern search over the catalog by full scan.
///
/// Every create pays one scan for its duplicate check. A book-key index
/// (book key to book id) would answer the same questions without changing
/// results.
#[derive(Clone)]
pub struct SearchIndex {
    state: Arc<dyn WorldState>,
}

impl SearchIndex {
    pub fn new(state: Arc<dyn WorldState>) -> Self {
        Self { state }
    }

    /// Books whose name, author, publisher, ISBN, id, or book key contains
    /// `pattern` (case-sensitive), in key order. An empty pattern matches
    /// every book.
    pub fn query_by_pattern(&self, pattern: &str) -> LedgerResult<Vec<Book>> {
        let mut results = Vec::new();

        for entry in self.state.scan("", "")? {
            // Empty values read as absent, same as a point read.
            if entry.key.starts_with(RECORD_PREFIX) || entry.value.is_empty() {
                continue;
            }
            let book: Book = decode(&entry.key, &entry.value)?;
            if matches(&book, pattern) {
                results.push(book);
            }
        }

        tracing::debug!(pattern, hits = results.len(), "catalog scanned");
        Ok(results)
    }

    pub fn list_all(&self) -> LedgerResult<Vec<Book>> {
        self.query_by_pattern("")
    }

    /// The book whose stored key equals `book_key`, if any.
    pub fn find_by_book_key(&self, book_key: &str) -> LedgerResult<Option<Book>> {
        Ok(self
            .query_by_pattern(book_key)?
            .into_iter()
            .find(|book| book.book_key == book_key))
    }
}

fn matches(book: &Book, pattern: &str) -> bool {
    [
        &book.name,
        &book.author,
        &book.publisher,
        &book.isbn,
        &book.id,
        &book.book_key,
    ]
    .iter()
    .any(|field| field.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::encode;
    use shelf_db::MemoryWorldState;

    fn book(id: &str, name: &str, author: &str, publisher: &str) -> Book {
        let mut book = Book {
            id: id.into(),
            name: name.into(),
            author: author.into(),
            publisher: publisher.into(),
            isbn: format!("{id}-isbn"),
            description: "not searched".into(),
            available: true,
            ..Book::default()
        };
        book.rekey();
        book
    }

    fn index_with(books: &[Book]) -> (Arc<MemoryWorldState>, SearchIndex) {
        let state = Arc::new(MemoryWorldState::new());
        for book in books {
            state.put(&book.id, encode(&book.id, book).unwrap()).unwrap();
        }
        (state.clone(), SearchIndex::new(state))
    }

    fn ids(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn empty_pattern_returns_everything_in_key_order() {
        let (_, index) = index_with(&[
            book("B2", "Dune", "Herbert", "Chilton"),
            book("B1", "Emma", "Austen", "Murray"),
        ]);
        assert_eq!(ids(&index.list_all().unwrap()), vec!["B1", "B2"]);
    }

    #[test]
    fn pattern_matches_any_searched_field() {
        let (_, index) = index_with(&[
            book("B1", "Emma", "Austen", "Murray"),
            book("B2", "Dune", "Herbert", "Chilton"),
            book("B3", "Persuasion", "Austen", "Murray"),
        ]);
        assert_eq!(ids(&index.query_by_pattern("Austen").unwrap()), vec!["B1", "B3"]);
        assert_eq!(ids(&index.query_by_pattern("Chil").unwrap()), vec!["B2"]);
        assert_eq!(ids(&index.query_by_pattern("B3-isbn").unwrap()), vec!["B3"]);
        assert_eq!(ids(&index.query_by_pattern("B2").unwrap()), vec!["B2"]);
    }

    #[test]
    fn description_is_not_searched() {
        let (_, index) = index_with(&[book("B1", "Emma", "Austen", "Murray")]);
        assert!(index.query_by_pattern("not searched").unwrap().is_empty());
    }

    #[test]
    fn matching_is_case_sensitive() {
        let (_, index) = index_with(&[book("B1", "Emma", "Austen", "Murray")]);
        assert!(index.query_by_pattern("austen").unwrap().is_empty());
    }

    #[test]
    fn lending_records_are_not_books() {
        let (state, index) = index_with(&[book("B1", "Emma", "Austen", "Murray")]);
        state
            .put(
                "record-B1",
                br#"{"bookID":"B1","borrower":"alice","lendingTime":1,"returnTime":0}"#.to_vec(),
            )
            .unwrap();
        assert_eq!(ids(&index.list_all().unwrap()), vec!["B1"]);
    }

    #[test]
    fn book_key_lookup_is_exact() {
        let emma = book("B1", "Emma", "Austen", "Murray");
        let (_, index) = index_with(&[emma.clone()]);
        assert_eq!(index.find_by_book_key(&emma.book_key).unwrap(), Some(emma.clone()));
        assert_eq!(index.find_by_book_key(&emma.book_key[..8]).unwrap(), None);
    }

    #[test]
    fn undecodable_value_aborts_the_scan() {
        let (state, index) = index_with(&[book("B1", "Emma", "Austen", "Murray")]);
        state.put("B0", b"{".to_vec()).unwrap();
        let err = index.list_all().unwrap_err();
        assert_eq!(err.code(), "decode_failure");
    }
}
