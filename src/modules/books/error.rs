use shelf_authz::AuthzError;
use shelf_db::StoreError;
use thiserror::Error;

/// Failures of the lending ledger. Each kind carries a stable [`code`].
///
/// [`code`]: LedgerError::code
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("book {0} does not exist")]
    NotFound(String),

    #[error("book {0} already exists")]
    BookExists(String),

    #[error("the book already exists with book key: {book_key}")]
    DuplicateBook { book_key: String, existing_id: String },

    #[error("book {0} is already borrowed")]
    AlreadyBorrowed(String),

    #[error("book {0} is not borrowed")]
    NotBorrowed(String),

    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error("record not found for book ID: {0}")]
    RecordNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("world state failure: {0}")]
    StoreFailure(#[from] StoreError),

    #[error("failed to decode value at key '{key}': {source}")]
    DecodeFailure {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for key '{key}': {source}")]
    EncodeFailure {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "book_not_found",
            LedgerError::BookExists(_) => "book_exists",
            LedgerError::DuplicateBook { .. } => "duplicate_book",
            LedgerError::AlreadyBorrowed(_) => "already_borrowed",
            LedgerError::NotBorrowed(_) => "not_borrowed",
            LedgerError::Unauthorized(_) => "unauthorized",
            LedgerError::RecordNotFound(_) => "record_not_found",
            LedgerError::InvalidArgument(_) => "invalid_argument",
            LedgerError::StoreFailure(_) => "store_failure",
            LedgerError::DecodeFailure { .. } => "decode_failure",
            LedgerError::EncodeFailure { .. } => "encode_failure",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
