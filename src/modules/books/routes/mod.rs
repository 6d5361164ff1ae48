use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shelf_authz::CallerIdentity;
use shelf_http::error::AppError;

use super::error::LedgerError;
use super::models::{Book, BookDraft, LendingRecord};
use super::service::LibraryService;

/// Shared handler state
#[derive(Clone)]
pub struct BooksState {
    pub service: Arc<LibraryService>,
    pub identity_header: HeaderName,
}

impl BooksState {
    fn caller(&self, headers: &HeaderMap) -> HeaderIdentity {
        HeaderIdentity(
            headers
                .get(&self.identity_header)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        )
    }
}

/// Caller role taken verbatim from the identity header.
///
/// The header is trusted as verified. The fronting gateway must strip or
/// overwrite it on every inbound request; a port reachable without that
/// gateway lets any client claim any role.
struct HeaderIdentity(Option<String>);

impl CallerIdentity for HeaderIdentity {
    fn caller_role(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let code = err.code();
        let message = err.to_string();

        let error = match &err {
            LedgerError::NotFound(_) | LedgerError::RecordNotFound(_) => {
                AppError::not_found(message)
            }
            LedgerError::DuplicateBook {
                book_key,
                existing_id,
            } => AppError::conflict(
                vec![json!({ "book_key": book_key, "existing_id": existing_id })],
                message,
            ),
            LedgerError::BookExists(id)
            | LedgerError::AlreadyBorrowed(id)
            | LedgerError::NotBorrowed(id) => {
                AppError::conflict(vec![json!({ "book_id": id })], message)
            }
            LedgerError::Unauthorized(_) => AppError::forbidden(message),
            LedgerError::InvalidArgument(_) => AppError::bad_request(message),
            LedgerError::StoreFailure(_) => AppError::unavailable(message),
            LedgerError::DecodeFailure { .. } | LedgerError::EncodeFailure { .. } => {
                AppError::fault(message)
            }
        };

        error.with_code(code)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub pattern: String,
}

/// Full replacement of a book's editable fields
#[derive(Debug, Deserialize)]
pub struct BookUpdate {
    pub name: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub borrower: String,
}

#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub borrower: String,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_books))
        .route("/{id}", get(read_book).put(update_book).delete(delete_book))
        .route("/{id}/borrow", post(borrow_book))
        .route("/{id}/return", post(return_book))
        .route("/{id}/record", get(lending_record))
        .route("/{id}/consistency", get(consistency))
        .with_state(state)
}

async fn list_books(State(state): State<BooksState>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.service.list_all()?))
}

async fn search_books(
    State(state): State<BooksState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.service.query_by_pattern(&params.pattern)?))
}

async fn create_book(
    State(state): State<BooksState>,
    headers: HeaderMap,
    Json(draft): Json<BookDraft>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = state.caller(&headers);
    let id = state.service.create_book(&caller, draft)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn read_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(state.service.read_book(&id)?))
}

/// The book key is recomputed and availability follows the borrower, so a
/// client cannot store a book that contradicts itself.
async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    Json(update): Json<BookUpdate>,
) -> Result<Json<Book>, AppError> {
    let mut book = Book {
        id,
        name: update.name,
        author: update.author,
        isbn: update.isbn,
        description: update.description,
        available: update.borrower.is_empty(),
        borrower: update.borrower,
        publisher: update.publisher,
        book_key: String::new(),
    };
    book.rekey();

    state.service.update_book(&book)?;
    Ok(Json(book))
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.service.delete_book(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn borrow_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<BorrowRequest>,
) -> Result<Json<Book>, AppError> {
    let caller = state.caller(&headers);
    Ok(Json(state.service.borrow_book(&caller, &id, &request.borrower)?))
}

async fn return_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Book>, AppError> {
    let caller = state.caller(&headers);
    Ok(Json(state.service.return_book(&caller, &id)?))
}

async fn lending_record(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Json<LendingRecord>, AppError> {
    Ok(Json(state.service.lending_record(&id)?))
}

async fn consistency(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let consistency = state.service.inspect_consistency(&id)?;
    Ok(Json(json!({
        "book_id": id,
        "consistent": consistency.is_consistent(),
        "detail": consistency,
    })))
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn id_parameter() -> Value {
    json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    }])
}

fn caller_parameter(identity_header: &str) -> Value {
    json!({
        "name": identity_header,
        "in": "header",
        "required": true,
        "description": "Verified caller role",
        "schema": { "type": "string" }
    })
}

/// OpenAPI fragment for the books routes
pub fn openapi(identity_header: &str) -> Value {
    let book = json!({ "$ref": "#/components/schemas/Book" });
    let books = json!({ "type": "array", "items": book });

    json!({
        "paths": {
            "": {
                "get": {
                    "summary": "List every book",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("All books in key order", books.clone()),
                        "503": error_response("World state unavailable")
                    }
                },
                "post": {
                    "summary": "Add a book",
                    "tags": ["Books"],
                    "parameters": [caller_parameter(identity_header)],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookDraft" }
                            }
                        }
                    },
                    "responses": {
                        "201": json_response(
                            "Book added",
                            json!({ "type": "object", "properties": { "id": { "type": "string" } } })
                        ),
                        "403": error_response("Caller is not authorized"),
                        "409": error_response("Duplicate book or taken id")
                    }
                }
            },
            "/search": {
                "get": {
                    "summary": "Books whose name, author, publisher, ISBN, id, or book key contains the pattern",
                    "tags": ["Books"],
                    "parameters": [{
                        "name": "pattern",
                        "in": "query",
                        "required": false,
                        "schema": { "type": "string" }
                    }],
                    "responses": {
                        "200": json_response("Matching books in key order", books)
                    }
                }
            },
            "/{id}": {
                "parameters": id_parameter(),
                "get": {
                    "summary": "Read a book",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("The book", book.clone()),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Replace a book's fields",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookUpdate" }
                            }
                        }
                    },
                    "responses": {
                        "200": json_response("The stored book", book.clone()),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/{id}/borrow": {
                "parameters": id_parameter(),
                "post": {
                    "summary": "Lend a book",
                    "tags": ["Lending"],
                    "parameters": [caller_parameter(identity_header)],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BorrowRequest" }
                            }
                        }
                    },
                    "responses": {
                        "200": json_response("The borrowed book", book.clone()),
                        "403": error_response("Caller is not authorized"),
                        "404": error_response("Book not found"),
                        "409": error_response("Book already borrowed")
                    }
                }
            },
            "/{id}/return": {
                "parameters": id_parameter(),
                "post": {
                    "summary": "Return a book",
                    "tags": ["Lending"],
                    "parameters": [caller_parameter(identity_header)],
                    "responses": {
                        "200": json_response("The returned book", book),
                        "403": error_response("Caller is not authorized"),
                        "404": error_response("Book or lending record not found"),
                        "409": error_response("Book is not borrowed")
                    }
                }
            },
            "/{id}/record": {
                "parameters": id_parameter(),
                "get": {
                    "summary": "Latest lending record of a book",
                    "tags": ["Lending"],
                    "responses": {
                        "200": json_response(
                            "The lending record",
                            json!({ "$ref": "#/components/schemas/LendingRecord" })
                        ),
                        "404": error_response("No lending record")
                    }
                }
            },
            "/{id}/consistency": {
                "parameters": id_parameter(),
                "get": {
                    "summary": "Compare a book with its lending record",
                    "tags": ["Lending"],
                    "responses": {
                        "200": json_response("Consistency report", json!({ "type": "object" })),
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "ID": { "type": "string" },
                        "name": { "type": "string" },
                        "author": { "type": "string" },
                        "isbn": { "type": "string" },
                        "description": { "type": "string" },
                        "available": { "type": "boolean" },
                        "borrower": { "type": "string", "description": "Empty when available" },
                        "publisher": { "type": "string" },
                        "bookKey": { "type": "string", "description": "Fingerprint of name, author, publisher and ISBN" }
                    },
                    "required": ["ID", "name", "author", "isbn", "description", "available", "borrower", "publisher", "bookKey"]
                },
                "BookDraft": {
                    "type": "object",
                    "properties": {
                        "ID": { "type": "string", "description": "Generated when absent" },
                        "name": { "type": "string" },
                        "author": { "type": "string" },
                        "publisher": { "type": "string" },
                        "isbn": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name", "author", "publisher", "isbn"]
                },
                "BookUpdate": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "author": { "type": "string" },
                        "publisher": { "type": "string" },
                        "isbn": { "type": "string" },
                        "description": { "type": "string" },
                        "borrower": { "type": "string" }
                    },
                    "required": ["name", "author", "publisher", "isbn"]
                },
                "BorrowRequest": {
                    "type": "object",
                    "properties": { "borrower": { "type": "string" } },
                    "required": ["borrower"]
                },
                "LendingRecord": {
                    "type": "object",
                    "properties": {
                        "bookID": { "type": "string" },
                        "borrower": { "type": "string" },
                        "lendingTime": { "type": "integer", "format": "int64" },
                        "returnTime": { "type": "integer", "format": "int64", "description": "0 while the book is out" }
                    },
                    "required": ["bookID", "borrower", "lendingTime", "returnTime"]
                }
            }
        }
    })
}
