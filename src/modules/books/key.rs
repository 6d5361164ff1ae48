use sha2::{Digest, Sha256};

/// Separator between fields. Keeps `("ab", "c")` and `("a", "bc")` apart.
const FIELD_SEPARATOR: u8 = b'|';

/// Bytes of the digest kept in the key (128 bits).
const KEY_BYTES: usize = 16;

/// Content fingerprint of a book's descriptive fields.
///
/// Returns 32 lowercase hex characters. This is an equality fingerprint for
/// de-duplication, not a security boundary.
pub fn derive_book_key(name: &str, author: &str, publisher: &str, isbn: &str) -> String {
    let mut hasher = Sha256::new();
    for (index, field) in [name, author, publisher, isbn].into_iter().enumerate() {
        if index > 0 {
            hasher.update([FIELD_SEPARATOR]);
        }
        hasher.update(field.as_bytes());
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..KEY_BYTES])
}
