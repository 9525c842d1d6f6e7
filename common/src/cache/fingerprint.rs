//! Content fingerprints used as cache keys.
//!
//! Every digest is a lowercase hex SHA-256. Questions and chunks are normalized
//! before hashing so that cosmetic differences map onto the same entry.

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Number of hex characters kept from the question digest in answer keys.
pub const QUERY_FINGERPRINT_LEN: usize = 16;

/// Digest of raw upload bytes.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Digest of a text exactly as given.
pub fn fingerprint_text(text: &str) -> String {
    fingerprint_bytes(text.as_bytes())
}

/// Case-folds and trims a question.
pub fn normalize_question(question: &str) -> String {
    question.nfkc().collect::<String>().trim().to_lowercase()
}

/// Trims a chunk and collapses whitespace runs to a single space.
pub fn normalize_chunk(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Digest used to identify a chunk's embedding regardless of its document.
pub fn chunk_fingerprint(text: &str) -> String {
    fingerprint_text(&normalize_chunk(text))
}

/// Shortened digest of the normalized question.
pub fn query_fingerprint(question: &str) -> String {
    let mut digest = fingerprint_text(&normalize_question(question));
    digest.truncate(QUERY_FINGERPRINT_LEN);
    digest
}
