//! Encryption-context canonicalization.
//!
//! An encryption context is a caller-supplied string map that is bound to a
//! ciphertext as associated data. Two maps with the same pairs must produce
//! the same bytes regardless of how the caller ordered them, so the pairs are
//! serialized in byte order of their keys.

use std::collections::BTreeMap;

/// Serializes an encryption context into associated-data bytes.
///
/// Keys are taken in byte order; each key's raw bytes are followed
/// immediately by its value's raw bytes, with no delimiters or length
/// prefixes. The empty context canonicalizes to the empty byte string.
///
/// Because fields are not delimited, contexts such as `{"ab": "c"}` and
/// `{"a": "bc"}` canonicalize to the same bytes. This matches the wire
/// format ciphertexts were produced under and must not be changed without
/// versioning the container.
pub fn canonical_aad(context: &BTreeMap<String, String>) -> Vec<u8> {
    let mut aad = Vec::new();
    for (key, value) in context {
        aad.extend_from_slice(key.as_bytes());
        aad.extend_from_slice(value.as_bytes());
    }
    aad
}
