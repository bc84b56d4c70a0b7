//! The binary ciphertext container.
//!
//! A ciphertext blob is self-describing: it names the key that produced it,
//! the nonce used, and the AEAD output. Layout:
//!
//! ```text
//! version    (1 byte, currently 0)
//! key_id     (u16 little-endian length || UTF-8 bytes)
//! nonce      (u16 little-endian length || raw bytes)
//! ciphertext (u16 little-endian length || AEAD output incl. tag)
//! ```
//!
//! Decoding is all-or-nothing: a wrong version, a truncated field, or any
//! trailing bytes discard the parse and surface as the single
//! invalid-ciphertext error.

use crate::error::KmsError;

/// Container version emitted and accepted by this codec.
const VERSION: u8 = 0;

/// Maximum length a single field can carry under the u16 prefix.
const MAX_FIELD_LEN: usize = 0xFFFF;

/// The decoded fields of a ciphertext blob.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedBlob {
    /// Bare id of the key that produced the ciphertext.
    pub key_id: String,
    /// The AEAD nonce.
    pub nonce: Vec<u8>,
    /// AEAD output: ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
}

/// Serializes a ciphertext blob.
///
/// Fails with an internal error if any field exceeds the u16 length prefix;
/// request-size limits upstream make that unreachable in practice.
pub fn encode(key_id: &str, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, KmsError> {
    let mut buf =
        Vec::with_capacity(1 + 3 * 2 + key_id.len() + nonce.len() + ciphertext.len());
    buf.push(VERSION);
    write_field(&mut buf, key_id.as_bytes())?;
    write_field(&mut buf, nonce)?;
    write_field(&mut buf, ciphertext)?;
    Ok(buf)
}

fn write_field(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), KmsError> {
    if bytes.len() > MAX_FIELD_LEN {
        return Err(KmsError::Internal("ciphertext blob field too long".into()));
    }
    buf.push((bytes.len() & 0xFF) as u8);
    buf.push((bytes.len() >> 8) as u8);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Parses a ciphertext blob.
///
/// Any structural problem (bad version, truncation, non-UTF-8 key id,
/// trailing bytes) collapses into [`KmsError::InvalidCiphertext`].
pub fn decode(blob: &[u8]) -> Result<ParsedBlob, KmsError> {
    let mut rest = blob;

    let version = take_byte(&mut rest)?;
    if version != VERSION {
        return Err(KmsError::InvalidCiphertext);
    }

    let key_id = take_field(&mut rest)?;
    let nonce = take_field(&mut rest)?;
    let ciphertext = take_field(&mut rest)?;

    if !rest.is_empty() {
        return Err(KmsError::InvalidCiphertext);
    }

    let key_id = String::from_utf8(key_id).map_err(|_| KmsError::InvalidCiphertext)?;

    Ok(ParsedBlob {
        key_id,
        nonce,
        ciphertext,
    })
}

fn take_byte(rest: &mut &[u8]) -> Result<u8, KmsError> {
    let (&byte, tail) = rest.split_first().ok_or(KmsError::InvalidCiphertext)?;
    *rest = tail;
    Ok(byte)
}

fn take_field(rest: &mut &[u8]) -> Result<Vec<u8>, KmsError> {
    let low = take_byte(rest)?;
    let high = take_byte(rest)?;
    let len = usize::from(low) | (usize::from(high) << 8);

    if rest.len() < len {
        return Err(KmsError::InvalidCiphertext);
    }

    let (field, tail) = rest.split_at(len);
    *rest = tail;
    Ok(field.to_vec())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let nonce = [7u8; 12];
        let ciphertext = b"not really ciphertext".to_vec();

        let blob = encode("42", &nonce, &ciphertext).unwrap();
        let parsed = decode(&blob).unwrap();

        assert_eq!(parsed.key_id, "42");
        assert_eq!(parsed.nonce, nonce);
        assert_eq!(parsed.ciphertext, ciphertext);
    }

    #[test]
    fn test_layout_is_little_endian_length_prefixed() {
        let blob = encode("k", &[0xAA], &[0xBB, 0xCC]).unwrap();
        assert_eq!(
            blob,
            vec![
                0x00, // version
                0x01, 0x00, b'k', // key id
                0x01, 0x00, 0xAA, // nonce
                0x02, 0x00, 0xBB, 0xCC, // ciphertext
            ]
        );
    }

    #[test]
    fn test_empty_blob_rejected() {
        assert!(matches!(decode(&[]), Err(KmsError::InvalidCiphertext)));
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut blob = encode("1", &[0u8; 12], b"ct").unwrap();
        blob[0] = 1;
        assert!(matches!(decode(&blob), Err(KmsError::InvalidCiphertext)));
    }

    #[test]
    fn test_truncation_rejected_at_every_length() {
        let blob = encode("1", &[0u8; 12], b"some ciphertext").unwrap();
        for len in 0..blob.len() {
            assert!(
                matches!(decode(&blob[..len]), Err(KmsError::InvalidCiphertext)),
                "truncation to {} bytes must fail",
                len
            );
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut blob = encode("1", &[0u8; 12], b"ct").unwrap();
        blob.push(0x00);
        assert!(matches!(decode(&blob), Err(KmsError::InvalidCiphertext)));
    }

    #[test]
    fn test_non_utf8_key_id_rejected() {
        // version, then a 1-byte key id that is not valid UTF-8.
        let blob = vec![0x00, 0x01, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(decode(&blob), Err(KmsError::InvalidCiphertext)));
    }

    #[test]
    fn test_field_at_max_length() {
        let big = vec![0x5Au8; MAX_FIELD_LEN];
        let blob = encode("1", &[0u8; 12], &big).unwrap();
        let parsed = decode(&blob).unwrap();
        assert_eq!(parsed.ciphertext.len(), MAX_FIELD_LEN);
    }

    #[test]
    fn test_field_over_max_length_fails() {
        let too_big = vec![0u8; MAX_FIELD_LEN + 1];
        let result = encode("1", &[0u8; 12], &too_big);
        assert!(matches!(result, Err(KmsError::Internal(_))));
    }

    #[test]
    fn test_empty_fields_roundtrip() {
        let blob = encode("", &[], &[]).unwrap();
        let parsed = decode(&blob).unwrap();
        assert_eq!(parsed.key_id, "");
        assert!(parsed.nonce.is_empty());
        assert!(parsed.ciphertext.is_empty());
    }
}
