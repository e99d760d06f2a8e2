//! Content hashing for memo fingerprints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content hash computed using XXH3.
///
/// Two inputs with the same `ContentHash` are assumed to have identical
/// canonical encodings. The memo cache uses it as a fast pre-check before a
/// full structural comparison of the stored inputs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Returns the raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Canonical byte encoder whose output is hashed into a [`ContentHash`].
///
/// Every write is prefixed with a type tag, and variable-length data is
/// length-prefixed, so two different sequences of writes never produce the
/// same byte stream.
#[derive(Debug, Default, Clone)]
pub struct FingerprintBuilder {
    buf: Vec<u8>,
}

const TAG_TAG: u8 = 0x01;
const TAG_BOOL: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_STR: u8 = 0x05;
const TAG_LEN: u8 = 0x06;
const TAG_U64: u8 = 0x07;
const TAG_HASH: u8 = 0x08;

impl FingerprintBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a caller-defined discriminant, e.g. the variant of an enum.
    pub fn tag(&mut self, tag: u8) -> &mut Self {
        self.buf.push(TAG_TAG);
        self.buf.push(tag);
        self
    }

    /// Writes a boolean.
    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(TAG_BOOL);
        self.buf.push(u8::from(value));
        self
    }

    /// Writes a signed integer.
    pub fn int(&mut self, value: i64) -> &mut Self {
        self.buf.push(TAG_INT);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Writes an unsigned integer.
    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.push(TAG_U64);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Writes a float by its bit pattern, with `-0.0` folded into `0.0` and
    /// every NaN folded into one canonical NaN.
    pub fn float(&mut self, value: f64) -> &mut Self {
        let canonical = if value == 0.0 {
            0.0f64
        } else if value.is_nan() {
            f64::NAN
        } else {
            value
        };
        self.buf.push(TAG_FLOAT);
        self.buf.extend_from_slice(&canonical.to_bits().to_le_bytes());
        self
    }

    /// Writes a length-prefixed string.
    pub fn str(&mut self, value: &str) -> &mut Self {
        self.buf.push(TAG_STR);
        self.buf
            .extend_from_slice(&(value.len() as u64).to_le_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Writes the element count of a collection that follows.
    pub fn len(&mut self, len: usize) -> &mut Self {
        self.buf.push(TAG_LEN);
        self.buf.extend_from_slice(&(len as u64).to_le_bytes());
        self
    }

    /// Writes a previously computed hash in place of the value it covers.
    ///
    /// Lets a composite reuse the fingerprint of an unchanged part instead of
    /// re-encoding it.
    pub fn hash(&mut self, hash: ContentHash) -> &mut Self {
        self.buf.push(TAG_HASH);
        self.buf.extend_from_slice(hash.as_bytes());
        self
    }

    /// Returns the number of bytes written so far.
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// Hashes the accumulated encoding.
    pub fn finish(&self) -> ContentHash {
        ContentHash::from_bytes(&self.buf)
    }
}
