//! Content hash values
//!
//! Provides [`ContentHash`], the strongly-typed digest stored in log entries
//! and output records. The value is algorithm-agnostic: it holds up to
//! [`MAX_HASH_LEN`] bytes so a 20-byte SHA-1 digest and a 32-byte SHA-256 or
//! Blake3 digest share one type.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// Largest digest length supported by [`ContentHash`]
pub const MAX_HASH_LEN: usize = 32;

/// A content digest of 1 to 32 bytes
///
/// Immutable and cheap to clone (Copy). Unused trailing bytes are always
/// zero, so derived equality and ordering only ever see the digest itself.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash {
    len: u8,
    bytes: [u8; MAX_HASH_LEN],
}

impl ContentHash {
    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if the slice is empty or longer than [`MAX_HASH_LEN`]
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.is_empty() || bytes.len() > MAX_HASH_LEN {
            return Err(HashError::InvalidLength {
                max: MAX_HASH_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self::from_digest_output(bytes))
    }

    /// Wrap raw digest output; callers guarantee `out.len() <= MAX_HASH_LEN`
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn from_digest_output(out: &[u8]) -> Self {
        let len = out.len().min(MAX_HASH_LEN);
        let mut bytes = [0u8; MAX_HASH_LEN];
        bytes[..len].copy_from_slice(&out[..len]);
        Self {
            len: len as u8,
            bytes,
        }
    }

    /// Digest bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// Digest length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Always false; a hash holds at least one byte
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        let end = self.len().min(8);
        hex::encode(&self.bytes[..end])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}

impl Debug for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

// Hex in text formats, raw bytes in binary ones
impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(self.as_bytes())
        }
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ContentHashVisitor;

        impl<'de> serde::de::Visitor<'de> for ContentHashVisitor {
            type Value = ContentHash;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a digest as hex string or byte array")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ContentHash::from_slice(value).map_err(serde::de::Error::custom)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut buf = Vec::with_capacity(MAX_HASH_LEN);
                while let Some(byte) = seq.next_element::<u8>()? {
                    buf.push(byte);
                }
                ContentHash::from_slice(&buf).map_err(serde::de::Error::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(ContentHashVisitor)
        } else {
            deserializer.deserialize_bytes(ContentHashVisitor)
        }
    }
}

/// Errors that can occur when working with content hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected 1..={max} bytes, got {actual}")]
    InvalidLength { max: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Digest identifier not recognised
    #[error("unknown digest algorithm: '{0}'")]
    UnknownAlgorithm(String),
}
