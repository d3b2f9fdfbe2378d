//! Digest strategies
//!
//! A [`Digester`] is the capability every hash-producing operation takes, so
//! the algorithm can be swapped without touching the schema. The identifier
//! of the algorithm travels with each document as a [`DigestAlgorithm`].

use crate::hash::{ContentHash, HashError};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// Identifier of a supported digest algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1, 160-bit
    #[default]
    Sha1,
    /// SHA-256
    Sha256,
    /// Blake3, 256-bit output
    Blake3,
}

impl DigestAlgorithm {
    /// Every supported algorithm
    pub const ALL: [Self; 3] = [Self::Sha1, Self::Sha256, Self::Blake3];

    /// Stable identifier written into serialized documents
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Digest length in bytes
    #[inline]
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }

    /// Static digester for this algorithm
    #[inline]
    #[must_use]
    pub fn digester(self) -> &'static dyn Digester {
        match self {
            Self::Sha1 => &Sha1Digester,
            Self::Sha256 => &Sha256Digester,
            Self::Blake3 => &Blake3Digester,
        }
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| HashError::UnknownAlgorithm(s.to_string()))
    }
}

/// Deterministic content digest over bytes
///
/// # Contract
/// - Same input → same output, for every input including the empty one
/// - Output length equals `self.algorithm().output_len()`
pub trait Digester: Send + Sync + Debug {
    /// Algorithm this digester implements
    fn algorithm(&self) -> DigestAlgorithm;

    /// Digest raw bytes
    fn digest(&self, data: &[u8]) -> ContentHash;

    /// Digest the UTF-8 encoding of `text`
    fn digest_str(&self, text: &str) -> ContentHash {
        self.digest(text.as_bytes())
    }
}

/// SHA-1 digester
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Digester;

impl Digester for Sha1Digester {
    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sha1
    }

    fn digest(&self, data: &[u8]) -> ContentHash {
        use sha1::Digest;
        ContentHash::from_digest_output(&sha1::Sha1::digest(data))
    }
}

/// SHA-256 digester
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digester;

impl Digester for Sha256Digester {
    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sha256
    }

    fn digest(&self, data: &[u8]) -> ContentHash {
        use sha2::Digest;
        ContentHash::from_digest_output(&sha2::Sha256::digest(data))
    }
}

/// Blake3 digester
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Digester;

impl Digester for Blake3Digester {
    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Blake3
    }

    fn digest(&self, data: &[u8]) -> ContentHash {
        ContentHash::from_digest_output(blake3::hash(data).as_bytes())
    }
}
