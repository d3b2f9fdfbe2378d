//! Error types for the codec
//!
//! - Decode: text → document; no partial document is ever returned
//! - Encode: document → text
//! - Config: loading [`crate::CodecConfig`]

use crate::config::Format;
use std::path::PathBuf;

/// Errors while decoding a document
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Input exceeds the configured size limit
    #[error("document too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    /// Input is not well-formed JSON / YAML
    #[error("{format} syntax error: {message}")]
    Syntax { format: Format, message: String },

    /// Envelope version not understood by this decoder
    #[error("unsupported document version: {found} (supported: {supported})")]
    UnsupportedVersion { found: String, supported: u32 },

    /// Digest identifier not recognised
    #[error("unknown digest algorithm: '{0}'")]
    UnknownDigest(String),

    /// Cell with a `type` outside the known set
    #[error("cell {index}: unknown cell kind '{kind}'")]
    UnknownCellKind { index: usize, kind: String },

    /// Cell without a `type`
    #[error("cell {index}: missing cell kind")]
    MissingCellKind { index: usize },

    /// Well-formed input that does not match the document schema
    #[error("schema error: {0}")]
    Schema(String),
}

impl DecodeError {
    /// Create syntax error for a format
    pub fn syntax(format: Format, message: impl Into<String>) -> Self {
        Self::Syntax {
            format,
            message: message.into(),
        }
    }
}

/// Errors while encoding a document
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// JSON serializer failed
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serializer failed
    #[error("yaml encode error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML or unknown keys
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Well-formed but unusable value
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Combined codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
