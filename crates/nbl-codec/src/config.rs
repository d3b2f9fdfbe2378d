//! Codec configuration
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! format = "yaml"
//! pretty = false
//! max_document_bytes = 1048576
//! verify_parallel = true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Text format of serialized documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl Format {
    /// Format for a file extension (`json`, `yaml`, `yml`)
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Format for a path, by extension
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        })
    }
}

/// Codec settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Output format, and input format for `decode`
    pub format: Format,
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Largest input accepted by `decode`
    pub max_document_bytes: usize,
    /// Verify execution layers concurrently in `decode_verified`
    pub verify_parallel: bool,
}

impl CodecConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With format
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// With pretty printing
    #[inline]
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// With input size limit
    #[inline]
    #[must_use]
    pub fn with_max_document_bytes(mut self, max: usize) -> Self {
        self.max_document_bytes = max;
        self
    }

    /// With parallel verification
    #[inline]
    #[must_use]
    pub fn with_verify_parallel(mut self, parallel: bool) -> Self {
        self.verify_parallel = parallel;
        self
    }

    /// Parse TOML configuration
    ///
    /// # Errors
    /// - [`ConfigError::Parse`] for malformed TOML or unknown keys
    /// - [`ConfigError::Invalid`] for a zero size limit
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read TOML configuration from a file
    ///
    /// # Errors
    /// As [`Self::from_toml_str`], plus [`ConfigError::Io`]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_document_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_document_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            format: Format::Json,
            pretty: true,
            max_document_bytes: 64 * 1024 * 1024, // 64MB
            verify_parallel: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = CodecConfig::new();
        assert_eq!(config.format, Format::Json);
        assert!(config.pretty);
        assert_eq!(config.max_document_bytes, 64 * 1024 * 1024);
        assert!(!config.verify_parallel);
    }

    #[test]
    fn builder_methods() {
        let config = CodecConfig::new()
            .with_format(Format::Yaml)
            .with_pretty(false)
            .with_max_document_bytes(10)
            .with_verify_parallel(true);
        assert_eq!(config.format, Format::Yaml);
        assert!(!config.pretty);
        assert_eq!(config.max_document_bytes, 10);
        assert!(config.verify_parallel);
    }

    #[test]
    fn toml_partial_keys_keep_defaults() {
        let config = CodecConfig::from_toml_str("format = \"yaml\"\n").unwrap();
        assert_eq!(config.format, Format::Yaml);
        assert!(config.pretty);
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let err = CodecConfig::from_toml_str("compress = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_rejects_zero_limit() {
        let err = CodecConfig::from_toml_str("max_document_bytes = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pretty = false\nverify_parallel = true").unwrap();
        let config = CodecConfig::from_path(file.path()).unwrap();
        assert!(!config.pretty);
        assert!(config.verify_parallel);
    }

    #[test]
    fn from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CodecConfig::from_path(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_extension("JSON"), Some(Format::Json));
        assert_eq!(Format::from_extension("yml"), Some(Format::Yaml));
        assert_eq!(Format::from_extension("ipynb"), None);
        assert_eq!(Format::from_path("notes/cosine.yaml"), Some(Format::Yaml));
        assert_eq!(Format::from_path("README"), None);
    }
}
