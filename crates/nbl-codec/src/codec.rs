//! Document encoding and decoding
//!
//! Serialized form (JSON shown; YAML has the same shape):
//!
//! ```json
//! {
//!   "nbl_version": 1,
//!   "document": {
//!     "digest": "sha1",
//!     "language": "python3",
//!     "executions": [{
//!       "code": { "language": "python3", "fragments": ["import math"] },
//!       "environment": "Python 3.12.1",
//!       "log": [{ "hash": "…", "outputs": { "console": { "data": "", "hash": "…" } } }]
//!     }],
//!     "cells": [
//!       { "type": "documentation", "format": "markdown", "data": "# Title\n" },
//!       { "type": "execution_record", "data": [0, 0] }
//!     ]
//!   }
//! }
//! ```
//!
//! Hashes are written as stored and read back as written; decoding never
//! recomputes them. Run [`nbl_model::verify`] (or use
//! [`NotebookCodec::decode_verified`]) before trusting a decoded document.
//!
//! Unknown cell kinds are rejected with [`DecodeError::UnknownCellKind`].

use crate::config::{CodecConfig, Format};
use crate::error::{DecodeError, EncodeError};
use nbl_model::{Cell, DigestAlgorithm, PresentationLayer, VerificationReport, Verifier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope version written by this codec
pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    nbl_version: u32,
    document: &'a PresentationLayer,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    #[allow(dead_code)]
    nbl_version: u32,
    document: PresentationLayer,
}

/// Encoder/decoder bound to one [`CodecConfig`]
#[derive(Debug, Clone, Default)]
pub struct NotebookCodec {
    config: CodecConfig,
}

impl NotebookCodec {
    /// Create codec with configuration
    #[inline]
    #[must_use]
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode a document to text
    ///
    /// # Errors
    /// Returns error if the serializer fails
    pub fn encode(&self, doc: &PresentationLayer) -> Result<String, EncodeError> {
        let envelope = EnvelopeRef {
            nbl_version: ENVELOPE_VERSION,
            document: doc,
        };
        let text = match self.config.format {
            Format::Json if self.config.pretty => serde_json::to_string_pretty(&envelope)?,
            Format::Json => serde_json::to_string(&envelope)?,
            Format::Yaml => serde_yaml::to_string(&envelope)?,
        };
        tracing::trace!(
            format = %self.config.format,
            bytes = text.len(),
            executions = doc.executions().len(),
            "encoded document"
        );
        Ok(text)
    }

    /// Encode a document to bytes
    ///
    /// # Errors
    /// Returns error if the serializer fails
    pub fn encode_to_vec(&self, doc: &PresentationLayer) -> Result<Vec<u8>, EncodeError> {
        self.encode(doc).map(String::into_bytes)
    }

    /// Decode a document
    ///
    /// # Errors
    /// Any [`DecodeError`]; no partial document is returned
    pub fn decode(&self, input: &[u8]) -> Result<PresentationLayer, DecodeError> {
        let max = self.config.max_document_bytes;
        if input.len() > max {
            return Err(DecodeError::TooLarge {
                size: input.len(),
                max,
            });
        }

        let format = self.config.format;
        tracing::debug!(%format, bytes = input.len(), "decoding document");
        let value: Value = match format {
            Format::Json => serde_json::from_slice(input)
                .map_err(|e| DecodeError::syntax(format, e.to_string()))?,
            Format::Yaml => serde_yaml::from_slice(input)
                .map_err(|e| DecodeError::syntax(format, e.to_string()))?,
        };

        check_envelope(&value)?;
        let envelope: Envelope =
            serde_json::from_value(value).map_err(|e| DecodeError::Schema(e.to_string()))?;
        Ok(envelope.document)
    }

    /// Decode a document from text
    ///
    /// # Errors
    /// As [`Self::decode`]
    #[inline]
    pub fn decode_str(&self, input: &str) -> Result<PresentationLayer, DecodeError> {
        self.decode(input.as_bytes())
    }

    /// Decode, then verify with the document's digest algorithm
    ///
    /// Verification findings are returned alongside the document, not as an
    /// error, so callers can inspect or repair it.
    ///
    /// # Errors
    /// As [`Self::decode`]
    pub fn decode_verified(
        &self,
        input: &[u8],
    ) -> Result<(PresentationLayer, VerificationReport), DecodeError> {
        let doc = self.decode(input)?;
        let report = Verifier::new(doc.digest_algorithm().digester())
            .parallel(self.config.verify_parallel)
            .verify(&doc);
        Ok((doc, report))
    }
}

/// Checks that give precise errors before the typed decode
fn check_envelope(value: &Value) -> Result<(), DecodeError> {
    let root = value
        .as_object()
        .ok_or_else(|| DecodeError::Schema("document root must be a mapping".to_string()))?;

    match root.get("nbl_version") {
        None => {
            return Err(DecodeError::Schema(
                "missing field `nbl_version`".to_string(),
            ))
        }
        Some(v) if v.as_u64() == Some(u64::from(ENVELOPE_VERSION)) => {}
        Some(v) => {
            return Err(DecodeError::UnsupportedVersion {
                found: v.to_string(),
                supported: ENVELOPE_VERSION,
            })
        }
    }

    let document = root
        .get("document")
        .ok_or_else(|| DecodeError::Schema("missing field `document`".to_string()))?;

    if let Some(digest) = document.get("digest") {
        let id = digest
            .as_str()
            .ok_or_else(|| DecodeError::Schema("`digest` must be a string".to_string()))?;
        id.parse::<DigestAlgorithm>()
            .map_err(|_| DecodeError::UnknownDigest(id.to_string()))?;
    }

    let cells = document.get("cells").and_then(Value::as_array);
    for (index, cell) in cells.into_iter().flatten().enumerate() {
        match cell.get("type") {
            None => return Err(DecodeError::MissingCellKind { index }),
            Some(Value::String(kind)) if Cell::KINDS.contains(&kind.as_str()) => {}
            Some(Value::String(kind)) => {
                return Err(DecodeError::UnknownCellKind {
                    index,
                    kind: kind.clone(),
                })
            }
            Some(other) => {
                return Err(DecodeError::UnknownCellKind {
                    index,
                    kind: other.to_string(),
                })
            }
        }
    }

    Ok(())
}

/// Encode with a configuration
///
/// # Errors
/// Returns error if the serializer fails
pub fn encode(doc: &PresentationLayer, config: &CodecConfig) -> Result<String, EncodeError> {
    NotebookCodec::new(config.clone()).encode(doc)
}

/// Decode with a configuration
///
/// # Errors
/// Any [`DecodeError`]
pub fn decode(input: &[u8], config: &CodecConfig) -> Result<PresentationLayer, DecodeError> {
    NotebookCodec::new(config.clone()).decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> NotebookCodec {
        NotebookCodec::new(CodecConfig::new().with_pretty(false))
    }

    fn minimal(cells: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "nbl_version": 1,
            "document": {
                "digest": "sha1",
                "language": "python3",
                "executions": [],
                "cells": cells,
            }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_minimal_document() {
        let doc = codec()
            .decode(&minimal(json!([{"type": "documentation", "format": "markdown", "data": "hi"}])))
            .unwrap();
        assert_eq!(doc.language(), "python3");
        assert_eq!(doc.cells(), &[Cell::documentation("markdown", "hi")]);
    }

    #[test]
    fn rejects_unknown_cell_kind() {
        let err = codec()
            .decode(&minimal(json!([
                {"type": "documentation", "format": "markdown", "data": "hi"},
                {"type": "widget", "data": {}}
            ])))
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnknownCellKind { index: 1, ref kind } if kind == "widget"
        ));
    }

    #[test]
    fn rejects_missing_cell_kind() {
        let err = codec()
            .decode(&minimal(json!([{"format": "markdown", "data": "hi"}])))
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingCellKind { index: 0 }));
    }

    #[test]
    fn rejects_non_string_cell_kind() {
        let err = codec().decode(&minimal(json!([{"type": 7}]))).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownCellKind { index: 0, ref kind } if kind == "7"));
    }

    #[test]
    fn rejects_unsupported_version() {
        let input = br#"{"nbl_version": 2, "document": {}}"#;
        let err = codec().decode(input).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnsupportedVersion { ref found, supported: 1 } if found == "2"
        ));
    }

    #[test]
    fn rejects_unknown_digest() {
        let input = br#"{"nbl_version": 1, "document": {"digest": "md5", "language": "python3", "executions": [], "cells": []}}"#;
        let err = codec().decode(input).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownDigest(ref id) if id == "md5"));
    }

    #[test]
    fn rejects_missing_digest_as_schema_error() {
        let input = br#"{"nbl_version": 1, "document": {"language": "python3", "executions": [], "cells": []}}"#;
        let err = codec().decode(input).unwrap_err();
        assert!(matches!(err, DecodeError::Schema(ref msg) if msg.contains("digest")));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = codec().decode(b"{\"nbl_version\": 1,").unwrap_err();
        assert!(matches!(err, DecodeError::Syntax { format: Format::Json, .. }));
    }

    #[test]
    fn rejects_non_mapping_root() {
        let err = codec().decode(b"[1, 2]").unwrap_err();
        assert!(matches!(err, DecodeError::Schema(_)));
    }

    #[test]
    fn rejects_bad_hash_text() {
        let input = serde_json::to_vec(&json!({
            "nbl_version": 1,
            "document": {
                "digest": "sha1",
                "language": "python3",
                "executions": [{
                    "code": {"language": "python3", "fragments": ["1"]},
                    "environment": "env",
                    "log": [{"hash": "not-hex", "outputs": {}}]
                }],
                "cells": []
            }
        }))
        .unwrap();
        let err = codec().decode(&input).unwrap_err();
        assert!(matches!(err, DecodeError::Schema(_)));
    }

    #[test]
    fn enforces_size_limit() {
        let codec = NotebookCodec::new(CodecConfig::new().with_max_document_bytes(8));
        let err = codec.decode(&minimal(json!([]))).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { max: 8, .. }));
    }

    #[test]
    fn compact_and_pretty_json_differ_only_in_layout() {
        let doc = codec().decode(&minimal(json!([]))).unwrap();
        let compact = codec().encode(&doc).unwrap();
        let pretty = NotebookCodec::default().encode(&doc).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        let a: Value = serde_json::from_str(&compact).unwrap();
        let b: Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
    }
}
