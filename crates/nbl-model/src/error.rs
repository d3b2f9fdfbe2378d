//! Error types for document construction
//!
//! Construction fails fast: a [`BuildError`] means no layer was produced.
//! Verification findings on already-built documents are values, see
//! [`crate::verify`].

use crate::digest::DigestAlgorithm;
use crate::presentation::RecordRef;
use crate::verify::VerificationReport;

/// Errors raised while assembling layers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Language identifier is empty or whitespace
    #[error("language identifier must not be empty")]
    EmptyLanguage,

    /// Log length differs from fragment count
    #[error("structural mismatch: {fragments} fragment(s) but {entries} log entr(ies)")]
    StructuralMismatch { fragments: usize, entries: usize },

    /// A capture names the same output channel twice
    #[error("duplicate output channel '{channel}' for fragment {fragment}")]
    DuplicateChannel { fragment: usize, channel: String },

    /// Every fragment already has a log entry
    #[error("all {fragments} fragment(s) already recorded")]
    TooManyEntries { fragments: usize },

    /// Execution layer language differs from the presentation language
    #[error("language mismatch: document is '{expected}', execution source is '{actual}'")]
    LanguageMismatch { expected: String, actual: String },

    /// Execution layer hashes do not match the document algorithm over its content
    #[error("execution {execution} holds hashes that are not {algorithm} digests of its content")]
    DigestMismatch {
        execution: usize,
        algorithm: DigestAlgorithm,
    },

    /// Execution-record cell points outside the execution history
    #[error("cell {cell} references missing record {reference}")]
    DanglingReference { cell: usize, reference: RecordRef },
}

/// A document that failed verification, for callers that want `?`
#[derive(Debug, Clone, thiserror::Error)]
#[error("document failed verification with {} violation(s)", .0.len())]
pub struct IntegrityError(pub VerificationReport);

impl IntegrityError {
    /// The underlying report
    #[inline]
    #[must_use]
    pub fn report(&self) -> &VerificationReport {
        &self.0
    }
}
