//! Integrity verification
//!
//! A diagnostic pass over a whole document: every stored hash is recomputed
//! and every record reference is resolved. Nothing stops at the first
//! finding; the caller gets the full list and decides what is fatal.
//!
//! # Check order
//!
//! 1. Executions in ascending order: language, log length, then per entry
//!    the fragment hash followed by each output hash in channel order.
//! 2. Cells in ascending order: record references.
//!
//! The order is the same whether executions are checked in parallel or not.

use crate::digest::Digester;
use crate::error::IntegrityError;
use crate::execution::ExecutionLayer;
use crate::hash::ContentHash;
use crate::presentation::{PresentationLayer, RecordRef};
use rayon::prelude::*;
use std::fmt::{self, Display, Formatter};

/// Category of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Stored hash differs from the recomputed one
    HashMismatch,
    /// Record reference does not resolve
    DanglingReference,
    /// Log length differs from fragment count
    StructuralMismatch,
    /// Execution source language differs from the document language
    LanguageMismatch,
}

impl Display for ViolationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HashMismatch => "hash mismatch",
            Self::DanglingReference => "dangling reference",
            Self::StructuralMismatch => "structural mismatch",
            Self::LanguageMismatch => "language mismatch",
        })
    }
}

/// Where a finding was made
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A whole execution layer
    Execution { execution: usize },
    /// The fragment hash of a log entry
    Fragment { execution: usize, entry: usize },
    /// One output channel of a log entry
    Output {
        execution: usize,
        entry: usize,
        channel: String,
    },
    /// An execution-record cell
    Cell { cell: usize, reference: RecordRef },
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution { execution } => write!(f, "execution {execution}"),
            Self::Fragment { execution, entry } => {
                write!(f, "execution {execution}, entry {entry}")
            }
            Self::Output {
                execution,
                entry,
                channel,
            } => write!(f, "execution {execution}, entry {entry}, channel '{channel}'"),
            Self::Cell { cell, reference } => write!(f, "cell {cell} -> {reference}"),
        }
    }
}

/// What was observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// `expected` is recomputed from the text, `actual` is stored
    Hash {
        expected: ContentHash,
        actual: ContentHash,
    },
    /// Fragment count vs log length
    Length { fragments: usize, entries: usize },
    /// Document language vs execution source language
    Language { expected: String, actual: String },
    /// Executions in the document, and log length of the target if it exists
    Reference {
        executions: usize,
        entries: Option<usize>,
    },
}

impl Display for Evidence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash { expected, actual } => {
                write!(f, "expected {expected}, stored {actual}")
            }
            Self::Length { fragments, entries } => {
                write!(f, "{fragments} fragment(s), {entries} log entr(ies)")
            }
            Self::Language { expected, actual } => {
                write!(f, "expected '{expected}', found '{actual}'")
            }
            Self::Reference {
                executions,
                entries: None,
            } => write!(f, "document has {executions} execution(s)"),
            Self::Reference {
                entries: Some(entries),
                ..
            } => write!(f, "target log has {entries} entr(ies)"),
        }
    }
}

/// A single verification finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityViolation {
    /// Category
    pub kind: ViolationKind,
    /// Offending layer / index / channel
    pub location: Location,
    /// Observed values
    pub evidence: Evidence,
}

impl Display for IntegrityViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.location, self.evidence)
    }
}

/// Every finding of one verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    violations: Vec<IntegrityViolation>,
}

impl VerificationReport {
    /// True when nothing was found
    #[inline]
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    /// Findings in check order
    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[IntegrityViolation] {
        &self.violations
    }

    /// Number of findings
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Same as [`Self::is_consistent`]
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Findings of one kind
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &IntegrityViolation> + '_ {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// Number of findings of one kind
    #[must_use]
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Take the findings
    #[inline]
    #[must_use]
    pub fn into_violations(self) -> Vec<IntegrityViolation> {
        self.violations
    }

    /// `Ok` when consistent
    ///
    /// # Errors
    /// Returns the report wrapped in [`IntegrityError`] otherwise
    pub fn into_result(self) -> Result<(), IntegrityError> {
        if self.is_consistent() {
            Ok(())
        } else {
            Err(IntegrityError(self))
        }
    }
}

impl Display for VerificationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return f.write_str("document is consistent");
        }
        writeln!(f, "{} violation(s):", self.violations.len())?;
        for v in &self.violations {
            writeln!(f, "  - {v}")?;
        }
        Ok(())
    }
}

/// Verifier with an injected digest strategy
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'d> {
    digester: &'d dyn Digester,
    parallel: bool,
}

impl<'d> Verifier<'d> {
    /// Verifier hashing with `digester`
    #[inline]
    #[must_use]
    pub fn new(digester: &'d dyn Digester) -> Self {
        Self {
            digester,
            parallel: false,
        }
    }

    /// Check execution layers concurrently
    #[inline]
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Verify a whole document
    #[must_use]
    pub fn verify(&self, doc: &PresentationLayer) -> VerificationReport {
        if self.digester.algorithm() != doc.digest_algorithm() {
            tracing::debug!(
                document = %doc.digest_algorithm(),
                verifier = %self.digester.algorithm(),
                "verifying with a digest other than the document's"
            );
        }

        let per_execution: Vec<Vec<IntegrityViolation>> = if self.parallel {
            doc.executions()
                .par_iter()
                .enumerate()
                .map(|(i, layer)| self.verify_execution(i, layer, doc.language()))
                .collect()
        } else {
            doc.executions()
                .iter()
                .enumerate()
                .map(|(i, layer)| self.verify_execution(i, layer, doc.language()))
                .collect()
        };

        let mut violations: Vec<_> = per_execution.into_iter().flatten().collect();
        violations.extend(check_references(doc));

        for v in &violations {
            tracing::warn!(kind = %v.kind, location = %v.location, "{}", v.evidence);
        }
        tracing::debug!(
            executions = doc.executions().len(),
            cells = doc.cells().len(),
            violations = violations.len(),
            "verification finished"
        );

        VerificationReport { violations }
    }

    /// Verify one execution layer; `language` is the document language
    #[must_use]
    pub fn verify_execution(
        &self,
        execution: usize,
        layer: &ExecutionLayer,
        language: &str,
    ) -> Vec<IntegrityViolation> {
        let mut out = Vec::new();
        let source = layer.source();

        if source.language() != language {
            out.push(IntegrityViolation {
                kind: ViolationKind::LanguageMismatch,
                location: Location::Execution { execution },
                evidence: Evidence::Language {
                    expected: language.to_string(),
                    actual: source.language().to_string(),
                },
            });
        }

        if source.len() != layer.log().len() {
            out.push(IntegrityViolation {
                kind: ViolationKind::StructuralMismatch,
                location: Location::Execution { execution },
                evidence: Evidence::Length {
                    fragments: source.len(),
                    entries: layer.log().len(),
                },
            });
        }

        for (entry_index, (fragment, entry)) in
            source.fragments().iter().zip(layer.log()).enumerate()
        {
            let expected = self.digester.digest_str(fragment);
            if expected != *entry.hash() {
                out.push(IntegrityViolation {
                    kind: ViolationKind::HashMismatch,
                    location: Location::Fragment {
                        execution,
                        entry: entry_index,
                    },
                    evidence: Evidence::Hash {
                        expected,
                        actual: *entry.hash(),
                    },
                });
            }

            for (channel, record) in entry.outputs() {
                let expected = self.digester.digest_str(record.data());
                if expected != *record.hash() {
                    out.push(IntegrityViolation {
                        kind: ViolationKind::HashMismatch,
                        location: Location::Output {
                            execution,
                            entry: entry_index,
                            channel: channel.clone(),
                        },
                        evidence: Evidence::Hash {
                            expected,
                            actual: *record.hash(),
                        },
                    });
                }
            }
        }

        out
    }
}

fn check_references(doc: &PresentationLayer) -> Vec<IntegrityViolation> {
    let executions = doc.executions();
    doc.cells()
        .iter()
        .enumerate()
        .filter_map(|(cell, c)| c.reference().map(|r| (cell, r)))
        .filter_map(|(cell, reference)| {
            let entries = executions.get(reference.execution()).map(|e| e.log().len());
            let resolves = entries.is_some_and(|n| reference.entry() < n);
            (!resolves).then(|| IntegrityViolation {
                kind: ViolationKind::DanglingReference,
                location: Location::Cell { cell, reference },
                evidence: Evidence::Reference {
                    executions: executions.len(),
                    entries,
                },
            })
        })
        .collect()
}

/// Verify a document with the digest algorithm it declares
#[must_use]
pub fn verify(doc: &PresentationLayer) -> VerificationReport {
    Verifier::new(doc.digest_algorithm().digester()).verify(doc)
}
