//! Presentation layer: the document a reader sees
//!
//! Cells interleave documentation with references into the execution
//! history. The history is append-only: a re-run produces a new
//! [`ExecutionLayer`] pushed onto the document, earlier runs stay untouched.

use crate::digest::DigestAlgorithm;
use crate::error::BuildError;
use crate::execution::{ExecutionLayer, LogEntry};
use crate::verify::Verifier;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Reference to one log entry: `(execution index, log index)`
///
/// Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordRef(pub usize, pub usize);

impl RecordRef {
    /// Index into the document's executions
    #[inline]
    #[must_use]
    pub const fn execution(self) -> usize {
        self.0
    }

    /// Index into that execution's log
    #[inline]
    #[must_use]
    pub const fn entry(self) -> usize {
        self.1
    }
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// A presentation cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cell {
    /// Formatted prose
    Documentation {
        /// Markup name, e.g. `markdown`
        format: String,
        /// Markup text
        data: String,
    },
    /// Reference to a logged execution result
    ExecutionRecord {
        /// Target log entry
        data: RecordRef,
    },
}

impl Cell {
    /// Cell kind identifier as written in serialized documents
    pub const KINDS: [&'static str; 2] = ["documentation", "execution_record"];

    /// Documentation cell
    #[inline]
    #[must_use]
    pub fn documentation(format: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Documentation {
            format: format.into(),
            data: data.into(),
        }
    }

    /// Execution-record cell
    #[inline]
    #[must_use]
    pub const fn record(execution: usize, entry: usize) -> Self {
        Self::ExecutionRecord {
            data: RecordRef(execution, entry),
        }
    }

    /// Kind identifier of this cell
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Documentation { .. } => Self::KINDS[0],
            Self::ExecutionRecord { .. } => Self::KINDS[1],
        }
    }

    /// Target of an execution-record cell
    #[inline]
    #[must_use]
    pub const fn reference(&self) -> Option<RecordRef> {
        match self {
            Self::ExecutionRecord { data } => Some(*data),
            Self::Documentation { .. } => None,
        }
    }
}

/// Complete notebook document
///
/// # Invariants
/// For documents produced by [`PresentationBuilder`]:
/// - every execution's source language equals `language`
/// - every execution was hashed with `digest`
/// - every execution-record cell resolves
///
/// Decoded documents carry no such guarantee until verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationLayer {
    digest: DigestAlgorithm,
    language: String,
    executions: Vec<ExecutionLayer>,
    cells: Vec<Cell>,
}

impl PresentationLayer {
    /// Start building a document
    #[inline]
    #[must_use]
    pub fn builder(language: impl Into<String>) -> PresentationBuilder {
        PresentationBuilder::new(language)
    }

    /// Digest algorithm used for every hash in the document
    #[inline]
    #[must_use]
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest
    }

    /// Language identifier
    #[inline]
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Execution history, oldest first
    #[inline]
    #[must_use]
    pub fn executions(&self) -> &[ExecutionLayer] {
        &self.executions
    }

    /// Execution at `index`
    #[inline]
    #[must_use]
    pub fn execution(&self, index: usize) -> Option<&ExecutionLayer> {
        self.executions.get(index)
    }

    /// Cells in display order
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Append a new run, returning the extended document
    ///
    /// # Errors
    /// Same checks as [`PresentationBuilder::execution`]
    pub fn with_execution(mut self, layer: ExecutionLayer) -> Result<Self, BuildError> {
        check_execution(self.digest, &self.language, self.executions.len(), &layer)?;
        self.executions.push(layer);
        Ok(self)
    }

    /// Resolve a record reference
    #[must_use]
    pub fn resolve(&self, reference: RecordRef) -> Option<ResolvedRecord<'_>> {
        let execution = self.executions.get(reference.execution())?;
        let entry = execution.entry(reference.entry())?;
        Some(ResolvedRecord {
            reference,
            source: execution.source().fragment(reference.entry()),
            environment: execution.environment(),
            entry,
        })
    }

    /// Cells with record references resolved, in display order
    pub fn iter_resolved(&self) -> impl Iterator<Item = ResolvedCell<'_>> + '_ {
        self.cells.iter().map(move |cell| match cell {
            Cell::Documentation { format, data } => ResolvedCell::Documentation { format, data },
            Cell::ExecutionRecord { data } => match self.resolve(*data) {
                Some(record) => ResolvedCell::Record(record),
                None => ResolvedCell::Dangling(*data),
            },
        })
    }

    #[cfg(test)]
    pub(crate) fn executions_mut(&mut self) -> &mut Vec<ExecutionLayer> {
        &mut self.executions
    }

    #[cfg(test)]
    pub(crate) fn cells_mut(&mut self) -> &mut Vec<Cell> {
        &mut self.cells
    }
}

/// A log entry looked up through a [`RecordRef`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRecord<'a> {
    /// Reference that was resolved
    pub reference: RecordRef,
    /// Fragment text; `None` if the log is longer than the source
    pub source: Option<&'a str>,
    /// Environment banner of the run
    pub environment: &'a str,
    /// The log entry
    pub entry: &'a LogEntry,
}

/// A cell ready for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedCell<'a> {
    /// Prose cell
    Documentation { format: &'a str, data: &'a str },
    /// Record cell with its target
    Record(ResolvedRecord<'a>),
    /// Record cell whose target does not exist
    Dangling(RecordRef),
}

fn check_execution(
    digest: DigestAlgorithm,
    language: &str,
    index: usize,
    layer: &ExecutionLayer,
) -> Result<(), BuildError> {
    let source = layer.source();
    if source.language() != language {
        return Err(BuildError::LanguageMismatch {
            expected: language.to_string(),
            actual: source.language().to_string(),
        });
    }
    if source.len() != layer.log().len() {
        return Err(BuildError::StructuralMismatch {
            fragments: source.len(),
            entries: layer.log().len(),
        });
    }

    // Every stored hash is recomputed, outputs included
    let findings = Verifier::new(digest.digester()).verify_execution(index, layer, language);
    if !findings.is_empty() {
        return Err(BuildError::DigestMismatch {
            execution: index,
            algorithm: digest,
        });
    }
    Ok(())
}

/// Builder for [`PresentationLayer`]
///
/// Construction fails fast: every check runs before a document exists.
#[derive(Debug, Clone)]
pub struct PresentationBuilder {
    digest: DigestAlgorithm,
    language: String,
    executions: Vec<ExecutionLayer>,
    cells: Vec<Cell>,
}

impl PresentationBuilder {
    /// New builder using the default digest algorithm
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            digest: DigestAlgorithm::default(),
            language: language.into(),
            executions: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Set the digest algorithm
    ///
    /// Layers already added are checked again against it by [`Self::build`].
    #[inline]
    #[must_use]
    pub fn digest(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest = algorithm;
        self
    }

    /// Append an execution layer
    ///
    /// # Errors
    /// - [`BuildError::EmptyLanguage`] if the document language is blank
    /// - [`BuildError::LanguageMismatch`] if the layer's source language differs
    /// - [`BuildError::StructuralMismatch`] if the log length differs from the fragment count
    /// - [`BuildError::DigestMismatch`] if any fragment or output hash differs
    ///   from the document algorithm's digest
    pub fn execution(mut self, layer: ExecutionLayer) -> Result<Self, BuildError> {
        if self.language.trim().is_empty() {
            return Err(BuildError::EmptyLanguage);
        }
        check_execution(self.digest, &self.language, self.executions.len(), &layer)?;
        self.executions.push(layer);
        Ok(self)
    }

    /// Append a documentation cell
    #[inline]
    #[must_use]
    pub fn documentation(mut self, format: impl Into<String>, data: impl Into<String>) -> Self {
        self.cells.push(Cell::documentation(format, data));
        self
    }

    /// Append an execution-record cell
    #[inline]
    #[must_use]
    pub fn record(mut self, execution: usize, entry: usize) -> Self {
        self.cells.push(Cell::record(execution, entry));
        self
    }

    /// Finish the document
    ///
    /// # Errors
    /// - [`BuildError::EmptyLanguage`] if the language is blank
    /// - [`BuildError::DigestMismatch`] if an execution added before the last
    ///   [`Self::digest`] call was hashed with another algorithm
    /// - [`BuildError::DanglingReference`] for the first unresolvable record cell
    pub fn build(self) -> Result<PresentationLayer, BuildError> {
        if self.language.trim().is_empty() {
            return Err(BuildError::EmptyLanguage);
        }
        for (index, layer) in self.executions.iter().enumerate() {
            check_execution(self.digest, &self.language, index, layer)?;
        }
        for (cell, reference) in self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.reference().map(|r| (i, r)))
        {
            let resolves = self
                .executions
                .get(reference.execution())
                .is_some_and(|e| reference.entry() < e.log().len());
            if !resolves {
                return Err(BuildError::DanglingReference { cell, reference });
            }
        }
        Ok(PresentationLayer {
            digest: self.digest,
            language: self.language,
            executions: self.executions,
            cells: self.cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{FragmentCapture, CONSOLE};
    use crate::source::SourceLayer;
    use std::sync::Arc;

    fn run(language: &str, algorithm: DigestAlgorithm) -> ExecutionLayer {
        let source = Arc::new(SourceLayer::new(language, ["x = 1", "x"]).unwrap());
        ExecutionLayer::capture(
            algorithm.digester(),
            source,
            "env",
            [FragmentCapture::new(), FragmentCapture::console("1")],
        )
        .unwrap()
    }

    #[test]
    fn builder_assembles_document() {
        let doc = PresentationLayer::builder("python3")
            .execution(run("python3", DigestAlgorithm::Sha1))
            .unwrap()
            .documentation("markdown", "# Title\n")
            .record(0, 0)
            .record(0, 1)
            .build()
            .unwrap();

        assert_eq!(doc.language(), "python3");
        assert_eq!(doc.digest_algorithm(), DigestAlgorithm::Sha1);
        assert_eq!(doc.executions().len(), 1);
        assert_eq!(doc.cells().len(), 3);
        assert_eq!(doc.cells()[0].kind(), "documentation");
        assert_eq!(doc.cells()[2].reference(), Some(RecordRef(0, 1)));
    }

    #[test]
    fn builder_rejects_dangling_reference() {
        let err = PresentationLayer::builder("python3")
            .execution(run("python3", DigestAlgorithm::Sha1))
            .unwrap()
            .record(0, 2)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DanglingReference {
                cell: 0,
                reference: RecordRef(0, 2)
            }
        );

        let err = PresentationLayer::builder("python3")
            .documentation("markdown", "no runs yet")
            .record(0, 0)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::DanglingReference { cell: 1, .. }));
    }

    #[test]
    fn builder_rejects_language_mismatch() {
        let err = PresentationLayer::builder("python3")
            .execution(run("julia", DigestAlgorithm::Sha1))
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::LanguageMismatch {
                expected: "python3".into(),
                actual: "julia".into()
            }
        );
    }

    #[test]
    fn builder_rejects_foreign_digest() {
        let err = PresentationLayer::builder("python3")
            .digest(DigestAlgorithm::Sha256)
            .execution(run("python3", DigestAlgorithm::Sha1))
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DigestMismatch {
                execution: 0,
                algorithm: DigestAlgorithm::Sha256
            }
        );
    }

    fn decoded(layer: &ExecutionLayer, edit: impl FnOnce(&mut serde_json::Value)) -> ExecutionLayer {
        let mut value = serde_json::to_value(layer).unwrap();
        edit(&mut value);
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builder_rejects_decoded_layer_with_short_log() {
        let layer = decoded(&run("python3", DigestAlgorithm::Sha1), |v| {
            v["log"].as_array_mut().unwrap().pop();
        });
        let err = PresentationLayer::builder("python3")
            .execution(layer)
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::StructuralMismatch {
                fragments: 2,
                entries: 1
            }
        );
    }

    #[test]
    fn builder_rejects_decoded_layer_with_edited_output() {
        let layer = decoded(&run("python3", DigestAlgorithm::Sha1), |v| {
            v["log"][1]["outputs"][CONSOLE]["data"] = serde_json::json!("tampered");
        });
        let err = PresentationLayer::builder("python3")
            .execution(layer.clone())
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DigestMismatch {
                execution: 0,
                algorithm: DigestAlgorithm::Sha1
            }
        );

        let doc = PresentationLayer::builder("python3")
            .execution(run("python3", DigestAlgorithm::Sha1))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            doc.with_execution(layer).unwrap_err(),
            BuildError::DigestMismatch {
                execution: 1,
                algorithm: DigestAlgorithm::Sha1
            }
        );
    }

    #[test]
    fn build_rechecks_layers_after_digest_change() {
        let err = PresentationLayer::builder("python3")
            .execution(run("python3", DigestAlgorithm::Sha1))
            .unwrap()
            .digest(DigestAlgorithm::Sha256)
            .record(0, 0)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DigestMismatch {
                execution: 0,
                algorithm: DigestAlgorithm::Sha256
            }
        );

        let doc = PresentationLayer::builder("python3")
            .digest(DigestAlgorithm::Sha1)
            .execution(run("python3", DigestAlgorithm::Sha256))
            .and_then(|b| b.digest(DigestAlgorithm::Sha256).record(0, 1).build());
        assert!(matches!(doc, Err(BuildError::DigestMismatch { .. })));
    }

    #[test]
    fn builder_rejects_blank_language() {
        assert_eq!(
            PresentationLayer::builder(" ").build().unwrap_err(),
            BuildError::EmptyLanguage
        );
    }

    #[test]
    fn with_execution_appends_without_touching_history() {
        let doc = PresentationLayer::builder("python3")
            .execution(run("python3", DigestAlgorithm::Sha1))
            .unwrap()
            .record(0, 1)
            .build()
            .unwrap();
        let first = doc.executions()[0].clone();

        let rerun = doc.with_execution(run("python3", DigestAlgorithm::Sha1)).unwrap();
        assert_eq!(rerun.executions().len(), 2);
        assert_eq!(rerun.executions()[0], first);
        assert_eq!(rerun.cells().len(), 1);
    }

    #[test]
    fn resolve_and_iterate() {
        let mut doc = PresentationLayer::builder("python3")
            .execution(run("python3", DigestAlgorithm::Sha1))
            .unwrap()
            .documentation("markdown", "intro")
            .record(0, 1)
            .build()
            .unwrap();

        let record = doc.resolve(RecordRef(0, 1)).unwrap();
        assert_eq!(record.source, Some("x"));
        assert_eq!(record.environment, "env");
        assert_eq!(record.entry.output(CONSOLE).unwrap().data(), "1");
        assert!(doc.resolve(RecordRef(1, 0)).is_none());

        doc.cells_mut().push(Cell::record(4, 0));
        let resolved: Vec<_> = doc.iter_resolved().collect();
        assert!(matches!(
            resolved[0],
            ResolvedCell::Documentation { format: "markdown", data: "intro" }
        ));
        assert!(matches!(resolved[1], ResolvedCell::Record(r) if r.reference == RecordRef(0, 1)));
        assert_eq!(resolved[2], ResolvedCell::Dangling(RecordRef(4, 0)));
    }

    #[test]
    fn cell_serializes_with_type_tag() {
        let doc = serde_json::to_value(Cell::documentation("markdown", "hi")).unwrap();
        assert_eq!(
            doc,
            serde_json::json!({"type": "documentation", "format": "markdown", "data": "hi"})
        );
        let rec = serde_json::to_value(Cell::record(0, 1)).unwrap();
        assert_eq!(
            rec,
            serde_json::json!({"type": "execution_record", "data": [0, 1]})
        );
    }
}
