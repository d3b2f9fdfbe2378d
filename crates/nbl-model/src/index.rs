//! Content-addressed lookup over execution history
//!
//! Answers "has this exact fragment already run, and what did it print?" by
//! fragment hash, so an execution engine can reuse a prior result instead of
//! re-running identical code.

use crate::digest::Digester;
use crate::execution::LogEntry;
use crate::hash::ContentHash;
use crate::presentation::{PresentationLayer, RecordRef};
use indexmap::IndexMap;

/// Fragment hash → every log entry recorded for it, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayIndex {
    by_fragment: IndexMap<ContentHash, Vec<RecordRef>>,
}

impl ReplayIndex {
    /// Index the stored hashes of every log entry in `doc`
    ///
    /// Hashes are taken as stored; verify untrusted documents first.
    #[must_use]
    pub fn build(doc: &PresentationLayer) -> Self {
        let mut by_fragment: IndexMap<ContentHash, Vec<RecordRef>> = IndexMap::new();
        for (execution, layer) in doc.executions().iter().enumerate() {
            for (entry, log_entry) in layer.log().iter().enumerate() {
                by_fragment
                    .entry(*log_entry.hash())
                    .or_default()
                    .push(RecordRef(execution, entry));
            }
        }
        Self { by_fragment }
    }

    /// All records of a fragment hash
    #[must_use]
    pub fn lookup(&self, hash: &ContentHash) -> &[RecordRef] {
        self.by_fragment
            .get(hash)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Most recent record of a fragment hash
    #[must_use]
    pub fn latest(&self, hash: &ContentHash) -> Option<RecordRef> {
        self.lookup(hash).last().copied()
    }

    /// Records of a fragment given as text
    #[must_use]
    pub fn lookup_source(&self, digester: &dyn Digester, text: &str) -> &[RecordRef] {
        self.lookup(&digester.digest_str(text))
    }

    /// Most recent log entry for `text`, resolved against `doc`
    #[must_use]
    pub fn cached_entry<'a>(
        &self,
        doc: &'a PresentationLayer,
        digester: &dyn Digester,
        text: &str,
    ) -> Option<&'a LogEntry> {
        let reference = self.latest(&digester.digest_str(text))?;
        doc.resolve(reference).map(|r| r.entry)
    }

    /// True if the hash was ever executed
    #[inline]
    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.by_fragment.contains_key(hash)
    }

    /// Number of distinct fragment hashes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_fragment.len()
    }

    /// True for a document without log entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_fragment.is_empty()
    }
}
