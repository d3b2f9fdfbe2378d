//! Execution layer: per-fragment log of hashed outputs
//!
//! Hashes are always computed here from the text they cover; no public
//! constructor accepts a caller-supplied hash. Documents received from
//! elsewhere enter through deserialization and are checked by
//! [`crate::verify`].

use crate::digest::Digester;
use crate::error::BuildError;
use crate::hash::ContentHash;
use crate::source::SourceLayer;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Conventional name of the console output channel
pub const CONSOLE: &str = "console";

/// Captured output of one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    data: String,
    hash: ContentHash,
}

impl OutputRecord {
    /// Capture `data`, hashing it with `digester`
    #[must_use]
    pub fn capture(digester: &dyn Digester, data: impl Into<String>) -> Self {
        let data = data.into();
        let hash = digester.digest_str(&data);
        Self { data, hash }
    }

    /// Captured text
    #[inline]
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Stored digest of the captured text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    #[cfg(test)]
    pub(crate) fn data_mut(&mut self) -> &mut String {
        &mut self.data
    }
}

/// Log entry for one fragment: its hash and outputs by channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    hash: ContentHash,
    outputs: IndexMap<String, OutputRecord>,
}

impl LogEntry {
    /// Stored digest of the fragment source text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Outputs in capture order
    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &IndexMap<String, OutputRecord> {
        &self.outputs
    }

    /// Output for one channel
    #[inline]
    #[must_use]
    pub fn output(&self, channel: &str) -> Option<&OutputRecord> {
        self.outputs.get(channel)
    }

    #[cfg(test)]
    pub(crate) fn set_hash(&mut self, hash: ContentHash) {
        self.hash = hash;
    }

    #[cfg(test)]
    pub(crate) fn outputs_mut(&mut self) -> &mut IndexMap<String, OutputRecord> {
        &mut self.outputs
    }
}

/// Raw outputs of one fragment run, as `(channel, data)` pairs in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentCapture {
    outputs: Vec<(String, String)>,
}

impl FragmentCapture {
    /// Capture with no outputs
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture with a single console output
    #[inline]
    #[must_use]
    pub fn console(data: impl Into<String>) -> Self {
        Self::new().channel(CONSOLE, data)
    }

    /// Add an output channel
    #[inline]
    #[must_use]
    pub fn channel(mut self, name: impl Into<String>, data: impl Into<String>) -> Self {
        self.outputs.push((name.into(), data.into()));
        self
    }

    /// Channels in order
    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &[(String, String)] {
        &self.outputs
    }
}

impl<N, D> FromIterator<(N, D)> for FragmentCapture
where
    N: Into<String>,
    D: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, D)>>(iter: I) -> Self {
        Self {
            outputs: iter
                .into_iter()
                .map(|(name, data)| (name.into(), data.into()))
                .collect(),
        }
    }
}

/// One run of a source layer in one environment
///
/// # Invariants
/// - `log.len() == source.len()` for every layer built here
/// - `log[i].hash` is the digest of `source.fragments()[i]`
/// - Sealed: no method mutates a built layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLayer {
    #[serde(rename = "code")]
    source: Arc<SourceLayer>,
    environment: String,
    log: Vec<LogEntry>,
}

impl ExecutionLayer {
    /// Build a layer from one capture per fragment
    ///
    /// # Errors
    /// - [`BuildError::StructuralMismatch`] if capture count != fragment count
    /// - [`BuildError::DuplicateChannel`] if a capture repeats a channel
    pub fn capture<I>(
        digester: &dyn Digester,
        source: Arc<SourceLayer>,
        environment: impl Into<String>,
        captures: I,
    ) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = FragmentCapture>,
    {
        let mut recorder = ExecutionRecorder::new(digester, source, environment);
        let fragments = recorder.source.len();
        let mut supplied = 0;
        for capture in captures {
            supplied += 1;
            if supplied > fragments {
                continue;
            }
            recorder.record(capture)?;
        }
        if supplied != fragments {
            return Err(BuildError::StructuralMismatch {
                fragments,
                entries: supplied,
            });
        }
        recorder.seal()
    }

    /// Source layer this run executed
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Arc<SourceLayer> {
        &self.source
    }

    /// Free-text runtime description
    #[inline]
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Log entries in fragment order
    #[inline]
    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Log entry at `index`
    #[inline]
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&LogEntry> {
        self.log.get(index)
    }

    #[cfg(test)]
    pub(crate) fn log_mut(&mut self) -> &mut Vec<LogEntry> {
        &mut self.log
    }

    #[cfg(test)]
    pub(crate) fn source_mut(&mut self) -> &mut SourceLayer {
        Arc::make_mut(&mut self.source)
    }
}

/// Incremental builder that records one fragment at a time
///
/// ```rust,ignore
/// let mut recorder = ExecutionRecorder::new(&Sha1Digester, source, banner);
/// while let Some(code) = recorder.next_fragment() {
///     let capture = engine.run(code);
///     recorder.record(capture)?;
/// }
/// let layer = recorder.seal()?;
/// ```
#[derive(Debug)]
pub struct ExecutionRecorder<'d> {
    digester: &'d dyn Digester,
    source: Arc<SourceLayer>,
    environment: String,
    log: Vec<LogEntry>,
}

impl<'d> ExecutionRecorder<'d> {
    /// Start recording a run of `source`
    #[must_use]
    pub fn new(
        digester: &'d dyn Digester,
        source: Arc<SourceLayer>,
        environment: impl Into<String>,
    ) -> Self {
        let capacity = source.len();
        Self {
            digester,
            source,
            environment: environment.into(),
            log: Vec::with_capacity(capacity),
        }
    }

    /// Fragment that the next `record` call belongs to
    #[inline]
    #[must_use]
    pub fn next_fragment(&self) -> Option<&str> {
        self.source.fragment(self.log.len())
    }

    /// Fragments still waiting for a log entry
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.source.len() - self.log.len()
    }

    /// Record outputs of the next fragment
    ///
    /// # Errors
    /// - [`BuildError::TooManyEntries`] once every fragment is recorded
    /// - [`BuildError::DuplicateChannel`] if the capture repeats a channel
    pub fn record(&mut self, capture: FragmentCapture) -> Result<&LogEntry, BuildError> {
        let index = self.log.len();
        let Some(fragment) = self.source.fragment(index) else {
            return Err(BuildError::TooManyEntries {
                fragments: self.source.len(),
            });
        };

        let hash = self.digester.digest_str(fragment);
        let mut outputs = IndexMap::with_capacity(capture.outputs.len());
        for (channel, data) in capture.outputs {
            if outputs.contains_key(&channel) {
                return Err(BuildError::DuplicateChannel {
                    fragment: index,
                    channel,
                });
            }
            let record = OutputRecord::capture(self.digester, data);
            outputs.insert(channel, record);
        }

        self.log.push(LogEntry { hash, outputs });
        Ok(&self.log[index])
    }

    /// Finish the run
    ///
    /// # Errors
    /// Returns [`BuildError::StructuralMismatch`] if fragments are unrecorded
    pub fn seal(self) -> Result<ExecutionLayer, BuildError> {
        if self.log.len() != self.source.len() {
            return Err(BuildError::StructuralMismatch {
                fragments: self.source.len(),
                entries: self.log.len(),
            });
        }
        Ok(ExecutionLayer {
            source: self.source,
            environment: self.environment,
            log: self.log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{DigestAlgorithm, Sha1Digester};

    fn source() -> Arc<SourceLayer> {
        Arc::new(SourceLayer::new("python3", ["import math", "math.cos(0)"]).unwrap())
    }

    #[test]
    fn capture_computes_hashes() {
        let d = Sha1Digester;
        let layer = ExecutionLayer::capture(
            &d,
            source(),
            "CPython 3.12",
            [FragmentCapture::console(""), FragmentCapture::console("1.0")],
        )
        .unwrap();

        assert_eq!(layer.log().len(), 2);
        assert_eq!(layer.log()[0].hash(), &d.digest_str("import math"));
        assert_eq!(layer.log()[1].hash(), &d.digest_str("math.cos(0)"));
        let out = layer.log()[1].output(CONSOLE).unwrap();
        assert_eq!(out.data(), "1.0");
        assert_eq!(out.hash(), &d.digest_str("1.0"));
        assert_eq!(layer.environment(), "CPython 3.12");
    }

    #[test]
    fn capture_rejects_missing_entries() {
        let err = ExecutionLayer::capture(
            &Sha1Digester,
            source(),
            "env",
            [FragmentCapture::console("")],
        )
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
    fn capture_rejects_extra_entries() {
        let err = ExecutionLayer::capture(
            &Sha1Digester,
            source(),
            "env",
            vec![FragmentCapture::new(); 3],
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::StructuralMismatch {
                fragments: 2,
                entries: 3
            }
        );
    }

    #[test]
    fn capture_rejects_duplicate_channel() {
        let dup = FragmentCapture::console("a").channel(CONSOLE, "b");
        let err = ExecutionLayer::capture(
            &Sha1Digester,
            source(),
            "env",
            [FragmentCapture::new(), dup],
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateChannel {
                fragment: 1,
                channel: CONSOLE.to_string()
            }
        );
    }

    #[test]
    fn outputs_preserve_capture_order() {
        let capture: FragmentCapture = [("stdout", "x"), ("stderr", "y"), ("display", "z")]
            .into_iter()
            .collect();
        let layer = ExecutionLayer::capture(
            &Sha1Digester,
            source(),
            "env",
            [FragmentCapture::new(), capture],
        )
        .unwrap();
        let channels: Vec<_> = layer.log()[1].outputs().keys().cloned().collect();
        assert_eq!(channels, ["stdout", "stderr", "display"]);
    }

    #[test]
    fn recorder_walks_fragments() {
        let d = DigestAlgorithm::Blake3.digester();
        let mut recorder = ExecutionRecorder::new(d, source(), "env");
        assert_eq!(recorder.next_fragment(), Some("import math"));
        assert_eq!(recorder.remaining(), 2);

        recorder.record(FragmentCapture::new()).unwrap();
        assert_eq!(recorder.next_fragment(), Some("math.cos(0)"));

        let entry = recorder.record(FragmentCapture::console("1.0")).unwrap();
        assert_eq!(entry.hash(), &d.digest_str("math.cos(0)"));
        assert_eq!(recorder.next_fragment(), None);
        assert_eq!(
            recorder.record(FragmentCapture::new()).unwrap_err(),
            BuildError::TooManyEntries { fragments: 2 }
        );

        let layer = recorder.seal().unwrap();
        assert_eq!(layer.log().len(), 2);
    }

    #[test]
    fn recorder_seal_requires_every_fragment() {
        let mut recorder = ExecutionRecorder::new(&Sha1Digester, source(), "env");
        recorder.record(FragmentCapture::new()).unwrap();
        assert_eq!(
            recorder.seal().unwrap_err(),
            BuildError::StructuralMismatch {
                fragments: 2,
                entries: 1
            }
        );
    }

    #[test]
    fn layers_share_source() {
        let src = source();
        let a = ExecutionLayer::capture(&Sha1Digester, Arc::clone(&src), "a", vec![FragmentCapture::new(); 2]).unwrap();
        let b = ExecutionLayer::capture(&Sha1Digester, Arc::clone(&src), "b", vec![FragmentCapture::new(); 2]).unwrap();
        assert!(Arc::ptr_eq(a.source(), b.source()));
    }
}
