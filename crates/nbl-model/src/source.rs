//! Source layer: language plus ordered code fragments

use crate::error::BuildError;
use serde::{Deserialize, Serialize};

/// Ordered code fragments of one notebook
///
/// # Invariants
/// - `language` is non-empty when built through [`SourceLayer::new`]
/// - Fragment order is significant and never changes after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLayer {
    language: String,
    fragments: Vec<String>,
}

impl SourceLayer {
    /// Create a source layer
    ///
    /// # Errors
    /// Returns [`BuildError::EmptyLanguage`] for an empty or blank language
    pub fn new<I, S>(language: impl Into<String>, fragments: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let language = language.into();
        if language.trim().is_empty() {
            return Err(BuildError::EmptyLanguage);
        }
        Ok(Self {
            language,
            fragments: fragments.into_iter().map(Into::into).collect(),
        })
    }

    /// Language identifier
    #[inline]
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// All fragments in order
    #[inline]
    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Fragment at `index`
    #[inline]
    #[must_use]
    pub fn fragment(&self, index: usize) -> Option<&str> {
        self.fragments.get(index).map(String::as_str)
    }

    /// Number of fragments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// True when there are no fragments
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn fragments_mut(&mut self) -> &mut Vec<String> {
        &mut self.fragments
    }
}
