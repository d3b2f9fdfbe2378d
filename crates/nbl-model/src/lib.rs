//! Layered notebook document model
//!
//! A notebook is three layers linked by content hashes.
//!
//! # Core Concepts
//!
//! - [`SourceLayer`]: language plus ordered code fragments
//! - [`ExecutionLayer`]: one run of a source layer; each [`LogEntry`] pairs
//!   a fragment hash with hashed outputs per channel
//! - [`PresentationLayer`]: documentation and execution-record [`Cell`]s
//!   over an append-only list of runs
//! - [`Digester`]: injectable digest strategy, identified in documents by
//!   [`DigestAlgorithm`]
//! - [`verify`]: report-all integrity pass over a document
//!
//! ```text
//! SourceLayer ──Arc──> ExecutionLayer ──Vec──> PresentationLayer
//!   fragments[i]  ⇐hash⇒  log[i]           cells: (execution, entry)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nbl_model::{DigestAlgorithm, ExecutionLayer, FragmentCapture, PresentationLayer, SourceLayer};
//! use std::sync::Arc;
//!
//! let digest = DigestAlgorithm::Sha1;
//! let source = Arc::new(SourceLayer::new("python3", ["import math", "math.cos(math.pi)"])?);
//! let run = ExecutionLayer::capture(
//!     digest.digester(),
//!     source,
//!     "Python 3.12.1",
//!     [FragmentCapture::console(""), FragmentCapture::console("-1.0")],
//! )?;
//! let doc = PresentationLayer::builder("python3")
//!     .digest(digest)
//!     .execution(run)?
//!     .documentation("markdown", "# The cosine function\n")
//!     .record(0, 1)
//!     .build()?;
//!
//! assert!(nbl_model::verify(&doc).is_consistent());
//! ```

#![warn(unreachable_pub)]

mod digest;
mod error;
mod execution;
mod hash;
mod index;
mod presentation;
mod source;
pub mod verify;

pub use digest::{Blake3Digester, DigestAlgorithm, Digester, Sha1Digester, Sha256Digester};
pub use error::{BuildError, IntegrityError};
pub use execution::{
    ExecutionLayer, ExecutionRecorder, FragmentCapture, LogEntry, OutputRecord, CONSOLE,
};
pub use hash::{ContentHash, HashError, MAX_HASH_LEN};
pub use index::ReplayIndex;
pub use presentation::{
    Cell, PresentationBuilder, PresentationLayer, RecordRef, ResolvedCell, ResolvedRecord,
};
pub use source::SourceLayer;
pub use verify::{
    verify, Evidence, IntegrityViolation, Location, VerificationReport, Verifier, ViolationKind,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
