//! Notebook document codec
//!
//! Round-trips [`nbl_model::PresentationLayer`] through JSON or YAML.
//!
//! # Core Operations
//!
//! - **Encode**: document → versioned envelope text, digest id included
//! - **Decode**: text → document, hashes kept exactly as written
//! - **Decode + verify**: decode, then run the integrity pass
//!
//! # Example
//!
//! ```rust,ignore
//! use nbl_codec::{CodecConfig, Format, NotebookCodec};
//!
//! let codec = NotebookCodec::new(CodecConfig::from_path("nbl.toml")?);
//! let text = codec.encode(&doc)?;
//! let (decoded, report) = codec.decode_verified(text.as_bytes())?;
//! assert_eq!(decoded, doc);
//! assert!(report.is_consistent());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod codec;
pub mod config;
pub mod error;

pub use codec::{decode, encode, NotebookCodec, ENVELOPE_VERSION};
pub use config::{CodecConfig, Format};
pub use error::{CodecError, CodecResult, ConfigError, DecodeError, EncodeError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for reading and writing notebooks
    pub use crate::codec::NotebookCodec;
    pub use crate::config::{CodecConfig, Format};
    pub use crate::error::{CodecError, DecodeError, EncodeError};
    pub use nbl_model::{
        verify, Cell, DigestAlgorithm, ExecutionLayer, FragmentCapture, PresentationLayer,
        SourceLayer, VerificationReport,
    };
}
