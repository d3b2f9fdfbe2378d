//! Testing utilities for the notebook layers workspace
//!
//! Shared fixtures and tracing setup.

#![allow(missing_docs)]

use nbl_model::{
    DigestAlgorithm, ExecutionLayer, FragmentCapture, PresentationLayer, SourceLayer,
};
use std::sync::Arc;

pub const LANGUAGE: &str = "python3";

pub const COSINE_FRAGMENTS: [&str; 2] = ["import math", "x = math.pi\nmath.cos(x)"];

pub const COSINE_OUTPUTS: [&str; 2] = ["", "-1.0"];

pub const COSINE_ENVIRONMENT: &str = "Python 3.4.3 (default, Apr 15 2015, 21:03:06)\n\
    [GCC 4.2.1 Compatible Apple LLVM 6.1.0 (clang-602.0.49)] on darwin";

pub fn cosine_source() -> Arc<SourceLayer> {
    Arc::new(SourceLayer::new(LANGUAGE, COSINE_FRAGMENTS).unwrap())
}

pub fn cosine_execution(algorithm: DigestAlgorithm) -> ExecutionLayer {
    ExecutionLayer::capture(
        algorithm.digester(),
        cosine_source(),
        COSINE_ENVIRONMENT,
        COSINE_OUTPUTS.map(FragmentCapture::console),
    )
    .unwrap()
}

/// The cosine notebook: two documentation cells, a record, another
/// documentation cell, another record
pub fn cosine_notebook_with(algorithm: DigestAlgorithm) -> PresentationLayer {
    PresentationLayer::builder(LANGUAGE)
        .digest(algorithm)
        .execution(cosine_execution(algorithm))
        .unwrap()
        .documentation("markdown", "# The cosine function\n")
        .documentation("markdown", "First we import the math module:\n")
        .record(0, 0)
        .documentation("markdown", "Now we can compute the cosine:\n")
        .record(0, 1)
        .build()
        .unwrap()
}

pub fn cosine_notebook() -> PresentationLayer {
    cosine_notebook_with(DigestAlgorithm::Sha1)
}

/// Notebook with `runs` executions of the cosine source, one record cell per
/// fragment per run
pub fn rerun_notebook(runs: usize) -> PresentationLayer {
    let mut builder = PresentationLayer::builder(LANGUAGE);
    for run in 0..runs {
        let layer = ExecutionLayer::capture(
            DigestAlgorithm::Sha1.digester(),
            cosine_source(),
            format!("run {run}"),
            COSINE_OUTPUTS.map(FragmentCapture::console),
        )
        .unwrap();
        builder = builder
            .execution(layer)
            .unwrap()
            .documentation("markdown", format!("## Run {run}\n"))
            .record(run, 0)
            .record(run, 1);
    }
    builder.build().unwrap()
}

/// Install a fmt subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
