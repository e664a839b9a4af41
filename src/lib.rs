//! rust_dge: pairwise differential gene expression with two engines
//!
//! For every treatment-vs-control contrast the count matrix is subset and
//! filtered for low counts, then handed to a negative-binomial GLM engine
//! (DESeq2) and an exact-test engine (edgeR). Both results are harmonized
//! into one schema, optionally annotated with gene symbols, split into
//! significance tiers and written to one directory per contrast.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rust_dge::prelude::*;
//!
//! let counts = read_count_matrix("counts.tsv")?;
//! let samples = read_sample_sheet("samples.tsv")?;
//! let contrasts = read_contrasts("contrasts.tsv")?;
//!
//! let runtime = Arc::new(RscriptRuntime::open(&RscriptConfig::default())?);
//! let pipeline = DgePipeline::new(
//!     RunParameters::new("results"),
//!     Box::new(GlmEngine::new(runtime.clone())),
//!     Box::new(ExactTestEngine::new(runtime.clone())),
//! )?;
//! let report = pipeline.run(&counts, &samples, &contrasts)?;
//! ```

pub mod annotation;
pub mod cli;
pub mod data;
pub mod engine;
pub mod error;
pub mod filter;
pub mod harmonize;
pub mod io;
pub mod normalization;
pub mod pipeline;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::annotation::{AnnotationBackend, AnnotationConfig, GeneAnnotator};
    pub use crate::data::{subset_for_contrast, Contrast, ContrastSubset, CountMatrix, SampleSheet};
    pub use crate::engine::{
        DifferentialEngine, EngineKind, EngineRequest, ExactTestBackend, ExactTestEngine,
        GlmBackend, GlmEngine, NativeTable, RscriptConfig, RscriptRuntime,
    };
    pub use crate::error::{DgeError, Result};
    pub use crate::filter::{filter_low_counts, significance_tiers, SignificanceTiers};
    pub use crate::harmonize::harmonize;
    pub use crate::io::{
        read_contrasts, read_count_matrix, read_sample_sheet, DeRecord, DeTable, ResultsSummary,
    };
    pub use crate::normalization::cpm;
    pub use crate::pipeline::{
        ContrastOutcome, ContrastRun, DgePipeline, EngineRun, ErrorMode, RunParameters, RunReport,
    };
}
