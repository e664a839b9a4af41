//! Differential expression engines behind one adapter contract
//!
//! Each engine is an external statistical computation reached through a
//! backend trait ([`GlmBackend`], [`ExactTestBackend`]). The adapters
//! ([`GlmEngine`], [`ExactTestEngine`]) own the convention fixes that belong
//! to the engine (group means, fold-change sign) and return the
//! engine-native schema as a [`NativeTable`]; renaming into the canonical
//! schema happens in [`crate::harmonize`].

mod exact_test;
mod glm;
mod rscript;

use std::collections::HashMap;
use std::fmt;

use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::data::{Contrast, CountMatrix};
use crate::error::{DgeError, Result};

pub use exact_test::{ExactTestBackend, ExactTestEngine, ExactTestFit, ExactTestRow};
pub use glm::{GlmBackend, GlmEngine, GlmFit, GlmRow};
pub use rscript::{RscriptConfig, RscriptRuntime};

/// The two engines of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Negative-binomial GLM engine (DESeq2)
    Deseq,
    /// Two-group exact-test engine (edgeR)
    Edger,
}

impl EngineKind {
    /// Prefix used in output file names
    pub fn label(&self) -> &'static str {
        match self {
            EngineKind::Deseq => "deseq",
            EngineKind::Edger => "edger",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Input of one engine call
///
/// `counts` holds raw integer counts with treatment columns first, then
/// control columns.
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    pub contrast: &'a Contrast,
    pub counts: &'a CountMatrix,
    pub n_treatment: usize,
    pub n_control: usize,
}

impl<'a> EngineRequest<'a> {
    pub fn new(
        contrast: &'a Contrast,
        counts: &'a CountMatrix,
        n_treatment: usize,
        n_control: usize,
    ) -> Result<Self> {
        if n_treatment == 0 || n_control == 0 {
            return Err(DgeError::configuration(
                &contrast.label(),
                "both groups need at least one sample",
            ));
        }
        if n_treatment + n_control != counts.n_samples() {
            return Err(DgeError::DimensionMismatch {
                expected: format!("{} samples", n_treatment + n_control),
                got: format!("{} samples", counts.n_samples()),
            });
        }
        Ok(Self {
            contrast,
            counts,
            n_treatment,
            n_control,
        })
    }

    pub fn treatment(&self) -> &str {
        &self.contrast.treatment
    }

    pub fn control(&self) -> &str {
        &self.contrast.control
    }
}

/// Engine output before harmonization
#[derive(Debug, Clone, PartialEq)]
pub enum NativeTable {
    Glm(Vec<GlmRow>),
    ExactTest(Vec<ExactTestRow>),
}

impl NativeTable {
    pub fn n_genes(&self) -> usize {
        match self {
            NativeTable::Glm(rows) => rows.len(),
            NativeTable::ExactTest(rows) => rows.len(),
        }
    }
}

/// Engine-side normalization kept for callers of a run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineArtifact {
    /// Per-sample size factors (GLM) or library normalization factors (exact test)
    pub sample_factors: Vec<f64>,
    /// Normalized counts on the count scale, treatment columns first
    pub normalized_counts: CountMatrix,
}

/// Result of one adapter call
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub native: NativeTable,
    pub artifact: Option<EngineArtifact>,
}

/// Common contract of both engine adapters
///
/// Calls are blocking. Implementations must be safe to call from several
/// contrasts at once.
pub trait DifferentialEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    fn run(&self, request: &EngineRequest<'_>) -> Result<EngineOutput>;
}

/// Per-gene means of normalized counts: (all samples, treatment, control)
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GroupMeans {
    pub all: f64,
    pub treatment: f64,
    pub control: f64,
}

/// Put a normalized matrix back into the request's column order and
/// compute per-gene group means keyed by gene id
///
/// Engines are free to reorder columns; the request order is authoritative.
pub(crate) fn group_means(
    request: &EngineRequest<'_>,
    normalized: &CountMatrix,
) -> Result<(CountMatrix, HashMap<String, GroupMeans>)> {
    let ordered = normalized.select_samples(request.counts.sample_ids())?;
    let means = row_group_means(ordered.counts(), request.n_treatment);

    let by_gene = ordered
        .gene_ids()
        .iter()
        .cloned()
        .zip(means)
        .collect();
    Ok((ordered, by_gene))
}

fn row_group_means(values: ArrayView2<f64>, n_treatment: usize) -> Vec<GroupMeans> {
    let n_total = values.ncols();
    values
        .axis_iter(Axis(0))
        .map(|row| {
            let treatment: f64 = row.iter().take(n_treatment).sum();
            let control: f64 = row.iter().skip(n_treatment).sum();
            GroupMeans {
                all: (treatment + control) / n_total as f64,
                treatment: treatment / n_treatment as f64,
                control: control / (n_total - n_treatment) as f64,
            }
        })
        .collect()
}

/// Check that an engine reported every requested gene exactly once
pub(crate) fn check_gene_coverage<'g, I>(request: &EngineRequest<'_>, reported: I) -> Result<()>
where
    I: IntoIterator<Item = &'g str>,
{
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for gene in reported {
        *seen.entry(gene).or_insert(0) += 1;
    }

    let missing: Vec<&str> = request
        .counts
        .gene_ids()
        .iter()
        .map(|g| g.as_str())
        .filter(|g| !seen.contains_key(g))
        .collect();
    let duplicated = seen.values().any(|&n| n > 1);
    let unknown = seen.len() > request.counts.n_genes() - missing.len();

    if !missing.is_empty() || duplicated || unknown {
        return Err(DgeError::InvalidEngineOutput {
            reason: format!(
                "engine reported {} distinct genes for {} requested ({} missing, duplicates: {}, unknown: {})",
                seen.len(),
                request.counts.n_genes(),
                missing.len(),
                duplicated,
                unknown
            ),
        });
    }
    Ok(())
}
