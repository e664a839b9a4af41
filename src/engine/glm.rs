//! Negative-binomial GLM engine adapter (DESeq2)

use std::sync::Arc;

use super::{
    check_gene_coverage, group_means, DifferentialEngine, EngineArtifact, EngineKind,
    EngineOutput, EngineRequest, NativeTable,
};
use crate::data::CountMatrix;
use crate::error::{DgeError, Result};

/// One row of the GLM engine's native results table
///
/// Field names follow DESeq2's `results()` columns. `padj` is `None` for
/// genes the engine excluded from multiple testing (independent filtering,
/// count outliers); the row itself is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct GlmRow {
    pub gene_id: String,
    pub base_mean: Option<f64>,
    /// Treatment relative to control
    pub log2_fold_change: Option<f64>,
    pub lfc_se: Option<f64>,
    pub stat: Option<f64>,
    pub pvalue: Option<f64>,
    pub padj: Option<f64>,
    /// Mean normalized count over treatment samples, set by the adapter
    pub base_mean_treatment: Option<f64>,
    /// Mean normalized count over control samples, set by the adapter
    pub base_mean_control: Option<f64>,
}

/// Raw output of a GLM fit
#[derive(Debug, Clone)]
pub struct GlmFit {
    pub rows: Vec<GlmRow>,
    /// Per-sample size factors
    pub size_factors: Vec<f64>,
    /// Counts divided by size factors
    pub normalized_counts: CountMatrix,
}

/// A GLM engine reachable from the adapter
///
/// The fit uses a two-level design with control as the reference level and
/// reports fold changes as treatment relative to control.
pub trait GlmBackend: Send + Sync {
    fn fit(&self, request: &EngineRequest<'_>) -> Result<GlmFit>;
}

impl<B: GlmBackend + ?Sized> GlmBackend for Arc<B> {
    fn fit(&self, request: &EngineRequest<'_>) -> Result<GlmFit> {
        (**self).fit(request)
    }
}

/// Adapter exposing a [`GlmBackend`] as a [`DifferentialEngine`]
#[derive(Debug, Clone)]
pub struct GlmEngine<B> {
    backend: B,
}

impl<B: GlmBackend> GlmEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    fn fit_and_annotate(&self, request: &EngineRequest<'_>) -> Result<EngineOutput> {
        let fit = self.backend.fit(request)?;
        check_gene_coverage(request, fit.rows.iter().map(|r| r.gene_id.as_str()))?;

        if fit.size_factors.len() != request.counts.n_samples() {
            return Err(DgeError::DimensionMismatch {
                expected: format!("{} size factors", request.counts.n_samples()),
                got: format!("{} size factors", fit.size_factors.len()),
            });
        }

        let (normalized, means) = group_means(request, &fit.normalized_counts)?;
        let rows = fit
            .rows
            .into_iter()
            .map(|mut row| {
                if let Some(m) = means.get(&row.gene_id) {
                    row.base_mean_treatment = Some(m.treatment);
                    row.base_mean_control = Some(m.control);
                }
                row
            })
            .collect();

        Ok(EngineOutput {
            native: NativeTable::Glm(rows),
            artifact: Some(EngineArtifact {
                sample_factors: fit.size_factors,
                normalized_counts: normalized,
            }),
        })
    }
}

impl<B: GlmBackend> DifferentialEngine for GlmEngine<B> {
    fn kind(&self) -> EngineKind {
        EngineKind::Deseq
    }

    fn run(&self, request: &EngineRequest<'_>) -> Result<EngineOutput> {
        self.fit_and_annotate(request).map_err(|e| {
            DgeError::engine(&request.contrast.label(), self.kind().label(), e.to_string())
        })
    }
}
