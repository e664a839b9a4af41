//! Two-group exact-test engine adapter (edgeR)

use std::sync::Arc;

use super::{
    check_gene_coverage, group_means, DifferentialEngine, EngineArtifact, EngineKind,
    EngineOutput, EngineRequest, NativeTable,
};
use crate::data::CountMatrix;
use crate::error::{DgeError, Result};

/// One row of the exact-test engine's native table
///
/// Field names follow edgeR's `topTags()` columns (`logFC`, `logCPM`,
/// `PValue`, `FDR`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExactTestRow {
    pub gene_id: String,
    /// Log2 fold change. As reported by the engine this is control relative
    /// to treatment; after the adapter it is treatment relative to control.
    pub log_fc: Option<f64>,
    pub log_cpm: Option<f64>,
    pub pvalue: Option<f64>,
    pub fdr: Option<f64>,
    /// Mean pseudo-count over all samples, set by the adapter
    pub base_mean: Option<f64>,
    pub base_mean_treatment: Option<f64>,
    pub base_mean_control: Option<f64>,
}

/// Raw output of an exact test
#[derive(Debug, Clone)]
pub struct ExactTestFit {
    /// Rows in engine order (sorted by the engine's own statistic)
    pub rows: Vec<ExactTestRow>,
    /// Per-sample library normalization factors
    pub norm_factors: Vec<f64>,
    /// Library-size-equalized pseudo-counts, when the engine provides them
    pub pseudo_counts: Option<CountMatrix>,
}

/// An exact-test engine reachable from the adapter
///
/// Backends report `log_fc` with the engine's own convention: control
/// relative to treatment.
pub trait ExactTestBackend: Send + Sync {
    fn exact_test(&self, request: &EngineRequest<'_>) -> Result<ExactTestFit>;
}

impl<B: ExactTestBackend + ?Sized> ExactTestBackend for Arc<B> {
    fn exact_test(&self, request: &EngineRequest<'_>) -> Result<ExactTestFit> {
        (**self).exact_test(request)
    }
}

/// Adapter exposing an [`ExactTestBackend`] as a [`DifferentialEngine`]
#[derive(Debug, Clone)]
pub struct ExactTestEngine<B> {
    backend: B,
}

impl<B: ExactTestBackend> ExactTestEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    fn test_and_orient(&self, request: &EngineRequest<'_>) -> Result<EngineOutput> {
        let fit = self.backend.exact_test(request)?;
        check_gene_coverage(request, fit.rows.iter().map(|r| r.gene_id.as_str()))?;

        let (artifact, means) = match fit.pseudo_counts {
            Some(pseudo) => {
                let (normalized, means) = group_means(request, &pseudo)?;
                let artifact = EngineArtifact {
                    sample_factors: fit.norm_factors,
                    normalized_counts: normalized,
                };
                (Some(artifact), means)
            }
            None => (None, Default::default()),
        };

        let rows = fit
            .rows
            .into_iter()
            .map(|mut row| {
                row.log_fc = row.log_fc.map(|lfc| -lfc);
                if let Some(m) = means.get(&row.gene_id) {
                    row.base_mean = Some(m.all);
                    row.base_mean_treatment = Some(m.treatment);
                    row.base_mean_control = Some(m.control);
                }
                row
            })
            .collect();

        Ok(EngineOutput {
            native: NativeTable::ExactTest(rows),
            artifact,
        })
    }
}

impl<B: ExactTestBackend> DifferentialEngine for ExactTestEngine<B> {
    fn kind(&self) -> EngineKind {
        EngineKind::Edger
    }

    fn run(&self, request: &EngineRequest<'_>) -> Result<EngineOutput> {
        self.test_and_orient(request).map_err(|e| {
            DgeError::engine(&request.contrast.label(), self.kind().label(), e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Contrast;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Reports control-over-treatment fold changes like edgeR's exactTest(pair = c(trt, ctrl))
    struct ControlOverTreatment;

    impl ExactTestBackend for ControlOverTreatment {
        fn exact_test(&self, request: &EngineRequest<'_>) -> Result<ExactTestFit> {
            let counts = request.counts.counts();
            let rows = request
                .counts
                .gene_ids()
                .iter()
                .enumerate()
                .map(|(i, g)| {
                    let row = counts.row(i);
                    let trt: f64 = row.iter().take(request.n_treatment).sum::<f64>()
                        / request.n_treatment as f64;
                    let ctrl: f64 = row.iter().skip(request.n_treatment).sum::<f64>()
                        / request.n_control as f64;
                    ExactTestRow {
                        gene_id: g.clone(),
                        log_fc: Some((ctrl / trt).log2()),
                        log_cpm: Some(10.0),
                        pvalue: Some(0.001),
                        fdr: None,
                        base_mean: None,
                        base_mean_treatment: None,
                        base_mean_control: None,
                    }
                })
                .collect();
            Ok(ExactTestFit {
                rows,
                norm_factors: vec![1.0; request.counts.n_samples()],
                pseudo_counts: None,
            })
        }
    }

    #[test]
    fn test_adapter_inverts_fold_change() {
        let contrast = Contrast::new("trt", "ctrl");
        let counts = CountMatrix::new(
            array![[80.0, 80.0, 10.0, 10.0]],
            vec!["up".to_string()],
            ["T1", "T2", "C1", "C2"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        let request = EngineRequest::new(&contrast, &counts, 2, 2).unwrap();

        let output = ExactTestEngine::new(ControlOverTreatment).run(&request).unwrap();
        match output.native {
            NativeTable::ExactTest(rows) => {
                assert_relative_eq!(rows[0].log_fc.unwrap(), 3.0, epsilon = 1e-12);
                assert_eq!(rows[0].base_mean, None);
            }
            other => panic!("unexpected native table: {other:?}"),
        }
        assert!(output.artifact.is_none());
    }
}
