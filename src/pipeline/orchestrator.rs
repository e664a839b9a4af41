//! Per-contrast orchestration of both engines

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use rayon::prelude::*;

use super::params::{ErrorMode, RunParameters};
use crate::annotation::GeneAnnotator;
use crate::data::{subset_for_contrast, Contrast, CountMatrix, SampleSheet};
use crate::engine::{DifferentialEngine, EngineArtifact, EngineKind, EngineRequest};
use crate::error::{DgeError, Result};
use crate::filter::{filter_low_counts, significance_tiers};
use crate::harmonize::harmonize;
use crate::io::{ContrastOutput, DeTable, ResultsSummary};

/// One engine's results for one contrast
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub kind: EngineKind,
    /// Harmonized, annotated full table sorted by raw p-value
    pub table: DeTable,
    pub artifact: Option<EngineArtifact>,
    pub summary: ResultsSummary,
    /// Written tier files: full, p-value filtered, fold-change filtered
    pub files: Vec<PathBuf>,
}

/// An engine that failed for a contrast in continue-on-error mode
#[derive(Debug)]
pub struct EngineFailure {
    pub kind: EngineKind,
    pub error: DgeError,
}

/// Results of one contrast
#[derive(Debug)]
pub struct ContrastRun {
    pub contrast: Contrast,
    pub treatment_samples: Vec<String>,
    pub control_samples: Vec<String>,
    pub output_dir: PathBuf,
    /// Genes before low-count filtering
    pub genes_total: usize,
    /// Genes passed to the engines
    pub genes_tested: usize,
    /// Successful engines, GLM first
    pub engines: Vec<EngineRun>,
    pub failures: Vec<EngineFailure>,
}

impl ContrastRun {
    pub fn engine(&self, kind: EngineKind) -> Option<&EngineRun> {
        self.engines.iter().find(|run| run.kind == kind)
    }
}

/// Outcome of one contrast
#[derive(Debug)]
pub enum ContrastOutcome {
    Completed(ContrastRun),
    /// Only produced in continue-on-error mode
    Failed { contrast: Contrast, error: DgeError },
}

impl ContrastOutcome {
    pub fn contrast(&self) -> &Contrast {
        match self {
            ContrastOutcome::Completed(run) => &run.contrast,
            ContrastOutcome::Failed { contrast, .. } => contrast,
        }
    }

    pub fn completed(&self) -> Option<&ContrastRun> {
        match self {
            ContrastOutcome::Completed(run) => Some(run),
            ContrastOutcome::Failed { .. } => None,
        }
    }
}

/// All contrast outcomes in input order
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<ContrastOutcome>,
}

impl RunReport {
    /// Number of failed contrasts plus failed (contrast, engine) pairs
    pub fn n_failures(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                ContrastOutcome::Completed(run) => run.failures.len(),
                ContrastOutcome::Failed { .. } => 1,
            })
            .sum()
    }

    pub fn is_complete(&self) -> bool {
        self.n_failures() == 0
    }
}

/// Runs every contrast through subsetting, filtering, both engines,
/// harmonization, annotation, tiering and output
pub struct DgePipeline {
    params: RunParameters,
    glm: Box<dyn DifferentialEngine>,
    exact_test: Box<dyn DifferentialEngine>,
    annotator: GeneAnnotator,
}

impl DgePipeline {
    pub fn new(
        params: RunParameters,
        glm: Box<dyn DifferentialEngine>,
        exact_test: Box<dyn DifferentialEngine>,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            glm,
            exact_test,
            annotator: GeneAnnotator::passthrough(),
        })
    }

    pub fn with_annotator(mut self, annotator: GeneAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    /// Run all contrasts
    ///
    /// Inputs are shared read-only. Outcomes are in input order whether or
    /// not contrasts run in parallel. In fail-fast mode every contrast is
    /// subset before any engine runs, so a configuration error writes
    /// nothing. After an engine failure no further contrast is started, and
    /// the first error in input order is returned.
    pub fn run(
        &self,
        counts: &CountMatrix,
        samples: &SampleSheet,
        contrasts: &[Contrast],
    ) -> Result<RunReport> {
        info!(
            "Running {} contrasts on {} genes x {} samples",
            contrasts.len(),
            counts.n_genes(),
            counts.n_samples()
        );

        let fail_fast = self.params.error_mode == ErrorMode::FailFast;
        if fail_fast {
            for contrast in contrasts {
                subset_for_contrast(counts, samples, contrast)?;
            }
            debug!("All {} contrasts resolve to sample groups", contrasts.len());
        }

        // Set on the first failure in fail-fast mode; contrasts not yet
        // started are skipped
        let abort = AtomicBool::new(false);
        let run_one = |contrast: &Contrast| -> Option<Result<ContrastRun>> {
            if abort.load(Ordering::SeqCst) {
                return None;
            }
            let result = self.run_contrast(counts, samples, contrast);
            if fail_fast && result.is_err() {
                abort.store(true, Ordering::SeqCst);
            }
            Some(result)
        };

        let results: Vec<Option<Result<ContrastRun>>> = if self.params.parallel_contrasts {
            contrasts.par_iter().map(run_one).collect()
        } else {
            contrasts.iter().map(run_one).collect()
        };

        let mut outcomes = Vec::with_capacity(results.len());
        for (contrast, result) in contrasts.iter().zip(results) {
            let result = match result {
                Some(result) => result,
                None => {
                    debug!("Contrast {} skipped after an earlier failure", contrast);
                    continue;
                }
            };
            match result {
                Ok(run) => outcomes.push(ContrastOutcome::Completed(run)),
                Err(error) => match self.params.error_mode {
                    ErrorMode::FailFast => return Err(error),
                    ErrorMode::ContinueOnError => {
                        warn!("Contrast {} failed: {}", contrast, error);
                        outcomes.push(ContrastOutcome::Failed {
                            contrast: contrast.clone(),
                            error,
                        });
                    }
                },
            }
        }

        Ok(RunReport { outcomes })
    }

    /// Run one contrast
    ///
    /// The contrast directory is created before any engine runs, so a
    /// collision leaves no files behind. In fail-fast mode an engine error is
    /// returned once both engines have finished.
    pub fn run_contrast(
        &self,
        counts: &CountMatrix,
        samples: &SampleSheet,
        contrast: &Contrast,
    ) -> Result<ContrastRun> {
        info!("Contrast {}", contrast);

        let subset = subset_for_contrast(counts, samples, contrast)?;
        let raw = subset.counts.rounded();
        let filtered = filter_low_counts(&raw, self.params.low_count_threshold)?;
        info!(
            "  {} treatment / {} control samples, {} of {} genes pass the low-count filter",
            subset.treatment_samples.len(),
            subset.control_samples.len(),
            filtered.n_genes(),
            raw.n_genes()
        );

        let output = ContrastOutput::create(&self.params.output_dir, contrast)?;
        let request = EngineRequest::new(
            contrast,
            &filtered,
            subset.treatment_samples.len(),
            subset.control_samples.len(),
        )?;

        let (glm, exact_test) = rayon::join(
            || self.run_engine(self.glm.as_ref(), &request, &output),
            || self.run_engine(self.exact_test.as_ref(), &request, &output),
        );

        let mut engines = Vec::with_capacity(2);
        let mut failures = Vec::new();
        for (kind, result) in [(self.glm.kind(), glm), (self.exact_test.kind(), exact_test)] {
            match result {
                Ok(run) => engines.push(run),
                Err(error) => failures.push(EngineFailure { kind, error }),
            }
        }

        if engines.is_empty() && output.remove_if_empty()? {
            debug!("Removed empty output directory {}", output.path().display());
        }

        if self.params.error_mode == ErrorMode::FailFast && !failures.is_empty() {
            return Err(failures.remove(0).error);
        }
        for failure in &failures {
            warn!("Contrast {}: {}", contrast, failure.error);
        }

        Ok(ContrastRun {
            contrast: contrast.clone(),
            treatment_samples: subset.treatment_samples,
            control_samples: subset.control_samples,
            output_dir: output.path().to_path_buf(),
            genes_total: raw.n_genes(),
            genes_tested: filtered.n_genes(),
            engines,
            failures,
        })
    }

    fn run_engine(
        &self,
        engine: &dyn DifferentialEngine,
        request: &EngineRequest<'_>,
        output: &ContrastOutput,
    ) -> Result<EngineRun> {
        let kind = engine.kind();
        let result = engine.run(request)?;
        debug!(
            "  {}: engine reported {} genes",
            kind,
            result.native.n_genes()
        );

        let mut table = harmonize(&result.native);
        self.annotator.annotate(&mut table);

        let alpha = self.params.padj_alpha;
        let fc_threshold = self.params.fold_change_threshold;
        let tiers = significance_tiers(&table, alpha, fc_threshold);
        let files = output.write_tiers(kind.label(), &tiers, alpha, fc_threshold)?;

        let summary = table.summary(alpha, fc_threshold);
        info!("  {}: {}", kind, summary);
        log_written(output.path(), &files);

        Ok(EngineRun {
            kind,
            table,
            artifact: result.artifact,
            summary,
            files,
        })
    }
}

fn log_written(dir: &Path, files: &[PathBuf]) {
    for file in files {
        let name = file.strip_prefix(dir).unwrap_or(file);
        debug!("    wrote {}", name.display());
    }
}
