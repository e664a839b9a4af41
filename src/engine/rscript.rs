//! R subprocess backend for both engines and the annotation lookup
//!
//! One bundled script is written into a private scratch directory when the
//! runtime opens. Every call gets its own subdirectory for request and
//! response files, so concurrent contrasts never share paths. Labels, key
//! types and database names travel as argv entries only.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use log::debug;
use tempfile::TempDir;

use super::{EngineRequest, ExactTestBackend, ExactTestFit, ExactTestRow, GlmBackend, GlmFit, GlmRow};
use crate::annotation::{AnnotationBackend, AnnotationConfig};
use crate::data::CountMatrix;
use crate::error::{DgeError, Result};
use crate::io::{parse_optional_f64, read_matrix, write_count_matrix, DelimitedTable};

const ENGINE_SCRIPT: &str = include_str!("../../scripts/dge_engines.R");
const RSCRIPT_ENV_BIN: &str = "DGE_RSCRIPT";
const DEFAULT_RSCRIPT_BIN: &str = "Rscript";

/// How to reach R
#[derive(Debug, Clone, Default)]
pub struct RscriptConfig {
    /// Rscript executable; `$DGE_RSCRIPT` or `Rscript` on `PATH` when unset
    pub executable: Option<String>,
    /// R packages checked at open time on top of DESeq2 and edgeR
    pub extra_packages: Vec<String>,
}

impl RscriptConfig {
    pub fn resolved_executable(&self) -> String {
        self.executable
            .clone()
            .or_else(|| std::env::var(RSCRIPT_ENV_BIN).ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_RSCRIPT_BIN.to_string())
    }
}

/// An opened R runtime
///
/// Open once per run with [`RscriptRuntime::open`] and share it between
/// contrasts; [`RscriptRuntime::close`] (or drop) releases the scratch space.
#[derive(Debug)]
pub struct RscriptRuntime {
    executable: String,
    script: PathBuf,
    scratch: TempDir,
}

impl RscriptRuntime {
    /// Materialize the engine script and verify R and its packages
    pub fn open(config: &RscriptConfig) -> Result<Self> {
        let executable = config.resolved_executable();
        let scratch = tempfile::Builder::new().prefix("rust_dge-").tempdir()?;
        let script = scratch.path().join("dge_engines.R");
        fs::write(&script, ENGINE_SCRIPT)?;

        let runtime = Self {
            executable,
            script,
            scratch,
        };

        let packages: Vec<OsString> = config.extra_packages.iter().map(OsString::from).collect();
        runtime.invoke("check", &packages).map_err(|e| match e {
            DgeError::EngineProcess { stderr, .. } => DgeError::EngineUnavailable {
                executable: runtime.executable.clone(),
                reason: stderr,
            },
            other => other,
        })?;

        debug!(
            "R runtime '{}' ready, scratch at {}",
            runtime.executable,
            runtime.scratch.path().display()
        );
        Ok(runtime)
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Release the scratch directory, reporting cleanup failures
    pub fn close(self) -> Result<()> {
        self.scratch.close()?;
        Ok(())
    }

    fn call_dir(&self, mode: &str) -> Result<TempDir> {
        Ok(tempfile::Builder::new()
            .prefix(&format!("{}-", mode))
            .tempdir_in(self.scratch.path())?)
    }

    fn invoke(&self, mode: &str, args: &[OsString]) -> Result<Output> {
        let output = Command::new(&self.executable)
            .arg(&self.script)
            .arg(mode)
            .args(args)
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    DgeError::EngineUnavailable {
                        executable: self.executable.clone(),
                        reason: "executable not found".to_string(),
                    }
                } else {
                    DgeError::IoError(e)
                }
            })?;

        if !output.status.success() {
            return Err(DgeError::EngineProcess {
                mode: mode.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run one two-group engine mode; returns the call directory holding
    /// `results.tsv`, `matrix.tsv` and `factors.tsv`
    fn run_two_group(&self, mode: &str, request: &EngineRequest<'_>) -> Result<TempDir> {
        let dir = self.call_dir(mode)?;
        let counts_path = dir.path().join("counts.tsv");
        write_count_matrix(&counts_path, request.counts)?;

        let args: Vec<OsString> = vec![
            counts_path.into_os_string(),
            request.treatment().into(),
            request.control().into(),
            request.n_treatment.to_string().into(),
            request.n_control.to_string().into(),
            dir.path().join("results.tsv").into_os_string(),
            dir.path().join("matrix.tsv").into_os_string(),
            dir.path().join("factors.tsv").into_os_string(),
        ];

        debug!(
            "{} engine on {} genes x {} samples for {}",
            mode,
            request.counts.n_genes(),
            request.counts.n_samples(),
            request.contrast
        );
        self.invoke(mode, &args)?;
        Ok(dir)
    }
}

impl GlmBackend for RscriptRuntime {
    fn fit(&self, request: &EngineRequest<'_>) -> Result<GlmFit> {
        let dir = self.run_two_group("deseq", request)?;
        let table = DelimitedTable::read(dir.path().join("results.tsv"))?;

        let genes = gene_column(&table)?;
        let base_mean = numeric_column(&table, "baseMean")?;
        let lfc = numeric_column(&table, "log2FoldChange")?;
        let lfc_se = numeric_column(&table, "lfcSE")?;
        let stat = numeric_column(&table, "stat")?;
        let pvalue = numeric_column(&table, "pvalue")?;
        let padj = numeric_column(&table, "padj")?;

        let rows = (0..genes.len())
            .map(|i| GlmRow {
                gene_id: genes[i].clone(),
                base_mean: base_mean[i],
                log2_fold_change: lfc[i],
                lfc_se: lfc_se[i],
                stat: stat[i],
                pvalue: pvalue[i],
                padj: padj[i],
                base_mean_treatment: None,
                base_mean_control: None,
            })
            .collect();

        Ok(GlmFit {
            rows,
            size_factors: read_sample_factors(&dir.path().join("factors.tsv"), request.counts)?,
            normalized_counts: read_matrix(dir.path().join("matrix.tsv"))?,
        })
    }
}

impl ExactTestBackend for RscriptRuntime {
    fn exact_test(&self, request: &EngineRequest<'_>) -> Result<ExactTestFit> {
        let dir = self.run_two_group("edger", request)?;
        let table = DelimitedTable::read(dir.path().join("results.tsv"))?;

        let genes = gene_column(&table)?;
        let log_fc = numeric_column(&table, "logFC")?;
        let log_cpm = numeric_column(&table, "logCPM")?;
        let pvalue = numeric_column(&table, "PValue")?;
        let fdr = numeric_column(&table, "FDR")?;

        let rows = (0..genes.len())
            .map(|i| ExactTestRow {
                gene_id: genes[i].clone(),
                log_fc: log_fc[i],
                log_cpm: log_cpm[i],
                pvalue: pvalue[i],
                fdr: fdr[i],
                base_mean: None,
                base_mean_treatment: None,
                base_mean_control: None,
            })
            .collect();

        Ok(ExactTestFit {
            rows,
            norm_factors: read_sample_factors(&dir.path().join("factors.tsv"), request.counts)?,
            pseudo_counts: Some(read_matrix(dir.path().join("matrix.tsv"))?),
        })
    }
}

impl AnnotationBackend for RscriptRuntime {
    fn lookup(&self, config: &AnnotationConfig, keys: &[String]) -> Result<Vec<(String, String)>> {
        let dir = self.call_dir("annotate")?;
        let keys_path = dir.path().join("keys.txt");
        let mapping_path = dir.path().join("mapping.tsv");
        fs::write(&keys_path, keys.join("\n"))?;

        let args: Vec<OsString> = vec![
            config.database.as_str().into(),
            config.keytype.as_str().into(),
            keys_path.into_os_string(),
            mapping_path.clone().into_os_string(),
        ];
        self.invoke("annotate", &args)
            .map_err(|e| DgeError::AnnotationLookup {
                reason: e.to_string(),
            })?;

        let table = DelimitedTable::read(&mapping_path)?;
        let invalid = |reason| DgeError::AnnotationLookup { reason };
        let key_col = table.require_column("key", invalid)?;
        let symbol_col = table.require_column("symbol", invalid)?;

        Ok(table
            .rows
            .iter()
            .map(|row| (row[key_col].clone(), row[symbol_col].clone()))
            .collect())
    }
}

fn invalid_output(reason: String) -> DgeError {
    DgeError::InvalidEngineOutput { reason }
}

fn gene_column(table: &DelimitedTable) -> Result<Vec<String>> {
    let idx = table.require_column(crate::io::GENE_ID_COLUMN, invalid_output)?;
    Ok(table.column_values(idx))
}

fn numeric_column(table: &DelimitedTable, name: &str) -> Result<Vec<Option<f64>>> {
    let idx = table.require_column(name, invalid_output)?;
    table
        .rows
        .iter()
        .map(|row| parse_optional_f64(&row[idx]))
        .collect()
}

/// Per-sample factors in the request's column order
fn read_sample_factors(path: &Path, counts: &CountMatrix) -> Result<Vec<f64>> {
    let table = DelimitedTable::read(path)?;
    let sample_col = table.require_column("sample", invalid_output)?;
    let factor_col = table.require_column("factor", invalid_output)?;

    counts
        .sample_ids()
        .iter()
        .map(|sample| {
            let row = table
                .rows
                .iter()
                .find(|row| &row[sample_col] == sample)
                .ok_or_else(|| invalid_output(format!("no factor reported for sample '{}'", sample)))?;
            parse_optional_f64(&row[factor_col])?
                .ok_or_else(|| invalid_output(format!("undefined factor for sample '{}'", sample)))
        })
        .collect()
}
