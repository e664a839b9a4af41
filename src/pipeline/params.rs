//! Run parameters

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationConfig;
use crate::error::{DgeError, Result};
use crate::filter::DEFAULT_MIN_SAMPLES;

/// What a failing contrast or engine does to the rest of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// The first error aborts the run
    #[default]
    FailFast,
    /// Failures are recorded per contrast and engine; other work continues
    ContinueOnError,
}

/// Organism-specific settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganismInfo {
    /// Annotation package used for symbol lookup
    #[serde(default)]
    pub database: Option<String>,
}

fn default_alpha() -> f64 {
    0.05
}

fn default_fold_change_threshold() -> f64 {
    1.0
}

fn default_low_count_threshold() -> usize {
    DEFAULT_MIN_SAMPLES
}

/// Parameters shared by every contrast of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Significance level applied to the raw p-value
    #[serde(default = "default_alpha")]
    pub padj_alpha: f64,
    /// Minimum log2 fold change (exclusive) of the fold-change tier
    #[serde(default = "default_fold_change_threshold")]
    pub fold_change_threshold: f64,
    /// Minimum number of samples with CPM > 1 for a gene to be tested
    #[serde(default = "default_low_count_threshold")]
    pub low_count_threshold: usize,
    /// Root under which one directory per contrast is created
    pub output_dir: PathBuf,
    /// Identifier type of the gene IDs for annotation lookup (e.g. `ENSEMBL`)
    #[serde(default)]
    pub gene_annotation_resource: Option<String>,
    #[serde(default)]
    pub organism_info: OrganismInfo,
    #[serde(default)]
    pub error_mode: ErrorMode,
    /// Run contrasts on the rayon pool instead of one after another
    #[serde(default)]
    pub parallel_contrasts: bool,
}

impl RunParameters {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            padj_alpha: default_alpha(),
            fold_change_threshold: default_fold_change_threshold(),
            low_count_threshold: default_low_count_threshold(),
            output_dir: output_dir.into(),
            gene_annotation_resource: None,
            organism_info: OrganismInfo::default(),
            error_mode: ErrorMode::default(),
            parallel_contrasts: false,
        }
    }

    /// Load parameters from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let params: Self = serde_json::from_reader(reader)?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.padj_alpha > 0.0 && self.padj_alpha <= 1.0) {
            return Err(DgeError::InvalidParameters {
                reason: format!("padj_alpha must be in (0, 1], got {}", self.padj_alpha),
            });
        }

        if !self.fold_change_threshold.is_finite() {
            return Err(DgeError::InvalidParameters {
                reason: format!(
                    "fold_change_threshold must be finite, got {}",
                    self.fold_change_threshold
                ),
            });
        }

        match (&self.gene_annotation_resource, &self.organism_info.database) {
            (Some(_), None) => Err(DgeError::InvalidParameters {
                reason: "gene_annotation_resource is set but organism_info.database is not"
                    .to_string(),
            }),
            (None, Some(_)) => Err(DgeError::InvalidParameters {
                reason: "organism_info.database is set but gene_annotation_resource is not"
                    .to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Annotation lookup settings, when both database and key type are given
    pub fn annotation(&self) -> Option<AnnotationConfig> {
        match (&self.gene_annotation_resource, &self.organism_info.database) {
            (Some(keytype), Some(database)) => Some(AnnotationConfig {
                database: database.clone(),
                keytype: keytype.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_json_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"padj_alpha": 0.01, "fold_change_threshold": 1.5, "output_dir": "out"}}"#
        )
        .unwrap();

        let params = RunParameters::from_json_file(file.path()).unwrap();
        assert_eq!(params.padj_alpha, 0.01);
        assert_eq!(params.fold_change_threshold, 1.5);
        assert_eq!(params.low_count_threshold, 2);
        assert_eq!(params.error_mode, ErrorMode::FailFast);
        assert!(!params.parallel_contrasts);
        assert!(params.annotation().is_none());
        params.validate().unwrap();
    }

    #[test]
    fn test_annotation_from_json() {
        let params: RunParameters = serde_json::from_str(
            r#"{
                "output_dir": "out",
                "gene_annotation_resource": "ENSEMBL",
                "organism_info": {"database": "org.Mm.eg.db"},
                "error_mode": "continue_on_error"
            }"#,
        )
        .unwrap();

        assert_eq!(
            params.annotation(),
            Some(AnnotationConfig {
                database: "org.Mm.eg.db".to_string(),
                keytype: "ENSEMBL".to_string(),
            })
        );
        assert_eq!(params.error_mode, ErrorMode::ContinueOnError);
    }

    #[test]
    fn test_validate_rejects() {
        let mut params = RunParameters::new("out");
        params.padj_alpha = 0.0;
        assert!(params.validate().is_err());

        let mut params = RunParameters::new("out");
        params.fold_change_threshold = f64::NAN;
        assert!(params.validate().is_err());

        let mut params = RunParameters::new("out");
        params.gene_annotation_resource = Some("ENSEMBL".to_string());
        assert!(params.validate().is_err());
    }
}
