//! Per-contrast output directories and result files

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::csv::{format_optional_f64, GENE_ID_COLUMN};
use super::results::DeTable;
use crate::data::Contrast;
use crate::error::{DgeError, Result};
use crate::filter::SignificanceTiers;

/// Column order of every result file, identical for both engines
pub const RESULT_COLUMNS: [&str; 11] = [
    GENE_ID_COLUMN,
    "baseMean",
    "baseMean_treatment",
    "baseMean_control",
    "log2FoldChange",
    "lfcSE",
    "stat",
    "logCPM",
    "pvalue",
    "padj",
    "gene_annotation",
];

/// File tags of the three tiers: full, p-value filtered, fold-change filtered
pub fn tier_tags(alpha: f64, fc_threshold: f64) -> [String; 3] {
    [
        "full_dge".to_string(),
        format!("padj={}_filtered_dge", alpha),
        format!("fc={}_padj={}_filtered_dge", fc_threshold, alpha),
    ]
}

/// Output directory of one contrast
///
/// The directory is created fresh; an existing directory is never reused, so
/// results of different runs cannot mix.
#[derive(Debug)]
pub struct ContrastOutput {
    path: PathBuf,
}

impl ContrastOutput {
    /// Create `{root}/{treatment}__vs__{control}`
    ///
    /// The output root is created when missing. Fails with
    /// [`DgeError::OutputCollision`] when the contrast directory exists.
    pub fn create(root: &Path, contrast: &Contrast) -> Result<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(contrast.label());

        match fs::create_dir(&path) {
            Ok(()) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(DgeError::OutputCollision { path })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one table as `{engine}_{tag}.tsv`
    pub fn write_table(&self, engine: &str, tag: &str, table: &DeTable) -> Result<PathBuf> {
        let file_path = self.path.join(format!("{}_{}.tsv", engine, tag));
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&file_path)?;

        writer.write_record(RESULT_COLUMNS)?;
        for r in &table.records {
            writer.write_record([
                r.gene_id.clone(),
                format_optional_f64(r.base_mean),
                format_optional_f64(r.base_mean_treatment),
                format_optional_f64(r.base_mean_control),
                format_optional_f64(r.log2_fold_change),
                format_optional_f64(r.lfc_se),
                format_optional_f64(r.stat),
                format_optional_f64(r.log_cpm),
                format_optional_f64(r.pvalue),
                format_optional_f64(Some(r.padj)),
                r.gene_annotation.clone().unwrap_or_default(),
            ])?;
        }

        writer.flush()?;
        Ok(file_path)
    }

    /// Write the three tiers of one engine
    pub fn write_tiers(
        &self,
        engine: &str,
        tiers: &SignificanceTiers,
        alpha: f64,
        fc_threshold: f64,
    ) -> Result<Vec<PathBuf>> {
        let tags = tier_tags(alpha, fc_threshold);
        let tables = [&tiers.full, &tiers.padj_filtered, &tiers.fc_filtered];

        tables
            .iter()
            .zip(tags.iter())
            .map(|(table, tag)| self.write_table(engine, tag, table))
            .collect()
    }

    /// Remove the directory if nothing was written into it
    pub fn remove_if_empty(&self) -> Result<bool> {
        if fs::read_dir(&self.path)?.next().is_none() {
            fs::remove_dir(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }
}
