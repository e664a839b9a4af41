//! Canonical differential expression result tables

use serde::{Deserialize, Serialize};

/// One gene's harmonized differential expression statistics
///
/// Fields an engine does not produce stay `None`. `padj` is always defined:
/// unresolved adjusted p-values are stored as 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeRecord {
    pub gene_id: String,
    /// Mean normalized expression over all samples of the contrast
    pub base_mean: Option<f64>,
    /// Mean normalized expression over treatment samples
    pub base_mean_treatment: Option<f64>,
    /// Mean normalized expression over control samples
    pub base_mean_control: Option<f64>,
    /// Log2 fold change, treatment relative to control
    pub log2_fold_change: Option<f64>,
    /// Standard error of the log2 fold change (GLM engine)
    pub lfc_se: Option<f64>,
    /// Wald statistic (GLM engine)
    pub stat: Option<f64>,
    /// Average log2 counts per million (exact-test engine)
    pub log_cpm: Option<f64>,
    /// Raw p-value
    pub pvalue: Option<f64>,
    /// Adjusted p-value
    pub padj: f64,
    /// Human-readable gene symbol, when resolved
    pub gene_annotation: Option<String>,
}

impl DeRecord {
    /// Raw p-value strictly below `alpha`; missing p-values never pass
    pub fn passes_pvalue(&self, alpha: f64) -> bool {
        matches!(self.pvalue, Some(p) if p < alpha)
    }

    /// Log2 fold change strictly above `threshold`
    pub fn passes_fold_change(&self, threshold: f64) -> bool {
        matches!(self.log2_fold_change, Some(lfc) if lfc > threshold)
    }
}

/// A canonical result table, one row per gene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeTable {
    pub records: Vec<DeRecord>,
}

impl DeTable {
    pub fn new(records: Vec<DeRecord>) -> Self {
        Self { records }
    }

    /// Get number of genes
    pub fn n_genes(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gene identifiers in table order
    pub fn gene_ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.gene_id.as_str()).collect()
    }

    /// Find the row of a gene
    pub fn get(&self, gene_id: &str) -> Option<&DeRecord> {
        self.records.iter().find(|r| r.gene_id == gene_id)
    }

    /// Rows satisfying a predicate, order preserved
    pub fn filtered<F>(&self, predicate: F) -> DeTable
    where
        F: Fn(&DeRecord) -> bool,
    {
        DeTable::new(self.records.iter().filter(|r| predicate(r)).cloned().collect())
    }

    /// Summary statistics
    pub fn summary(&self, alpha: f64, fc_threshold: f64) -> ResultsSummary {
        let significant: Vec<&DeRecord> =
            self.records.iter().filter(|r| r.passes_pvalue(alpha)).collect();

        ResultsSummary {
            total_genes: self.n_genes(),
            genes_tested: self.records.iter().filter(|r| r.pvalue.is_some()).count(),
            significant: significant.len(),
            above_fc_threshold: significant
                .iter()
                .filter(|r| r.passes_fold_change(fc_threshold))
                .count(),
            upregulated: significant
                .iter()
                .filter(|r| r.passes_fold_change(0.0))
                .count(),
            downregulated: significant
                .iter()
                .filter(|r| matches!(r.log2_fold_change, Some(lfc) if lfc < 0.0))
                .count(),
            alpha,
            fc_threshold,
        }
    }
}

/// Summary of one engine's results for one contrast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub total_genes: usize,
    pub genes_tested: usize,
    pub significant: usize,
    pub above_fc_threshold: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub alpha: f64,
    pub fc_threshold: f64,
}

impl std::fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} genes ({} tested), {} with pvalue < {} ({} up, {} down), {} with log2FC > {}",
            self.total_genes,
            self.genes_tested,
            self.significant,
            self.alpha,
            self.upregulated,
            self.downregulated,
            self.above_fc_threshold,
            self.fc_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(gene_id: &str, lfc: Option<f64>, pvalue: Option<f64>) -> DeRecord {
        DeRecord {
            gene_id: gene_id.to_string(),
            base_mean: None,
            base_mean_treatment: None,
            base_mean_control: None,
            log2_fold_change: lfc,
            lfc_se: None,
            stat: None,
            log_cpm: None,
            pvalue,
            padj: 1.0,
            gene_annotation: None,
        }
    }

    #[test]
    fn test_missing_values_never_pass() {
        let r = record("g", None, None);
        assert!(!r.passes_pvalue(1.0));
        assert!(!r.passes_fold_change(-100.0));
    }

    #[test]
    fn test_summary_counts() {
        let table = DeTable::new(vec![
            record("up", Some(2.0), Some(0.001)),
            record("up_small", Some(0.5), Some(0.01)),
            record("down", Some(-3.0), Some(0.02)),
            record("ns", Some(4.0), Some(0.5)),
            record("untested", None, None),
        ]);

        let summary = table.summary(0.05, 1.0);
        assert_eq!(summary.total_genes, 5);
        assert_eq!(summary.genes_tested, 4);
        assert_eq!(summary.significant, 3);
        assert_eq!(summary.above_fc_threshold, 1);
        assert_eq!(summary.upregulated, 2);
        assert_eq!(summary.downregulated, 1);
        assert!(summary.to_string().contains("3 with pvalue < 0.05"));
    }
}
