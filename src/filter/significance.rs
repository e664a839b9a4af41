//! Tiered significance filtering of harmonized results

use crate::io::DeTable;

/// The three nested result tiers written for each engine
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceTiers {
    /// Every harmonized row
    pub full: DeTable,
    /// Rows with raw pvalue < alpha
    pub padj_filtered: DeTable,
    /// Rows with raw pvalue < alpha and log2FoldChange > threshold
    pub fc_filtered: DeTable,
}

/// Split a harmonized table into full / p-value / fold-change tiers
///
/// The "padj" tier filters on the raw p-value, not on `padj`; output file
/// names keep the historical `padj=` tag. The fold-change tier is one-sided:
/// only genes over-expressed in treatment pass. Row order is preserved, so
/// `fc_filtered ⊆ padj_filtered ⊆ full`.
pub fn significance_tiers(table: &DeTable, alpha: f64, fc_threshold: f64) -> SignificanceTiers {
    let padj_filtered = table.filtered(|r| r.passes_pvalue(alpha));
    let fc_filtered = padj_filtered.filtered(|r| r.passes_fold_change(fc_threshold));

    SignificanceTiers {
        full: table.clone(),
        padj_filtered,
        fc_filtered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::DeRecord;
    use std::collections::HashSet;

    fn record(gene_id: &str, lfc: f64, pvalue: f64, padj: f64) -> DeRecord {
        DeRecord {
            gene_id: gene_id.to_string(),
            base_mean: None,
            base_mean_treatment: None,
            base_mean_control: None,
            log2_fold_change: Some(lfc),
            lfc_se: None,
            stat: None,
            log_cpm: None,
            pvalue: Some(pvalue),
            padj,
            gene_annotation: None,
        }
    }

    fn table() -> DeTable {
        DeTable::new(vec![
            record("up", 3.0, 0.001, 0.004),
            record("down", -3.0, 0.002, 0.004),
            record("edge_fc", 1.0, 0.003, 0.004),
            record("raw_only", 2.0, 0.04, 0.2),
            record("ns", 5.0, 0.5, 0.9),
        ])
    }

    #[test]
    fn test_tiers() {
        let tiers = significance_tiers(&table(), 0.05, 1.0);
        assert_eq!(tiers.full.n_genes(), 5);
        assert_eq!(
            tiers.padj_filtered.gene_ids(),
            vec!["up", "down", "edge_fc", "raw_only"]
        );
        // Strictly greater, one-sided
        assert_eq!(tiers.fc_filtered.gene_ids(), vec!["up", "raw_only"]);
    }

    #[test]
    fn test_padj_tier_uses_raw_pvalue() {
        // raw_only has padj 0.2 but raw pvalue 0.04; the tier keeps it
        let tiers = significance_tiers(&table(), 0.05, 1.0);
        assert!(tiers.padj_filtered.get("raw_only").is_some());
    }

    #[test]
    fn test_tier_containment() {
        for &(alpha, fc) in &[(0.05, 1.0), (0.01, 0.0), (1.0, -10.0), (0.0, 0.0)] {
            let tiers = significance_tiers(&table(), alpha, fc);
            let full: HashSet<&str> = tiers.full.gene_ids().into_iter().collect();
            let padj: HashSet<&str> = tiers.padj_filtered.gene_ids().into_iter().collect();
            let fc_set: HashSet<&str> = tiers.fc_filtered.gene_ids().into_iter().collect();
            assert!(fc_set.is_subset(&padj));
            assert!(padj.is_subset(&full));
        }
    }
}
