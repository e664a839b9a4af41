//! Mapping of engine-native tables into the canonical result schema

use std::cmp::Ordering;

use crate::engine::{ExactTestRow, GlmRow, NativeTable};
use crate::io::{DeRecord, DeTable};

/// Adjusted p-value stored when the engine left it unresolved
pub const UNRESOLVED_PADJ: f64 = 1.0;

/// Convert a native table to canonical rows sorted by raw p-value
///
/// Missing adjusted p-values become 1. Sorting is stable and ascending;
/// rows without a p-value go last. `gene_annotation` is left empty for the
/// annotator. The input is not modified, so repeated calls agree.
pub fn harmonize(native: &NativeTable) -> DeTable {
    let mut records: Vec<DeRecord> = match native {
        NativeTable::Glm(rows) => rows.iter().map(from_glm).collect(),
        NativeTable::ExactTest(rows) => rows.iter().map(from_exact_test).collect(),
    };
    records.sort_by(|a, b| compare_pvalues(a.pvalue, b.pvalue));
    DeTable::new(records)
}

fn from_glm(row: &GlmRow) -> DeRecord {
    DeRecord {
        gene_id: row.gene_id.clone(),
        base_mean: row.base_mean,
        base_mean_treatment: row.base_mean_treatment,
        base_mean_control: row.base_mean_control,
        log2_fold_change: row.log2_fold_change,
        lfc_se: row.lfc_se,
        stat: row.stat,
        log_cpm: None,
        pvalue: row.pvalue,
        padj: resolve_padj(row.padj),
        gene_annotation: None,
    }
}

fn from_exact_test(row: &ExactTestRow) -> DeRecord {
    DeRecord {
        gene_id: row.gene_id.clone(),
        base_mean: row.base_mean,
        base_mean_treatment: row.base_mean_treatment,
        base_mean_control: row.base_mean_control,
        log2_fold_change: row.log_fc,
        lfc_se: None,
        stat: None,
        log_cpm: row.log_cpm,
        pvalue: row.pvalue,
        padj: resolve_padj(row.fdr),
        gene_annotation: None,
    }
}

fn resolve_padj(padj: Option<f64>) -> f64 {
    match padj {
        Some(p) if !p.is_nan() => p,
        _ => UNRESOLVED_PADJ,
    }
}

fn compare_pvalues(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glm_row(gene_id: &str, pvalue: Option<f64>, padj: Option<f64>) -> GlmRow {
        GlmRow {
            gene_id: gene_id.to_string(),
            base_mean: Some(10.0),
            log2_fold_change: Some(1.0),
            lfc_se: Some(0.3),
            stat: Some(3.0),
            pvalue,
            padj,
            base_mean_treatment: Some(12.0),
            base_mean_control: Some(8.0),
        }
    }

    fn exact_row(gene_id: &str, pvalue: f64, fdr: Option<f64>) -> ExactTestRow {
        ExactTestRow {
            gene_id: gene_id.to_string(),
            log_fc: Some(-0.5),
            log_cpm: Some(6.0),
            pvalue: Some(pvalue),
            fdr,
            base_mean: Some(20.0),
            base_mean_treatment: Some(17.0),
            base_mean_control: Some(23.0),
        }
    }

    #[test]
    fn test_missing_padj_becomes_one() {
        let table = harmonize(&NativeTable::Glm(vec![
            glm_row("g1", Some(0.01), None),
            glm_row("g2", Some(0.02), Some(0.04)),
        ]));
        assert_eq!(table.get("g1").unwrap().padj, 1.0);
        assert_eq!(table.get("g2").unwrap().padj, 0.04);
    }

    #[test]
    fn test_sorted_by_raw_pvalue_stable() {
        let table = harmonize(&NativeTable::Glm(vec![
            glm_row("late", Some(0.5), Some(0.9)),
            glm_row("untested", None, None),
            glm_row("tie_a", Some(0.01), Some(0.1)),
            glm_row("tie_b", Some(0.01), Some(0.1)),
            glm_row("first", Some(1e-9), Some(1e-8)),
        ]));
        assert_eq!(
            table.gene_ids(),
            vec!["first", "tie_a", "tie_b", "late", "untested"]
        );
    }

    #[test]
    fn test_column_identity_across_engines() {
        let glm = harmonize(&NativeTable::Glm(vec![glm_row("g", Some(0.1), Some(0.2))]));
        let exact = harmonize(&NativeTable::ExactTest(vec![exact_row("g", 0.1, None)]));

        let g = &glm.records[0];
        assert_eq!(g.log_cpm, None);
        assert!(g.lfc_se.is_some() && g.stat.is_some());

        let e = &exact.records[0];
        assert_eq!((e.lfc_se, e.stat), (None, None));
        assert_eq!(e.log_cpm, Some(6.0));
        assert_eq!(e.log2_fold_change, Some(-0.5));
        assert_eq!(e.base_mean_treatment, Some(17.0));
        assert_eq!(e.padj, 1.0);
    }

    #[test]
    fn test_harmonize_is_pure() {
        let native = NativeTable::ExactTest(vec![
            exact_row("b", 0.3, Some(0.6)),
            exact_row("a", 0.3, None),
            exact_row("c", 0.001, Some(0.003)),
        ]);
        let before = native.clone();
        assert_eq!(harmonize(&native), harmonize(&native));
        assert_eq!(native, before);
    }
}
