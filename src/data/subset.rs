//! Per-contrast sample subsetting

use super::{Contrast, CountMatrix, SampleSheet};
use crate::error::{DgeError, Result};

/// Count columns for one contrast, treatment samples first
#[derive(Debug, Clone)]
pub struct ContrastSubset {
    /// Counts restricted to treatment then control samples
    pub counts: CountMatrix,
    /// Treatment sample IDs in sample-sheet order
    pub treatment_samples: Vec<String>,
    /// Control sample IDs in sample-sheet order
    pub control_samples: Vec<String>,
}

/// Extract the treatment and control columns of a contrast from the full matrix
///
/// Neither input is modified. Fails with a configuration error when a group
/// has no samples, when both sides name the same group, or when a sample of
/// either group is absent from the count matrix.
pub fn subset_for_contrast(
    counts: &CountMatrix,
    samples: &SampleSheet,
    contrast: &Contrast,
) -> Result<ContrastSubset> {
    let label = contrast.label();

    if contrast.treatment == contrast.control {
        return Err(DgeError::configuration(
            &label,
            "treatment and control refer to the same group",
        ));
    }

    let treatment_samples = samples.samples_in_group(&contrast.treatment);
    if treatment_samples.is_empty() {
        return Err(DgeError::configuration(
            &label,
            format!("treatment group '{}' has no samples", contrast.treatment),
        ));
    }

    let control_samples = samples.samples_in_group(&contrast.control);
    if control_samples.is_empty() {
        return Err(DgeError::configuration(
            &label,
            format!("control group '{}' has no samples", contrast.control),
        ));
    }

    let ordered: Vec<&String> = treatment_samples.iter().chain(control_samples.iter()).collect();
    let subset = counts
        .select_samples(&ordered)
        .map_err(|e| DgeError::configuration(&label, e.to_string()))?;

    Ok(ContrastSubset {
        counts: subset,
        treatment_samples,
        control_samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fixture() -> (CountMatrix, SampleSheet) {
        let counts = CountMatrix::new(
            array![[1.0, 2.0, 3.0, 4.0, 5.0], [6.0, 7.0, 8.0, 9.0, 10.0]],
            vec!["g1".to_string(), "g2".to_string()],
            ["C1", "T1", "X1", "C2", "T2"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        let sheet = SampleSheet::from_pairs(vec![
            ("C1", "ctrl"),
            ("T1", "trt"),
            ("X1", "other"),
            ("C2", "ctrl"),
            ("T2", "trt"),
        ])
        .unwrap();
        (counts, sheet)
    }

    #[test]
    fn test_treatment_columns_first() {
        let (counts, sheet) = fixture();
        let subset = subset_for_contrast(&counts, &sheet, &Contrast::new("trt", "ctrl")).unwrap();

        assert_eq!(subset.counts.n_samples(), 4);
        assert_eq!(subset.counts.sample_ids(), &["T1", "T2", "C1", "C2"]);
        assert_eq!(subset.treatment_samples, vec!["T1", "T2"]);
        assert_eq!(subset.control_samples, vec!["C1", "C2"]);
        assert_eq!(subset.counts.gene_counts(0).to_vec(), vec![2.0, 5.0, 1.0, 4.0]);
        assert_eq!(subset.counts.gene_ids(), counts.gene_ids());
    }

    #[test]
    fn test_subset_is_reproducible() {
        let (counts, sheet) = fixture();
        let contrast = Contrast::new("trt", "ctrl");
        let a = subset_for_contrast(&counts, &sheet, &contrast).unwrap();
        let b = subset_for_contrast(&counts, &sheet, &contrast).unwrap();
        assert_eq!(a.counts, b.counts);
    }

    #[test]
    fn test_empty_group_is_configuration_error() {
        let (counts, sheet) = fixture();
        let err = subset_for_contrast(&counts, &sheet, &Contrast::new("trt", "nobody")).unwrap_err();
        match err {
            DgeError::Configuration { contrast, reason } => {
                assert_eq!(contrast, "trt__vs__nobody");
                assert!(reason.contains("nobody"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sample_missing_from_matrix_is_configuration_error() {
        let (counts, _) = fixture();
        let sheet = SampleSheet::from_pairs(vec![("T1", "trt"), ("GHOST", "ctrl")]).unwrap();
        let err = subset_for_contrast(&counts, &sheet, &Contrast::new("trt", "ctrl")).unwrap_err();
        assert!(matches!(err, DgeError::Configuration { .. }));
    }
}
