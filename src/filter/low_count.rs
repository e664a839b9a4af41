//! Low-count gene filtering on CPM-normalized expression

use ndarray::Axis;

use crate::data::CountMatrix;
use crate::error::Result;
use crate::normalization::cpm;

/// Default minimum number of samples with CPM > 1
pub const DEFAULT_MIN_SAMPLES: usize = 2;

/// Keep genes with CPM > 1 in at least `min_samples` samples
///
/// CPM only decides which genes pass; the returned matrix holds the raw counts
/// of the retained genes with the input's column order. `min_samples == 0`
/// keeps every gene; a threshold above the sample count is capped at it.
pub fn filter_low_counts(counts: &CountMatrix, min_samples: usize) -> Result<CountMatrix> {
    if min_samples == 0 {
        return Ok(counts.clone());
    }

    let min_samples = min_samples.min(counts.n_samples());
    let normalized = cpm(counts.counts());
    let keep: Vec<usize> = normalized
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| row.iter().filter(|&&x| x > 1.0).count() >= min_samples)
        .map(|(i, _)| i)
        .collect();

    log::debug!(
        "Low-count filter kept {} of {} genes (CPM > 1 in >= {} samples)",
        keep.len(),
        counts.n_genes(),
        min_samples
    );

    counts.subset_genes(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn matrix() -> CountMatrix {
        // Library sizes are ~1e3, so any count >= 1 is well above 1 CPM
        CountMatrix::new(
            array![
                [500.0, 400.0, 300.0, 200.0],
                [10.0, 0.0, 0.0, 0.0],
                [10.0, 10.0, 0.0, 0.0],
                [10.0, 10.0, 10.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
            ],
            ["full", "one", "two", "three", "none"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_default_threshold() {
        let filtered = filter_low_counts(&matrix(), DEFAULT_MIN_SAMPLES).unwrap();
        assert_eq!(filtered.gene_ids(), &["full", "two", "three"]);
        assert_eq!(filtered.sample_ids(), matrix().sample_ids());
        // Raw counts are kept, not CPM values
        assert_eq!(filtered.gene_counts(1).to_vec(), vec![10.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_threshold_keeps_everything() {
        let filtered = filter_low_counts(&matrix(), 0).unwrap();
        assert_eq!(filtered, matrix());
    }

    #[test]
    fn test_threshold_at_sample_count_requires_every_sample() {
        let filtered = filter_low_counts(&matrix(), 4).unwrap();
        assert_eq!(filtered.gene_ids(), &["full"]);
        let beyond = filter_low_counts(&matrix(), 9).unwrap();
        assert_eq!(beyond.gene_ids(), &["full"]);
    }

    #[test]
    fn test_monotonic_in_threshold() {
        let m = matrix();
        let mut previous: Vec<String> = m.gene_ids().to_vec();
        for threshold in 0..=5 {
            let kept = filter_low_counts(&m, threshold).unwrap().gene_ids().to_vec();
            assert!(kept.iter().all(|g| previous.contains(g)));
            previous = kept;
        }
    }
}
