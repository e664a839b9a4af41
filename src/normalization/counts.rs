//! Counts-per-million normalization

use ndarray::{Array2, ArrayView2, Axis};

/// Calculate counts per million (CPM)
///
/// Each column is scaled by its library size (column sum):
///   CPM = counts * 1e6 / colSums(counts)
///
/// Columns with an empty library yield zeros rather than NaN, so they never
/// count as expressed. Column order is the input column order.
pub fn cpm(counts: ArrayView2<f64>) -> Array2<f64> {
    let library_sizes: Vec<f64> = counts
        .axis_iter(Axis(1))
        .map(|col| col.sum())
        .collect();

    let mut result = counts.to_owned();
    for (j, mut col) in result.axis_iter_mut(Axis(1)).enumerate() {
        let lib_size = library_sizes[j];
        if lib_size > 0.0 {
            col.mapv_inplace(|x| x * 1e6 / lib_size);
        } else {
            col.fill(0.0);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_cpm() {
        let counts = array![[100.0, 200.0], [300.0, 400.0]];
        let result = cpm(counts.view());

        // colSums = [400, 600]
        assert_relative_eq!(result[[0, 0]], 250_000.0);
        assert_relative_eq!(result[[1, 0]], 750_000.0);
        assert_relative_eq!(result[[0, 1]], 200.0 * 1e6 / 600.0);
        for col in result.axis_iter(Axis(1)) {
            assert_relative_eq!(col.sum(), 1e6, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_cpm_empty_library() {
        let counts = array![[0.0, 5.0], [0.0, 5.0]];
        let result = cpm(counts.view());
        assert_eq!(result[[0, 0]], 0.0);
        assert_eq!(result[[1, 0]], 0.0);
        assert_relative_eq!(result[[0, 1]], 500_000.0);
    }
}
