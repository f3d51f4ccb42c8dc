use ndarray::{Array1, Array2, Axis};

use crate::error::{EigenfaceError, Result};

/// Centers `data_matrix` in place by subtracting its column-wise mean and returns that mean.
///
/// # Errors
/// Returns `EmptyInput` if the matrix has zero samples or zero features.
pub(crate) fn center_in_place(data_matrix: &mut Array2<f64>) -> Result<Array1<f64>> {
    if data_matrix.nrows() == 0 || data_matrix.ncols() == 0 {
        return Err(EigenfaceError::EmptyInput(format!(
            "sample matrix has shape {}x{}; at least one sample and one feature are required",
            data_matrix.nrows(),
            data_matrix.ncols()
        )));
    }
    let mean_vector = data_matrix
        .mean_axis(Axis(0))
        .ok_or_else(|| EigenfaceError::EmptyInput("failed to compute column means".into()))?;
    *data_matrix -= &mean_vector;
    Ok(mean_vector)
}

/// Centers a sample matrix by subtracting the mean face.
///
/// Returns `(centered, mean)` where `mean` is the column-wise average (length D) and
/// `centered = data_matrix - mean` broadcast over rows. The input is left untouched.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use eigenfaces::normalize;
///
/// let faces = array![[1.0, 2.0], [3.0, 6.0]];
/// let (centered, mean) = normalize(&faces).unwrap();
/// assert_eq!(mean, array![2.0, 4.0]);
/// assert_eq!(centered, array![[-1.0, -2.0], [1.0, 2.0]]);
/// ```
pub fn normalize(data_matrix: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    let mut centered = data_matrix.to_owned();
    let mean_vector = center_in_place(&mut centered)?;
    Ok((centered, mean_vector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn centered_columns_have_zero_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let data = Array2::from_shape_fn((17, 9), |_| rng.gen_range(0.0..255.0));
        let (centered, mean) = normalize(&data).unwrap();

        assert_eq!(mean.len(), 9);
        for column in centered.columns() {
            assert_abs_diff_eq!(column.sum() / column.len() as f64, 0.0, epsilon = 1e-10);
        }
        // centered + mean gives back the input
        for (row_c, row_d) in centered.rows().into_iter().zip(data.rows()) {
            for j in 0..9 {
                assert_abs_diff_eq!(row_c[j] + mean[j], row_d[j], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn single_sample_centers_to_zero() {
        let data = array![[5.0, -1.0, 3.5]];
        let (centered, mean) = normalize(&data).unwrap();
        assert_eq!(mean, array![5.0, -1.0, 3.5]);
        assert!(centered.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_input_is_rejected() {
        let no_rows = Array2::<f64>::zeros((0, 4));
        assert!(matches!(normalize(&no_rows), Err(EigenfaceError::EmptyInput(_))));

        let no_cols = Array2::<f64>::zeros((3, 0));
        assert!(matches!(normalize(&no_cols), Err(EigenfaceError::EmptyInput(_))));
    }
}
