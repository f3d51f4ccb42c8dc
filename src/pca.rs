// Principal component analysis through the compact (Gram matrix) trick

use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{EigenfaceError, Result};
use crate::linalg_backends::{BackendEigh, LinAlgBackendProvider};
use crate::normalize::center_in_place;

/// Eigenvalues of the Gram matrix at or below this fraction of the largest one are
/// treated as zero variance. Their eigenfaces have no usable direction and are dropped.
const RELATIVE_EIGENVALUE_TOLERANCE: f64 = 1e-10;

/// Principal component analysis (PCA) structure.
///
/// Holds the requested number of components and, once fitted, the mean face, the
/// eigenfaces (one per row of `components`) and the variance each of them explains.
/// Models can be saved to and loaded from files.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PCA {
    /// Requested number of components. `None` or `Some(0)` keeps every available one.
    n_components: Option<usize>,
    /// Mean vector of the training data.
    /// Shape: (n_features)
    mean: Option<Array1<f64>>,
    /// Unit-norm eigenfaces ordered by descending eigenvalue.
    /// Shape: (k_components, n_features)
    components: Option<Array2<f64>>,
    /// Eigenvalues of the Gram matrix X_c X_c^T / N for the kept components.
    /// Shape: (k_components)
    explained_variance: Option<Array1<f64>>,
    /// Kept eigenvalues divided by the sum of all N eigenvalues.
    /// Shape: (k_components)
    explained_variance_ratio: Option<Array1<f64>>,
}

impl Default for PCA {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PCA {
    /// Creates a new, unfitted PCA.
    ///
    /// `n_components` caps the number of eigenfaces kept by `fit`; `None` (or `Some(0)`)
    /// keeps all of them.
    ///
    /// # Examples
    ///
    /// ```
    /// use eigenfaces::PCA;
    /// let pca = PCA::new(Some(20));
    /// assert_eq!(pca.n_components(), Some(20));
    /// assert!(pca.components().is_none());
    /// ```
    pub fn new(n_components: Option<usize>) -> Self {
        Self {
            n_components,
            mean: None,
            components: None,
            explained_variance: None,
            explained_variance_ratio: None,
        }
    }

    /// Returns the requested number of components this model was configured with.
    pub fn n_components(&self) -> Option<usize> {
        self.n_components
    }

    /// Returns the mean face of the training data, if fitted.
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Returns the eigenfaces, shape (k_components, n_features), if fitted.
    pub fn components(&self) -> Option<&Array2<f64>> {
        self.components.as_ref()
    }

    /// Returns the eigenvalues associated with each kept component, if fitted.
    pub fn explained_variance(&self) -> Option<&Array1<f64>> {
        self.explained_variance.as_ref()
    }

    /// Returns the fraction of the total variance captured by each kept component, if fitted.
    pub fn explained_variance_ratio(&self) -> Option<&Array1<f64>> {
        self.explained_variance_ratio.as_ref()
    }

    /// Returns how many components the fitted model actually kept.
    pub fn n_components_fitted(&self) -> Option<usize> {
        self.components.as_ref().map(|c| c.nrows())
    }

    /// Fits the eigenfaces to `data_matrix` (shape n_samples x n_features).
    ///
    /// The data is re-centered internally, so passing already centered data is safe.
    /// Instead of the n_features x n_features covariance, the much smaller
    /// n_samples x n_samples matrix `C = X_c X_c^T / N` is eigendecomposed; an
    /// eigenvector `v` of `C` maps to the eigenface `X_c^T v`, normalized to unit length.
    ///
    /// The number of kept components is `min(n_components, n_samples)`, further reduced
    /// to the numerical rank of `C`: zero-variance directions are dropped (with a warning)
    /// so that every stored component has unit norm. Data with no variance at all
    /// (a single sample, or identical samples) yields a model with zero components.
    ///
    /// Each component is oriented so that its largest-magnitude entry is positive.
    ///
    /// # Errors
    /// Returns an error if the input has zero samples or features, contains non-finite
    /// values, or if the eigendecomposition fails. On error the previous state is not
    /// guaranteed to be preserved.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use eigenfaces::PCA;
    ///
    /// let faces = array![
    ///     [1.0, 2.0, 3.0],
    ///     [2.0, 4.0, 1.0],
    ///     [3.0, 1.0, 2.0]
    /// ];
    ///
    /// let mut pca = PCA::new(Some(1));
    /// pca.fit(faces).unwrap();
    /// assert_eq!(pca.components().unwrap().dim(), (1, 3));
    /// ```
    pub fn fit(&mut self, mut data_matrix: Array2<f64>) -> Result<()> {
        let n_samples = data_matrix.nrows();
        let n_features = data_matrix.ncols();
        let fit_start_time = std::time::Instant::now();

        if data_matrix.iter().any(|v| !v.is_finite()) {
            return Err(EigenfaceError::NonFiniteInput(
                "sample matrix contains NaN or infinite values".into(),
            ));
        }
        let max_abs_input = data_matrix.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));

        let mean_vector = center_in_place(&mut data_matrix)?;
        let centered = data_matrix;

        info!(
            "Fitting PCA on {} samples x {} features (requested components: {:?})",
            n_samples, n_features, self.n_components
        );

        // Rounding in the mean leaves residue of this order in otherwise constant columns.
        let noise_floor = n_samples as f64 * f64::EPSILON * max_abs_input;
        if centered.iter().all(|v| v.abs() <= noise_floor) {
            warn!("Input has no variance; the fitted model keeps zero components.");
            self.mean = Some(mean_vector);
            self.components = Some(Array2::zeros((0, n_features)));
            self.explained_variance = Some(Array1::zeros(0));
            self.explained_variance_ratio = Some(Array1::zeros(0));
            return Ok(());
        }

        // The N x N matrix only lives for the duration of the decomposition.
        let decomposition = {
            let mut gram_matrix = centered.dot(&centered.t());
            gram_matrix /= n_samples as f64;
            LinAlgBackendProvider::new()
                .eigh_upper(&gram_matrix)
                .map_err(|e| EigenfaceError::Eigendecomposition(e.to_string()))?
        };
        let eigenvalues = decomposition.eigenvalues;
        let eigenvectors = decomposition.eigenvectors;

        // Descending, stable for ties
        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

        // Negative eigenvalues can only come from rounding.
        let sorted_eigenvalues: Vec<f64> = order.iter().map(|&i| eigenvalues[i].max(0.0)).collect();
        let total_variance: f64 = sorted_eigenvalues.iter().sum();
        debug!("Gram matrix spectrum (descending): {:?}", sorted_eigenvalues);

        let requested = match self.n_components {
            Some(k) if k > 0 => k.min(n_samples),
            _ => n_samples,
        };
        let largest_eigval = sorted_eigenvalues.first().copied().unwrap_or(0.0);
        let numerical_rank = sorted_eigenvalues
            .iter()
            .take_while(|&&v| v > largest_eigval * RELATIVE_EIGENVALUE_TOLERANCE)
            .count();
        let k_components = requested.min(numerical_rank);
        if k_components < requested {
            warn!(
                "Dropping {} zero-variance component(s): numerical rank is {}, {} requested.",
                requested - k_components,
                numerical_rank,
                requested
            );
        }

        let mut top_eigvecs = Array2::<f64>::zeros((n_samples, k_components));
        for (dst, &src) in order.iter().take(k_components).enumerate() {
            top_eigvecs.column_mut(dst).assign(&eigenvectors.column(src));
        }

        // Eigenfaces: X_c^T v for each kept eigenvector, shape D x K
        let mut eigenfaces = centered.t().dot(&top_eigvecs);
        for mut column in eigenfaces.columns_mut() {
            // ||X_c^T v||^2 = N * lambda, bounded away from zero by the rank cut above.
            let norm_value = column.dot(&column).sqrt();
            column.mapv_inplace(|x| x / norm_value);
            orient_by_largest_entry(column);
        }
        let components = eigenfaces.reversed_axes().as_standard_layout().into_owned();

        let kept_eigenvalues = Array1::from(sorted_eigenvalues[..k_components].to_vec());
        let ratios = kept_eigenvalues.mapv(|v| v / total_variance);
        debug!("Explained variance ratios: {:?}", ratios);

        self.mean = Some(mean_vector);
        self.components = Some(components);
        self.explained_variance = Some(kept_eigenvalues);
        self.explained_variance_ratio = Some(ratios);

        info!(
            "Fitted {} component(s) in {:?}",
            k_components,
            fit_start_time.elapsed()
        );
        Ok(())
    }

    /// Projects `x` (shape m_samples x n_features) onto the learned eigenfaces.
    ///
    /// Returns the subspace coordinates, shape (m_samples, k_components).
    /// `x` is consumed and centered in place.
    ///
    /// # Errors
    /// `NotFitted` before `fit`; `DimensionMismatch` if `x` does not have the
    /// model's number of features.
    pub fn transform(&self, mut x: Array2<f64>) -> Result<Array2<f64>> {
        let (mean_vector, components) = self.fitted()?;
        if x.ncols() != mean_vector.len() {
            return Err(EigenfaceError::DimensionMismatch {
                context: "transform input features",
                expected: mean_vector.len(),
                got: x.ncols(),
            });
        }
        x -= mean_vector;
        Ok(x.dot(&components.t()))
    }

    /// Reconstructs images from subspace coordinates (shape m_samples x k_components).
    ///
    /// Returns `projected · components + mean`, shape (m_samples, n_features). The result
    /// is exact only when no variance was truncated away.
    ///
    /// # Errors
    /// `NotFitted` before `fit`; `DimensionMismatch` if the coordinate width differs
    /// from the number of fitted components.
    pub fn inverse_transform(&self, projected: ArrayView2<f64>) -> Result<Array2<f64>> {
        let (mean_vector, components) = self.fitted()?;
        if projected.ncols() != components.nrows() {
            return Err(EigenfaceError::DimensionMismatch {
                context: "inverse_transform coordinates",
                expected: components.nrows(),
                got: projected.ncols(),
            });
        }
        let mut reconstructed = projected.dot(components);
        reconstructed += mean_vector;
        Ok(reconstructed)
    }

    /// Reconstructs a single image from its length-k coordinate vector.
    pub fn inverse_transform_sample(&self, coordinates: ArrayView1<f64>) -> Result<Array1<f64>> {
        let (mean_vector, components) = self.fitted()?;
        if coordinates.len() != components.nrows() {
            return Err(EigenfaceError::DimensionMismatch {
                context: "inverse_transform coordinates",
                expected: components.nrows(),
                got: coordinates.len(),
            });
        }
        Ok(coordinates.dot(components) + mean_vector)
    }

    fn fitted(&self) -> Result<(&Array1<f64>, &Array2<f64>)> {
        match (self.mean.as_ref(), self.components.as_ref()) {
            (Some(mean), Some(components)) => Ok((mean, components)),
            _ => Err(EigenfaceError::NotFitted),
        }
    }

    /// Saves the fitted model to a file using bincode.
    ///
    /// # Errors
    /// `NotFitted` if the model has not been fitted; IO or serialization errors otherwise.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.fitted()?;
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        Ok(())
    }

    /// Loads a model previously written by `save_model`.
    ///
    /// # Errors
    /// Returns an error on IO or deserialization failure, or `InvalidModel` if the
    /// decoded model is incomplete or its arrays disagree in shape.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let pca_model: PCA =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;

        let (mean, components) = pca_model
            .fitted()
            .map_err(|_| EigenfaceError::InvalidModel("missing mean or components".into()))?;
        if components.ncols() != mean.len() {
            return Err(EigenfaceError::InvalidModel(format!(
                "components have {} features but the mean has {}",
                components.ncols(),
                mean.len()
            )));
        }
        let k_components = components.nrows();
        for (name, values) in [
            ("explained_variance", pca_model.explained_variance.as_ref()),
            ("explained_variance_ratio", pca_model.explained_variance_ratio.as_ref()),
        ] {
            let values = values.ok_or_else(|| EigenfaceError::InvalidModel(format!("missing {}", name)))?;
            if values.len() != k_components {
                return Err(EigenfaceError::InvalidModel(format!(
                    "{} has length {} but there are {} components",
                    name,
                    values.len(),
                    k_components
                )));
            }
            if values.iter().any(|&v| !v.is_finite() || v < 0.0) {
                return Err(EigenfaceError::InvalidModel(format!(
                    "{} contains negative or non-finite values",
                    name
                )));
            }
        }
        Ok(pca_model)
    }
}

/// Flips `component` so that its entry of largest magnitude is positive.
/// The first such entry wins ties.
fn orient_by_largest_entry(mut component: ArrayViewMut1<f64>) {
    let mut pivot = 0.0f64;
    for &value in component.iter() {
        if value.abs() > pivot.abs() {
            pivot = value;
        }
    }
    if pivot < 0.0 {
        component.mapv_inplace(|x| -x);
    }
}
