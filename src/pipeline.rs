//! End-to-end eigenface run: load faces, fit PCA, write the mean face, the eigenfaces
//! and reconstructions of one sample at several component counts.

use log::info;
use ndarray::{Array1, Axis};
use std::path::PathBuf;

use crate::config::{ImageShape, PipelineConfig};
use crate::dataset::{load_images_recursively, LoaderOptions};
use crate::error::{EigenfaceError, Result};
use crate::normalize::normalize;
use crate::pca::PCA;
use crate::render::save_grayscale;

/// Summary of a finished pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub n_samples: usize,
    pub image_shape: ImageShape,
    /// Ratios of the main fit (with `n_components` from the configuration).
    pub explained_variance_ratio: Array1<f64>,
    /// Every image written, in write order.
    pub written_files: Vec<PathBuf>,
}

/// Runs the whole pipeline described by `config`.
///
/// Output layout under `config.output_dir`:
/// - `mean_face.png`
/// - `eigenfaces/eigenface_{i}.png` for i = 1..=k
/// - `reconstructions/reconstruction_{k}.png` for each k in `reconstruction_components`,
///   showing sample `sample_index` rebuilt from k eigenfaces
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;
    let dataset = load_images_recursively(&config.data_dir, &LoaderOptions::from(config))?;
    let n_samples = dataset.n_samples();
    let shape = dataset.image_shape;
    if config.sample_index >= n_samples {
        return Err(EigenfaceError::InvalidConfig(format!(
            "sample_index {} is out of range for {} loaded images",
            config.sample_index, n_samples
        )));
    }

    let (centered, mean_face) = normalize(&dataset.data)?;
    let mut pca = PCA::new(config.n_components);
    pca.fit(centered.clone())?;
    let ratios = pca
        .explained_variance_ratio()
        .cloned()
        .ok_or(EigenfaceError::NotFitted)?;
    info!("Explained variance ratios: {:?}", ratios);

    let mut written_files = Vec::new();

    let mean_path = config.output_dir.join("mean_face.png");
    save_grayscale(mean_face.view(), shape, &mean_path)?;
    info!("Saved {:?}", mean_path);
    written_files.push(mean_path);

    let components = pca.components().ok_or(EigenfaceError::NotFitted)?;
    for (i, eigenface) in components.axis_iter(Axis(0)).enumerate() {
        let path = config
            .output_dir
            .join("eigenfaces")
            .join(format!("eigenface_{}.png", i + 1));
        save_grayscale(eigenface, shape, &path)?;
        info!("Saved {:?}", path);
        written_files.push(path);
    }

    for &k in &config.reconstruction_components {
        let mut pca_k = PCA::new(Some(k));
        pca_k.fit(centered.clone())?;
        let projected = pca_k.transform(centered.clone())?;
        // The fit ran on centered faces; adding the mean face back gives a viewable image.
        let reconstruction =
            pca_k.inverse_transform_sample(projected.row(config.sample_index))? + &mean_face;

        let path = config
            .output_dir
            .join("reconstructions")
            .join(format!("reconstruction_{}.png", k));
        save_grayscale(reconstruction.view(), shape, &path)?;
        info!(
            "Saved {:?} ({} of {} requested components kept)",
            path,
            pca_k.n_components_fitted().unwrap_or(0),
            k
        );
        written_files.push(path);
    }

    Ok(PipelineReport {
        n_samples,
        image_shape: shape,
        explained_variance_ratio: ratios,
        written_files,
    })
}
