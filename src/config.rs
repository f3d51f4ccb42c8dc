//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EigenfaceError, Result};

/// Width and height of the images fed to PCA, in pixels.
///
/// Images are flattened row by row, so a sample vector has `height * width` entries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
}

impl ImageShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels, i.e. the length of a flattened image.
    pub fn n_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for ImageShape {
    fn default() -> Self {
        Self::new(100, 100)
    }
}

/// Configuration for a full eigenface run: loading, fitting and rendering.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the face dataset; one subdirectory per person.
    pub data_dir: PathBuf,
    /// Where the mean face, eigenfaces and reconstructions are written.
    pub output_dir: PathBuf,
    /// Every image is resized to this shape.
    pub image_size: ImageShape,
    /// Number of eigenfaces to fit; `None` keeps all of them.
    pub n_components: Option<usize>,
    /// Cap on the number of people (subdirectories) loaded.
    pub max_people: Option<usize>,
    /// Cap on the number of images loaded per person.
    pub max_images_per_person: Option<usize>,
    /// Component counts used for the reconstruction demo.
    pub reconstruction_components: Vec<usize>,
    /// Row of the loaded dataset that gets reconstructed.
    pub sample_index: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: PathBuf::from("data/raw/lfw_subset/lfw_home/lfw_funneled"),
            output_dir: PathBuf::from("results"),
            image_size: ImageShape::default(),
            n_components: Some(20),
            max_people: Some(60),
            max_images_per_person: Some(3),
            reconstruction_components: vec![5, 10, 20],
            sample_index: 0,
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON configuration file. Missing fields take their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.image_size.width == 0 || self.image_size.height == 0 {
            return Err(EigenfaceError::InvalidConfig(format!(
                "image_size must be non-zero, got {}x{}",
                self.image_size.width, self.image_size.height
            )));
        }
        if self.reconstruction_components.iter().any(|&k| k == 0) {
            return Err(EigenfaceError::InvalidConfig(
                "reconstruction_components entries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
