// Eigenfaces: principal component analysis of face images

#![doc = include_str!("../README.md")]

pub mod config;
pub mod dataset;
pub mod error;
pub mod linalg_backends;
pub mod normalize;
pub mod pca;
pub mod pipeline;
pub mod render;

pub use config::{ImageShape, PipelineConfig};
pub use dataset::{load_images_recursively, FaceDataset, LoaderOptions};
pub use error::{EigenfaceError, Result};
pub use normalize::normalize;
pub use pca::PCA;
pub use pipeline::{run, PipelineReport};
pub use render::{save_grayscale, to_gray_image};
