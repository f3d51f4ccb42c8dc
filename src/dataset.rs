//! Loading of face datasets laid out as one directory per person.

use image::imageops::{self, FilterType};
use log::{info, warn};
use ndarray::Array2;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ImageShape, PipelineConfig};
use crate::error::{EigenfaceError, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Options controlling which images are loaded and how they are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub image_size: ImageShape,
    pub max_people: Option<usize>,
    pub max_images_per_person: Option<usize>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            image_size: ImageShape::default(),
            max_people: None,
            max_images_per_person: None,
        }
    }
}

impl From<&PipelineConfig> for LoaderOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            image_size: config.image_size,
            max_people: config.max_people,
            max_images_per_person: config.max_images_per_person,
        }
    }
}

/// Flattened grayscale faces ready for PCA.
#[derive(Debug, Clone)]
pub struct FaceDataset {
    /// One row per image, `image_shape.n_pixels()` columns, intensities in 0..=255.
    pub data: Array2<f64>,
    pub image_shape: ImageShape,
    /// Person (directory name) of each row.
    pub labels: Vec<String>,
}

impl FaceDataset {
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }
}

/// Loads every person directory under `base_dir` as grayscale, resized, flattened images.
///
/// Person directories and the image files inside them are visited in name order and
/// truncated to `max_people` / `max_images_per_person`. Files that fail to decode are
/// skipped with a warning.
///
/// # Errors
/// IO errors while listing directories, or `EmptyInput` when no image could be loaded.
pub fn load_images_recursively<P: AsRef<Path>>(base_dir: P, options: &LoaderOptions) -> Result<FaceDataset> {
    let base_dir = base_dir.as_ref();
    let load_start_time = std::time::Instant::now();

    let mut person_dirs = sorted_entries(base_dir, |path| path.is_dir())?;
    if let Some(max_people) = options.max_people {
        person_dirs.truncate(max_people);
    }

    let per_person: Vec<Vec<(String, Vec<f64>)>> = person_dirs
        .par_iter()
        .map(|person_dir| load_person(person_dir, options))
        .collect::<Result<_>>()?;

    let n_pixels = options.image_size.n_pixels();
    let mut labels = Vec::new();
    let mut flat = Vec::new();
    for (label, pixels) in per_person.into_iter().flatten() {
        labels.push(label);
        flat.extend(pixels);
    }
    if labels.is_empty() {
        return Err(EigenfaceError::EmptyInput(format!(
            "no readable images found under {:?}",
            base_dir
        )));
    }

    let n_samples = labels.len();
    let got = flat.len();
    let data = Array2::from_shape_vec((n_samples, n_pixels), flat).map_err(|_| {
        EigenfaceError::DimensionMismatch {
            context: "dataset assembly",
            expected: n_samples * n_pixels,
            got,
        }
    })?;

    info!(
        "Loaded {} face images from {} people ({}x{}) in {:?}",
        n_samples,
        person_dirs.len(),
        options.image_size.width,
        options.image_size.height,
        load_start_time.elapsed()
    );
    Ok(FaceDataset {
        data,
        image_shape: options.image_size,
        labels,
    })
}

fn load_person(person_dir: &Path, options: &LoaderOptions) -> Result<Vec<(String, Vec<f64>)>> {
    let label = person_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut files = sorted_entries(person_dir, |path| path.is_file() && has_image_extension(path))?;
    if let Some(max_images) = options.max_images_per_person {
        files.truncate(max_images);
    }

    let mut samples = Vec::with_capacity(files.len());
    for file in files {
        match load_grayscale_vector(&file, options.image_size) {
            Ok(pixels) => samples.push((label.clone(), pixels)),
            Err(e) => warn!("Skipping unreadable image {:?}: {}", file, e),
        }
    }
    Ok(samples)
}

/// Decodes one image as 8-bit grayscale, resizes it exactly to `shape` and flattens it
/// row by row.
pub fn load_grayscale_vector(path: &Path, shape: ImageShape) -> Result<Vec<f64>> {
    let gray = image::open(path)?.into_luma8();
    let resized = imageops::resize(&gray, shape.width, shape.height, FilterType::Triangle);
    Ok(resized.as_raw().iter().map(|&p| p as f64).collect())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if keep(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::tempdir;

    fn write_face(dir: &Path, name: &str, value: u8) {
        fs::create_dir_all(dir).unwrap();
        GrayImage::from_pixel(4, 3, Luma([value])).save(dir.join(name)).unwrap();
    }

    #[test]
    fn loads_people_in_name_order_with_caps() {
        let root = tempdir().unwrap();
        write_face(&root.path().join("bob"), "b1.png", 10);
        write_face(&root.path().join("bob"), "b2.PNG", 20);
        write_face(&root.path().join("bob"), "b3.png", 30);
        write_face(&root.path().join("alice"), "a1.png", 40);
        write_face(&root.path().join("carol"), "c1.png", 50);
        fs::write(root.path().join("alice").join("notes.txt"), "not an image").unwrap();

        let options = LoaderOptions {
            image_size: ImageShape::new(4, 3),
            max_people: Some(2),
            max_images_per_person: Some(2),
        };
        let dataset = load_images_recursively(root.path(), &options).unwrap();

        assert_eq!(dataset.labels, vec!["alice", "bob", "bob"]);
        assert_eq!(dataset.data.dim(), (3, 12));
        assert_eq!(dataset.image_shape, ImageShape::new(4, 3));
        assert!(dataset.data.row(0).iter().all(|&v| v == 40.0));
        assert!(dataset.data.row(1).iter().all(|&v| v == 10.0));
        assert!(dataset.data.row(2).iter().all(|&v| v == 20.0));
    }

    #[test]
    fn images_are_resized_to_requested_shape() {
        let root = tempdir().unwrap();
        let person = root.path().join("dave");
        fs::create_dir_all(&person).unwrap();
        GrayImage::from_pixel(16, 8, Luma([77])).save(person.join("d.png")).unwrap();

        let options = LoaderOptions {
            image_size: ImageShape::new(5, 7),
            ..LoaderOptions::default()
        };
        let dataset = load_images_recursively(root.path(), &options).unwrap();
        assert_eq!(dataset.data.dim(), (1, 35));
        assert!(dataset.data.iter().all(|&v| v == 77.0));
    }

    #[test]
    fn undecodable_files_are_skipped() {
        let root = tempdir().unwrap();
        let person = root.path().join("erin");
        write_face(&person, "good.png", 99);
        fs::write(person.join("broken.jpg"), b"definitely not a jpeg").unwrap();

        let options = LoaderOptions {
            image_size: ImageShape::new(4, 3),
            ..LoaderOptions::default()
        };
        let dataset = load_images_recursively(root.path(), &options).unwrap();
        assert_eq!(dataset.n_samples(), 1);
        assert_eq!(dataset.labels, vec!["erin"]);
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("nobody")).unwrap();
        let err = load_images_recursively(root.path(), &LoaderOptions::default()).unwrap_err();
        assert!(matches!(err, EigenfaceError::EmptyInput(_)));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let root = tempdir().unwrap();
        let err = load_images_recursively(root.path().join("absent"), &LoaderOptions::default()).unwrap_err();
        assert!(matches!(err, EigenfaceError::Io(_)));
    }
}
