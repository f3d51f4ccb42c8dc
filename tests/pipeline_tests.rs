// In tests/pipeline_tests.rs

use eigenfaces::{
    load_images_recursively, normalize, run, EigenfaceError, ImageShape, LoaderOptions, PipelineConfig, PCA,
};
use image::{GrayImage, Luma};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const WIDTH: u32 = 8;
const HEIGHT: u32 = 6;

/// Writes `people` directories with `images_per_person` noisy variations of a per-person face.
fn write_synthetic_faces(root: &Path, people: usize, images_per_person: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for person in 0..people {
        let dir = root.join(format!("person_{:02}", person));
        fs::create_dir_all(&dir).unwrap();
        let base: Vec<f64> = (0..(WIDTH * HEIGHT)).map(|_| rng.gen_range(40.0..200.0)).collect();
        for image_idx in 0..images_per_person {
            let face = GrayImage::from_fn(WIDTH, HEIGHT, |x, y| {
                let noise: f64 = rng.gen_range(-30.0..30.0);
                let value = base[(y * WIDTH + x) as usize] + noise;
                Luma([value.clamp(0.0, 255.0) as u8])
            });
            face.save(dir.join(format!("img_{}.png", image_idx))).unwrap();
        }
    }
}

fn test_config(data_dir: &Path, output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: data_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        image_size: ImageShape::new(WIDTH, HEIGHT),
        n_components: Some(5),
        max_people: Some(4),
        max_images_per_person: Some(3),
        reconstruction_components: vec![2, 5, 11],
        sample_index: 1,
    }
}

#[test]
fn pipeline_writes_mean_eigenfaces_and_reconstructions() {
    let data = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_synthetic_faces(data.path(), 5, 4, 2024);

    let config = test_config(data.path(), &output.path().join("results"));
    let report = run(&config).unwrap();

    // Capped at 4 people x 3 images.
    assert_eq!(report.n_samples, 12);
    assert_eq!(report.image_shape, ImageShape::new(WIDTH, HEIGHT));
    assert_eq!(report.explained_variance_ratio.len(), 5);
    assert!(report.explained_variance_ratio.sum() <= 1.0 + 1e-12);

    let results = output.path().join("results");
    let mut expected = vec![results.join("mean_face.png")];
    for i in 1..=5 {
        expected.push(results.join("eigenfaces").join(format!("eigenface_{}.png", i)));
    }
    for k in [2, 5, 11] {
        expected.push(results.join("reconstructions").join(format!("reconstruction_{}.png", k)));
    }
    assert_eq!(report.written_files, expected);

    for path in &expected {
        let rendered = image::open(path).unwrap().into_luma8();
        assert_eq!(rendered.dimensions(), (WIDTH, HEIGHT), "{:?}", path);
    }
}

#[test]
fn full_rank_reconstruction_reproduces_loaded_face() {
    let data = tempdir().unwrap();
    write_synthetic_faces(data.path(), 3, 3, 7);

    let options = LoaderOptions {
        image_size: ImageShape::new(WIDTH, HEIGHT),
        max_people: None,
        max_images_per_person: None,
    };
    let dataset = load_images_recursively(data.path(), &options).unwrap();
    assert_eq!(dataset.data.dim(), (9, (WIDTH * HEIGHT) as usize));
    assert_eq!(dataset.labels[0], "person_00");
    assert_eq!(dataset.labels[8], "person_02");

    let (centered, mean_face) = normalize(&dataset.data).unwrap();
    let mut pca = PCA::new(None);
    pca.fit(centered.clone()).unwrap();
    let projected = pca.transform(centered).unwrap();

    for sample in 0..dataset.n_samples() {
        let reconstructed = pca.inverse_transform_sample(projected.row(sample)).unwrap() + &mean_face;
        for (r, original) in reconstructed.iter().zip(dataset.data.row(sample).iter()) {
            assert!((r - original).abs() < 1e-6, "sample {}: {} vs {}", sample, r, original);
        }
    }
}

#[test]
fn pipeline_rejects_out_of_range_sample() {
    let data = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_synthetic_faces(data.path(), 2, 2, 3);

    let mut config = test_config(data.path(), output.path());
    config.sample_index = 4;
    assert!(matches!(run(&config), Err(EigenfaceError::InvalidConfig(_))));
}

#[test]
fn pipeline_reports_missing_dataset() {
    let output = tempdir().unwrap();
    let config = test_config(&output.path().join("no_such_dir"), output.path());
    assert!(matches!(run(&config), Err(EigenfaceError::Io(_))));
}

#[test]
fn saved_model_projects_like_the_original() {
    let data = tempdir().unwrap();
    write_synthetic_faces(data.path(), 3, 2, 99);
    let dataset = load_images_recursively(
        data.path(),
        &LoaderOptions {
            image_size: ImageShape::new(WIDTH, HEIGHT),
            ..LoaderOptions::default()
        },
    )
    .unwrap();

    let mut pca = PCA::new(Some(3));
    pca.fit(dataset.data.clone()).unwrap();
    let model_path = data.path().join("eigenfaces.bin");
    pca.save_model(&model_path).unwrap();

    let restored = PCA::load_model(&model_path).unwrap();
    assert_eq!(
        restored.transform(dataset.data.clone()).unwrap(),
        pca.transform(dataset.data).unwrap()
    );
}
