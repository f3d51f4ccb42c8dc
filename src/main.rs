use clap::Parser;
use eigenfaces::{PipelineConfig, Result};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

/// Compute eigenfaces from a directory of face images
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset root with one subdirectory per person
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory receiving the rendered images
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Width images are resized to
    #[arg(long)]
    width: Option<u32>,

    /// Height images are resized to
    #[arg(long)]
    height: Option<u32>,

    /// Number of eigenfaces to compute (0 keeps all)
    #[arg(short, long)]
    n_components: Option<usize>,

    /// Maximum number of people to load
    #[arg(long)]
    max_people: Option<usize>,

    /// Maximum number of images per person
    #[arg(long)]
    max_images_per_person: Option<usize>,

    /// Component count for a reconstruction (repeatable)
    #[arg(short, long = "reconstruct")]
    reconstruct: Vec<usize>,

    /// Index of the sample to reconstruct
    #[arg(long)]
    sample_index: Option<usize>,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(width) = self.width {
            config.image_size.width = width;
        }
        if let Some(height) = self.height {
            config.image_size.height = height;
        }
        if let Some(n_components) = self.n_components {
            config.n_components = (n_components > 0).then_some(n_components);
        }
        if let Some(max_people) = self.max_people {
            config.max_people = Some(max_people);
        }
        if let Some(max_images) = self.max_images_per_person {
            config.max_images_per_person = Some(max_images);
        }
        if !self.reconstruct.is_empty() {
            config.reconstruction_components = self.reconstruct;
        }
        if let Some(sample_index) = self.sample_index {
            config.sample_index = sample_index;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let outcome = Cli::parse().into_config().and_then(|config| eigenfaces::run(&config));
    match outcome {
        Ok(report) => {
            info!(
                "Processed {} faces; wrote {} images.",
                report.n_samples,
                report.written_files.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
