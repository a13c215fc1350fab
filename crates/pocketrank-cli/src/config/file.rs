use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePreprocessConfig {
    pub input_dir: Option<PathBuf>,
    pub external_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub keys: Option<Vec<String>>,
    pub workers: Option<usize>,
    pub num_conformers: Option<usize>,
    pub max_iterations: Option<usize>,
    pub seed: Option<u64>,
    pub forcefield: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileTrainConfig {
    pub label_index: Option<PathBuf>,
    pub key_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub save_dir: Option<PathBuf>,
    pub restart_file: Option<PathBuf>,
    pub train_output: Option<PathBuf>,
    pub test_output: Option<PathBuf>,
    pub lr: Option<f64>,
    pub lr_decay: Option<f64>,
    pub weight_decay: Option<f64>,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub ngpu: Option<usize>,
    pub loss2_ratio: Option<f64>,
    pub seed: Option<u64>,
    pub dim_gnn: Option<usize>,
    pub n_gnn: Option<usize>,
    pub filter_spacing: Option<f64>,
    pub filter_gamma: Option<f64>,
    pub dropout: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub preprocess: Option<FilePreprocessConfig>,
    pub train: Option<FileTrainConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads `path` when given, otherwise an empty configuration.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
