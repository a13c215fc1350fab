use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConformerConfig {
    pub num_conformers: usize,
    pub max_iterations: usize,
    pub seed: Option<u64>,
    /// Force-field parameter table; the embedded table is used when absent.
    pub forcefield_path: Option<PathBuf>,
}

impl Default for ConformerConfig {
    fn default() -> Self {
        Self {
            num_conformers: 20,
            max_iterations: 200,
            seed: None,
            forcefield_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub input_dir: PathBuf,
    pub external_dir: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub keys: Vec<String>,
    pub workers: usize,
    pub conformer: ConformerConfig,
}

#[derive(Default)]
pub struct PreprocessConfigBuilder {
    input_dir: Option<PathBuf>,
    external_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    keys: Option<Vec<String>>,
    workers: Option<usize>,
    conformer: Option<ConformerConfig>,
}

impl PreprocessConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_dir(mut self, path: PathBuf) -> Self {
        self.input_dir = Some(path);
        self
    }
    pub fn external_dir(mut self, path: Option<PathBuf>) -> Self {
        self.external_dir = path;
        self
    }
    pub fn data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = Some(path);
        self
    }
    /// Keys to process. When never set, every subdirectory of the input directory is used.
    pub fn keys(mut self, keys: Vec<String>) -> Self {
        self.keys = Some(keys);
        self
    }
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }
    pub fn conformer(mut self, config: ConformerConfig) -> Self {
        self.conformer = Some(config);
        self
    }

    pub fn build(self) -> Result<PreprocessConfig, ConfigError> {
        let input_dir = self
            .input_dir
            .ok_or(ConfigError::MissingParameter("input_dir"))?;
        let keys = match self.keys {
            Some(keys) => keys,
            None => discover_keys(&input_dir)?,
        };
        let workers = self.workers.ok_or(ConfigError::MissingParameter("workers"))?;
        if workers == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(PreprocessConfig {
            input_dir,
            external_dir: self.external_dir,
            data_dir: self
                .data_dir
                .ok_or(ConfigError::MissingParameter("data_dir"))?,
            keys,
            workers,
            conformer: self.conformer.unwrap_or_default(),
        })
    }
}

fn discover_keys(input_dir: &std::path::Path) -> Result<Vec<String>, ConfigError> {
    let entries = std::fs::read_dir(input_dir).map_err(|e| ConfigError::InvalidParameter {
        name: "input_dir",
        reason: e.to_string(),
    })?;
    let mut keys: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    keys.sort();
    Ok(keys)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub dim_gnn: usize,
    pub n_gnn: usize,
    pub filter_spacing: f64,
    pub filter_gamma: f64,
    pub dropout: f64,
}

impl ModelConfig {
    /// Radial basis centers cover 0 to 10 A at the configured spacing.
    pub fn num_filters(&self) -> usize {
        ((10.0 / self.filter_spacing).round() as usize).max(1)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dim_gnn: 32,
            n_gnn: 3,
            filter_spacing: 0.1,
            filter_gamma: 10.0,
            dropout: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub label_index_path: PathBuf,
    pub key_dir: PathBuf,
    pub data_dir: PathBuf,
    pub save_dir: PathBuf,
    pub restart_file: Option<PathBuf>,
    pub train_output: PathBuf,
    pub test_output: PathBuf,
    pub lr: f64,
    pub lr_decay: f64,
    pub weight_decay: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub workers: usize,
    pub ngpu: usize,
    pub loss2_ratio: f64,
    pub seed: Option<u64>,
    pub model: ModelConfig,
}

#[derive(Default)]
pub struct TrainingConfigBuilder {
    label_index_path: Option<PathBuf>,
    key_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    save_dir: Option<PathBuf>,
    restart_file: Option<PathBuf>,
    train_output: Option<PathBuf>,
    test_output: Option<PathBuf>,
    lr: Option<f64>,
    lr_decay: Option<f64>,
    weight_decay: Option<f64>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    workers: Option<usize>,
    ngpu: Option<usize>,
    loss2_ratio: Option<f64>,
    seed: Option<u64>,
    model: Option<ModelConfig>,
}

impl TrainingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label_index_path(mut self, path: PathBuf) -> Self {
        self.label_index_path = Some(path);
        self
    }
    pub fn key_dir(mut self, path: PathBuf) -> Self {
        self.key_dir = Some(path);
        self
    }
    pub fn data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = Some(path);
        self
    }
    pub fn save_dir(mut self, path: PathBuf) -> Self {
        self.save_dir = Some(path);
        self
    }
    pub fn restart_file(mut self, path: Option<PathBuf>) -> Self {
        self.restart_file = path;
        self
    }
    pub fn train_output(mut self, path: PathBuf) -> Self {
        self.train_output = Some(path);
        self
    }
    pub fn test_output(mut self, path: PathBuf) -> Self {
        self.test_output = Some(path);
        self
    }
    pub fn lr(mut self, lr: f64) -> Self {
        self.lr = Some(lr);
        self
    }
    pub fn lr_decay(mut self, decay: f64) -> Self {
        self.lr_decay = Some(decay);
        self
    }
    pub fn weight_decay(mut self, decay: f64) -> Self {
        self.weight_decay = Some(decay);
        self
    }
    pub fn epochs(mut self, n: usize) -> Self {
        self.epochs = Some(n);
        self
    }
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }
    pub fn ngpu(mut self, n: usize) -> Self {
        self.ngpu = Some(n);
        self
    }
    pub fn loss2_ratio(mut self, ratio: f64) -> Self {
        self.loss2_ratio = Some(ratio);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }

    pub fn build(self) -> Result<TrainingConfig, ConfigError> {
        let batch_size = self
            .batch_size
            .ok_or(ConfigError::MissingParameter("batch_size"))?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        let model = self.model.ok_or(ConfigError::MissingParameter("model"))?;
        if model.filter_spacing <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "filter_spacing",
                reason: "must be positive".to_string(),
            });
        }
        Ok(TrainingConfig {
            label_index_path: self
                .label_index_path
                .ok_or(ConfigError::MissingParameter("label_index_path"))?,
            key_dir: self.key_dir.ok_or(ConfigError::MissingParameter("key_dir"))?,
            data_dir: self
                .data_dir
                .ok_or(ConfigError::MissingParameter("data_dir"))?,
            save_dir: self
                .save_dir
                .ok_or(ConfigError::MissingParameter("save_dir"))?,
            restart_file: self.restart_file,
            train_output: self
                .train_output
                .ok_or(ConfigError::MissingParameter("train_output"))?,
            test_output: self
                .test_output
                .ok_or(ConfigError::MissingParameter("test_output"))?,
            lr: self.lr.ok_or(ConfigError::MissingParameter("lr"))?,
            lr_decay: self
                .lr_decay
                .ok_or(ConfigError::MissingParameter("lr_decay"))?,
            weight_decay: self
                .weight_decay
                .ok_or(ConfigError::MissingParameter("weight_decay"))?,
            epochs: self.epochs.ok_or(ConfigError::MissingParameter("epochs"))?,
            batch_size,
            workers: self.workers.ok_or(ConfigError::MissingParameter("workers"))?,
            ngpu: self.ngpu.ok_or(ConfigError::MissingParameter("ngpu"))?,
            loss2_ratio: self
                .loss2_ratio
                .ok_or(ConfigError::MissingParameter("loss2_ratio"))?,
            seed: self.seed,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn complete_training_builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::new()
            .label_index_path("index.txt".into())
            .key_dir("keys".into())
            .data_dir("data".into())
            .save_dir("save".into())
            .train_output("train.txt".into())
            .test_output("test.txt".into())
            .lr(1e-4)
            .lr_decay(1.0)
            .weight_decay(0.0)
            .epochs(1)
            .batch_size(1)
            .workers(1)
            .ngpu(0)
            .loss2_ratio(1.0)
            .model(ModelConfig::default())
    }

    #[test]
    fn training_builder_succeeds_with_all_parameters() {
        let config = complete_training_builder().build().unwrap();
        assert_eq!(config.epochs, 1);
        assert!(config.restart_file.is_none());
        assert_eq!(config.model.num_filters(), 100);
    }

    #[test]
    fn training_builder_reports_first_missing_parameter() {
        let err = TrainingConfigBuilder::new().batch_size(2).build().unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("model"));
        let err = complete_training_builder()
            .batch_size(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { name: "batch_size", .. }));
    }

    #[test]
    fn preprocess_builder_discovers_keys_from_subdirectories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("2b")).unwrap();
        std::fs::create_dir(dir.path().join("1a")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let config = PreprocessConfigBuilder::new()
            .input_dir(dir.path().to_path_buf())
            .data_dir(dir.path().join("out"))
            .workers(4)
            .build()
            .unwrap();
        assert_eq!(config.keys, vec!["1a".to_string(), "2b".to_string()]);
        assert_eq!(config.conformer.num_conformers, 20);
        assert_eq!(config.conformer.max_iterations, 200);
    }

    #[test]
    fn preprocess_builder_requires_data_dir() {
        let err = PreprocessConfigBuilder::new()
            .input_dir("in".into())
            .keys(vec!["k".into()])
            .workers(4)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("data_dir"));
    }
}
