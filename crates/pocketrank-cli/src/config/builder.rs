use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use crate::cli::{PreprocessArgs, TrainArgs};
use crate::error::{CliError, Result};
use pocketrank::engine::config as core_config;
use std::path::PathBuf;

pub fn build_preprocess_config(args: &PreprocessArgs) -> Result<core_config::PreprocessConfig> {
    let defaults = DefaultsConfig::default();
    let file = FileConfig::load_optional(args.config.as_deref())?
        .preprocess
        .unwrap_or_default();

    let conformer = core_config::ConformerConfig {
        num_conformers: args
            .num_conformers
            .or(file.num_conformers)
            .unwrap_or(defaults.num_conformers),
        max_iterations: args
            .max_iterations
            .or(file.max_iterations)
            .unwrap_or(defaults.max_iterations),
        seed: args.seed.or(file.seed),
        forcefield_path: args.forcefield.clone().or(file.forcefield),
    };

    let mut builder = core_config::PreprocessConfigBuilder::new()
        .external_dir(args.external_dir.clone().or(file.external_dir))
        .workers(args.workers.or(file.workers).unwrap_or(defaults.preprocess_workers))
        .conformer(conformer);
    if let Some(dir) = args.input_dir.clone().or(file.input_dir) {
        builder = builder.input_dir(dir);
    }
    if let Some(dir) = args.data_dir.clone().or(file.data_dir) {
        builder = builder.data_dir(dir);
    }
    if let Some(keys) = args.keys.clone().or(file.keys) {
        builder = builder.keys(keys);
    }

    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

pub fn build_training_config(args: &TrainArgs) -> Result<core_config::TrainingConfig> {
    let defaults = DefaultsConfig::default();
    let file = FileConfig::load_optional(args.config.as_deref())?
        .train
        .unwrap_or_default();

    let model = core_config::ModelConfig {
        dim_gnn: args.dim_gnn.or(file.dim_gnn).unwrap_or(defaults.dim_gnn),
        n_gnn: args.n_gnn.or(file.n_gnn).unwrap_or(defaults.n_gnn),
        filter_spacing: args
            .filter_spacing
            .or(file.filter_spacing)
            .unwrap_or(defaults.filter_spacing),
        filter_gamma: args
            .filter_gamma
            .or(file.filter_gamma)
            .unwrap_or(defaults.filter_gamma),
        dropout: args.dropout.or(file.dropout).unwrap_or(defaults.dropout),
    };

    let mut builder = core_config::TrainingConfigBuilder::new()
        .key_dir(
            args.key_dir
                .clone()
                .or(file.key_dir)
                .unwrap_or_else(|| PathBuf::from(&defaults.key_dir)),
        )
        .restart_file(args.restart_file.clone().or(file.restart_file))
        .train_output(
            args.train_output
                .clone()
                .or(file.train_output)
                .unwrap_or_else(|| PathBuf::from(&defaults.train_output)),
        )
        .test_output(
            args.test_output
                .clone()
                .or(file.test_output)
                .unwrap_or_else(|| PathBuf::from(&defaults.test_output)),
        )
        .lr(args.lr.or(file.lr).unwrap_or(defaults.lr))
        .lr_decay(args.lr_decay.or(file.lr_decay).unwrap_or(defaults.lr_decay))
        .weight_decay(
            args.weight_decay
                .or(file.weight_decay)
                .unwrap_or(defaults.weight_decay),
        )
        .epochs(args.epochs.or(file.epochs).unwrap_or(defaults.epochs))
        .batch_size(args.batch_size.or(file.batch_size).unwrap_or(defaults.batch_size))
        .workers(args.workers.or(file.workers).unwrap_or(defaults.train_workers))
        .ngpu(args.ngpu.or(file.ngpu).unwrap_or(defaults.ngpu))
        .loss2_ratio(
            args.loss2_ratio
                .or(file.loss2_ratio)
                .unwrap_or(defaults.loss2_ratio),
        )
        .seed(args.seed.or(file.seed))
        .model(model);

    if let Some(path) = args.label_index.clone().or(file.label_index) {
        builder = builder.label_index_path(path);
    }
    if let Some(dir) = args.data_dir.clone().or(file.data_dir) {
        builder = builder.data_dir(dir);
    }
    if let Some(dir) = args.save_dir.clone().or(file.save_dir) {
        builder = builder.save_dir(dir);
    }

    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    fn train_args(extra: &[&str]) -> TrainArgs {
        let mut argv = vec!["pocketrank", "train"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Train(args) => args,
            _ => panic!("expected train"),
        }
    }

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("pocketrank.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn training_defaults_fill_unset_options() {
        let args = train_args(&["--label-index", "INDEX", "--data-dir", "data", "--save-dir", "save"]);
        let config = build_training_config(&args).unwrap();
        assert_eq!(config.lr, 1e-4);
        assert_eq!(config.lr_decay, 1.0);
        assert_eq!(config.epochs, 10000);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.workers, 7);
        assert_eq!(config.ngpu, 1);
        assert_eq!(config.key_dir, Path::new("keys"));
        assert_eq!(config.train_output, Path::new("train.txt"));
        assert_eq!(config.model.dim_gnn, 32);
        assert_eq!(config.model.n_gnn, 3);
        assert_eq!(config.model.filter_spacing, 0.1);
        assert_eq!(config.model.filter_gamma, 10.0);
        assert_eq!(config.restart_file, None);
    }

    #[test]
    fn cli_overrides_file_which_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
            [train]
            label-index = "INDEX"
            data-dir = "data"
            save-dir = "save"
            lr = 0.01
            epochs = 50
            dim-gnn = 16
            "#,
        );
        let args = train_args(&["-c", path.to_str().unwrap(), "--lr", "0.5"]);
        let config = build_training_config(&args).unwrap();
        assert_eq!(config.lr, 0.5);
        assert_eq!(config.epochs, 50);
        assert_eq!(config.model.dim_gnn, 16);
        assert_eq!(config.data_dir, Path::new("data"));
    }

    #[test]
    fn missing_save_dir_is_a_config_error() {
        let args = train_args(&["--label-index", "INDEX", "--data-dir", "data"]);
        let err = build_training_config(&args).unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("save_dir")));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let args = train_args(&[
            "--label-index",
            "INDEX",
            "--data-dir",
            "data",
            "--save-dir",
            "save",
            "--batch-size",
            "0",
        ]);
        assert!(matches!(build_training_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn preprocess_merges_file_and_cli() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
            [preprocess]
            input-dir = "raw"
            data-dir = "data"
            keys = ["1abc"]
            workers = 2
            seed = 3
            "#,
        );
        let args = PreprocessArgs {
            config: Some(path),
            workers: Some(8),
            num_conformers: Some(5),
            ..Default::default()
        };
        let config = build_preprocess_config(&args).unwrap();
        assert_eq!(config.input_dir, Path::new("raw"));
        assert_eq!(config.keys, vec!["1abc"]);
        assert_eq!(config.workers, 8);
        assert_eq!(config.conformer.num_conformers, 5);
        assert_eq!(config.conformer.max_iterations, 200);
        assert_eq!(config.conformer.seed, Some(3));
        assert_eq!(config.external_dir, None);
    }

    #[test]
    fn preprocess_discovers_keys_from_input_directory() {
        let dir = tempdir().unwrap();
        for key in ["2def", "1abc"] {
            std::fs::create_dir(dir.path().join(key)).unwrap();
        }
        std::fs::write(dir.path().join("README"), "").unwrap();
        let args = PreprocessArgs {
            input_dir: Some(dir.path().to_path_buf()),
            data_dir: Some(dir.path().join("out")),
            ..Default::default()
        };
        let config = build_preprocess_config(&args).unwrap();
        assert_eq!(config.keys, vec!["1abc", "2def"]);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn preprocess_requires_input_dir() {
        let args = PreprocessArgs {
            data_dir: Some(PathBuf::from("out")),
            ..Default::default()
        };
        assert!(matches!(build_preprocess_config(&args), Err(CliError::Config(msg)) if msg.contains("input_dir")));
    }
}
