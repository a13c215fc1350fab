use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "PocketRank CLI - preprocess protein-ligand complexes into pocket graphs and train a binding-affinity GNN with a pose-ranking objective.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of threads in the global pool used for parallel numerics.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build pocket/ligand records from raw complex directories.
    Preprocess(PreprocessArgs),
    /// Train the affinity network on preprocessed records.
    Train(TrainArgs),
}

/// Arguments for the `preprocess` subcommand.
#[derive(Args, Debug, Default)]
pub struct PreprocessArgs {
    /// Path to a TOML configuration file; its `[preprocess]` table is used.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory with one `<key>/` subdirectory per complex.
    #[arg(short, long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Secondary ligand repository searched as `<DIR>/<key>/<key>.sdf`.
    #[arg(short, long, value_name = "DIR")]
    pub external_dir: Option<PathBuf>,

    /// Output directory for the per-key records.
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keys to process (comma separated). Defaults to every subdirectory of the input directory.
    #[arg(short, long, value_name = "KEY,...", value_delimiter = ',')]
    pub keys: Option<Vec<String>>,

    /// Number of complexes processed concurrently.
    #[arg(short, long, value_name = "INT")]
    pub workers: Option<usize>,

    /// Candidate conformers embedded per ligand.
    #[arg(long, value_name = "INT")]
    pub num_conformers: Option<usize>,

    /// Force-field relaxation iteration cap per conformer.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Seed for conformer embedding.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Force-field parameter file replacing the built-in table.
    #[arg(long, value_name = "PATH")]
    pub forcefield: Option<PathBuf>,
}

/// Arguments for the `train` subcommand.
#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// Path to a TOML configuration file; its `[train]` table is used.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Inputs and outputs ---
    /// Label index file (six header lines, then `id ... ... affinity ...`).
    #[arg(long = "label-index", visible_alias = "filename", value_name = "PATH")]
    pub label_index: Option<PathBuf>,

    /// Directory containing `train_keys.txt` and `test_keys.txt`.
    #[arg(long, value_name = "DIR")]
    pub key_dir: Option<PathBuf>,

    /// Directory of preprocessed records.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving one checkpoint per epoch.
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// Checkpoint loaded into the model before training.
    #[arg(long, value_name = "PATH")]
    pub restart_file: Option<PathBuf>,

    /// Per-key prediction report for the training set.
    #[arg(long, value_name = "PATH")]
    pub train_output: Option<PathBuf>,

    /// Per-key prediction report for the test set.
    #[arg(long, value_name = "PATH")]
    pub test_output: Option<PathBuf>,

    // --- Optimization ---
    /// Base learning rate.
    #[arg(long, value_name = "FLOAT")]
    pub lr: Option<f64>,

    /// Multiplicative learning-rate decay per epoch.
    #[arg(long, value_name = "FLOAT")]
    pub lr_decay: Option<f64>,

    /// L2 penalty coefficient; `weight_decay * w` is added to each gradient before the Adam update.
    #[arg(long, value_name = "FLOAT")]
    pub weight_decay: Option<f64>,

    /// Number of epochs.
    #[arg(long, visible_alias = "num-epochs", value_name = "INT")]
    pub epochs: Option<usize>,

    #[arg(long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Data-loading worker threads.
    #[arg(long, visible_alias = "num-workers", value_name = "INT")]
    pub workers: Option<usize>,

    /// Number of GPUs; 0 forces the CPU.
    #[arg(long, value_name = "INT")]
    pub ngpu: Option<usize>,

    /// Weight of the ranking loss during training.
    #[arg(long, value_name = "FLOAT")]
    pub loss2_ratio: Option<f64>,

    /// Seed for shuffling and decoy rotations.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    // --- Model ---
    /// Node embedding width.
    #[arg(long, value_name = "INT")]
    pub dim_gnn: Option<usize>,

    /// Number of graph convolution layers.
    #[arg(long, value_name = "INT")]
    pub n_gnn: Option<usize>,

    /// Spacing between distance filter centers, in angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub filter_spacing: Option<f64>,

    /// Width parameter of the distance filters.
    #[arg(long, value_name = "FLOAT")]
    pub filter_gamma: Option<f64>,

    #[arg(long, visible_alias = "dropout-rate", value_name = "FLOAT")]
    pub dropout: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_keys_are_comma_separated() {
        let cli = Cli::parse_from(["pocketrank", "preprocess", "-i", "raw", "--keys", "1abc,2def"]);
        let Commands::Preprocess(args) = cli.command else {
            panic!("expected preprocess");
        };
        assert_eq!(args.keys, Some(vec!["1abc".to_string(), "2def".to_string()]));
        assert_eq!(args.input_dir, Some(PathBuf::from("raw")));
    }

    #[test]
    fn train_accepts_legacy_option_names() {
        let cli = Cli::parse_from([
            "pocketrank",
            "-vv",
            "train",
            "--num-epochs",
            "3",
            "--dropout-rate",
            "0.1",
            "--filename",
            "INDEX",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.epochs, Some(3));
        assert_eq!(args.dropout, Some(0.1));
        assert_eq!(args.label_index, Some(PathBuf::from("INDEX")));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["pocketrank", "-q", "-v", "train"]).is_err());
    }
}
