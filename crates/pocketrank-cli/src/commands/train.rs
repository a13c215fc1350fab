use crate::cli::TrainArgs;
use crate::config::builder::build_training_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use pocketrank::{engine::progress::ProgressReporter, workflows};
use tracing::info;

const SUMMARY_HEADER: &str = "epoch\ttrain_l1\ttrain_l2\ttest_l1\ttest_l2\ttrain_r2\ttest_r2\ttime";

pub fn run(args: TrainArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_training_config(&args)?;
    info!(
        "Training for {} epochs with batch size {} and lr {}.",
        config.epochs, config.batch_size, config.lr
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("{SUMMARY_HEADER}");
    let summaries = workflows::train::run(&config, &reporter)?;

    if let Some(last) = summaries.last() {
        println!(
            "Finished {} epochs. Last checkpoint: {}",
            summaries.len(),
            pocketrank::engine::checkpoint::checkpoint_path(&config.save_dir, last.epoch).display()
        );
    }

    Ok(())
}
