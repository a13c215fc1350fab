use crate::cli::PreprocessArgs;
use crate::config::builder::build_preprocess_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use pocketrank::{engine::progress::ProgressReporter, workflows};
use tracing::{info, warn};

pub fn run(args: PreprocessArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_preprocess_config(&args)?;

    if config.keys.is_empty() {
        warn!("No keys to preprocess under {}.", config.input_dir.display());
        println!("Nothing to do: no complexes found.");
        return Ok(());
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Preprocessing {} complexes into {}...",
        config.keys.len(),
        config.data_dir.display()
    );
    let summary = workflows::preprocess::run(&config, &reporter)?;

    println!(
        "Done: {} written, {} already present, {} skipped.",
        summary.written.len(),
        summary.existing.len(),
        summary.skipped.len()
    );
    for (key, reason) in &summary.skipped {
        println!("  skipped {key}: {reason}");
    }

    Ok(())
}
