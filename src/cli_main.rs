use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::{classify_values, init_config, process_batch};
use crate::config::CliOverrides;

fn init_tracing(verbose: bool) {
    // RUST_LOG wins; otherwise info, or debug with --verbose.
    // Logs go to stderr so JSON output on stdout stays parseable.
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false) // Don't show module paths in logs
        .with_level(true) // Show log levels
        .with_thread_ids(false) // Don't show thread IDs for cleaner output
        .init();
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            config,
            method,
            smooth,
            statistic,
            sigma,
            mask_start,
            mask_end,
            outside_to_nan,
            no_total_pixels,
            format,
            output,
        } => {
            let overrides = CliOverrides {
                method,
                smoothing_factor: smooth,
                statistic,
                sigma,
                mask_start,
                mask_end,
                outside_to_nan,
                track_total_pixels: no_total_pixels.then_some(false),
            };
            let rendered = process_batch(&input, config.as_deref(), overrides, format)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write output: {}", path))?;
                    tracing::info!("💾 Wrote results to {}", path);
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Stages { values, format } => {
            print!("{}", classify_values(&values, format)?);
        }
        Commands::InitConfig { path } => {
            init_config(&path)?;
        }
    }

    Ok(())
}
