use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ndvi-guard")]
#[command(about = "Gap-fill, smooth and stage vegetation-index time series", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table with a stage timeline
    Table,
    /// Full result as JSON for chart renderers
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline over a JSON observation batch
    Process {
        /// Path to the observation batch (JSON)
        input: String,

        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Interpolation method: pchip, cubic or univariate
        #[arg(short, long)]
        method: Option<String>,

        /// Smoothing factor for the univariate method
        #[arg(long)]
        smooth: Option<f64>,

        /// Statistic to gap-fill: mean, median, stddev, p10 or p90
        #[arg(long)]
        statistic: Option<String>,

        /// Gaussian sigma in time steps
        #[arg(long)]
        sigma: Option<f64>,

        /// First date of the mask window (YYYY-MM-DD)
        #[arg(long)]
        mask_start: Option<String>,

        /// Last date of the mask window (YYYY-MM-DD)
        #[arg(long)]
        mask_end: Option<String>,

        /// Keep the mask window and blank everything outside it
        #[arg(long, default_value = "false")]
        outside_to_nan: bool,

        /// Do not require total pixel counts (no fractions or weights)
        #[arg(long, default_value = "false")]
        no_total_pixels: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Write output to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Classify a comma-separated list of smoothed values into growth stages
    Stages {
        /// Values, e.g. "0.12,0.35,0.6,0.8,0.7"
        values: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Write a configuration file populated with defaults
    InitConfig {
        /// Destination path
        #[arg(default_value = "ndvi-guard.toml")]
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_command() {
        let cli = Cli::try_parse_from([
            "ndvi-guard",
            "process",
            "batch.json",
            "--method",
            "univariate",
            "--mask-start",
            "2024-06-01",
            "--mask-end",
            "2024-10-22",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Process {
                input,
                method,
                mask_start,
                format,
                outside_to_nan,
                ..
            } => {
                assert_eq!(input, "batch.json");
                assert_eq!(method.as_deref(), Some("univariate"));
                assert_eq!(mask_start.as_deref(), Some("2024-06-01"));
                assert_eq!(format, OutputFormat::Json);
                assert!(!outside_to_nan);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_parse_stages_defaults_to_table() {
        let cli = Cli::try_parse_from(["ndvi-guard", "-v", "stages", "0.1,0.5"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Stages { values, format } => {
                assert_eq!(values, "0.1,0.5");
                assert_eq!(format, OutputFormat::Table);
            }
            _ => panic!("expected stages command"),
        }
    }
}
