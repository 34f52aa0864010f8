use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::config::{CliOverrides, Config};
use crate::models::ObservationBatch;
use crate::pipeline::Pipeline;
use crate::report::{render_json, render_stage_runs, render_table, stage_runs};
use crate::stages::{classify_stages, first_difference, GrowthStage};

/// Read an observation batch from a JSON file
pub fn load_batch<P: AsRef<Path>>(path: P) -> Result<ObservationBatch> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read observations: {}", path.as_ref().display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse observations: {}", path.as_ref().display()))
}

/// Run the pipeline over a batch file and render the result
pub fn process_batch(
    input: &str,
    config_path: Option<&str>,
    overrides: CliOverrides,
    format: OutputFormat,
) -> Result<String> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path))?,
        None => Config::default(),
    };
    config.merge_with_cli(overrides);
    let pipeline_config = config
        .to_pipeline_config()
        .context("Configuration validation failed")?;

    let batch = load_batch(input)?;
    tracing::info!(
        "📊 Processing {} observations for region {} (cloud threshold {})",
        batch.observations.len(),
        batch.region_id,
        batch
            .cloud_threshold
            .unwrap_or_else(|| config.get_cloud_threshold())
    );

    let result = Pipeline::new(pipeline_config)
        .run(&batch)
        .with_context(|| format!("Pipeline failed for region {}", batch.region_id))?;

    match format {
        OutputFormat::Json => render_json(&result).context("Failed to serialize result"),
        OutputFormat::Table => {
            if result.is_empty() {
                return Ok(format!(
                    "No complete observations for region {} ({} received)\n",
                    result.region_id, result.observations_received
                ));
            }
            let runs = stage_runs(&result.series.dates, &result.mean_stages);
            Ok(format!(
                "Region {}: {} of {} observations\n\n{}\nMean NDVI stages:\n{}",
                result.region_id,
                result.series.len(),
                result.observations_received,
                render_table(&result),
                render_stage_runs(&runs)
            ))
        }
    }
}

#[derive(Debug, Serialize)]
struct ClassifiedValue {
    value: f64,
    diff: f64,
    stage: GrowthStage,
    label: &'static str,
    color: &'static str,
}

/// Classify an ad-hoc list of values
pub fn classify_values(values: &str, format: OutputFormat) -> Result<String> {
    let parsed: Vec<f64> = values
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("Invalid value: {}", s))
        })
        .collect::<Result<_>>()?;

    let rows: Vec<ClassifiedValue> = parsed
        .iter()
        .zip(first_difference(&parsed))
        .zip(classify_stages(&parsed))
        .map(|((&value, diff), stage)| ClassifiedValue {
            value,
            diff,
            stage,
            label: stage.label(),
            color: stage.color(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&rows).context("Failed to serialize stages")
        }
        OutputFormat::Table => {
            let mut out = String::from("|  Value  |  Diff   | Stage           |\n");
            out.push_str("|---------|---------|-----------------|\n");
            for row in &rows {
                out.push_str(&format!(
                    "| {:7.4} | {:7.4} | {:<15} |\n",
                    row.value, row.diff, row.label
                ));
            }
            Ok(out)
        }
    }
}

/// Write a default configuration file
pub fn init_config(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        return Err(anyhow::anyhow!("Refusing to overwrite existing file: {}", path));
    }
    Config::default().to_file(path)?;
    tracing::info!("📝 Wrote default configuration to {}", path);
    Ok(())
}
