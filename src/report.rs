//! Presentation of pipeline results: aligned text tables, stage spans and a
//! JSON export for chart renderers.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::dates::ObservationDate;
use crate::pipeline::PipelineResult;
use crate::stages::GrowthStage;

const HEADER: &str = "|   Date     |  Mean   | Median  |  Std    |  10%    |  90%    | Pixels  |";
const SEPARATOR: &str = "|------------|---------|---------|---------|---------|---------|---------|";

/// Consecutive observations sharing one growth stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRun {
    pub stage: GrowthStage,
    pub start: ObservationDate,
    pub end: ObservationDate,
    pub len: usize,
}

fn fmt_value(value: f64) -> String {
    format!("{:7.4}", value)
}

/// One row per aligned observation, with a fraction column when available.
pub fn render_table(result: &PipelineResult) -> String {
    let series = &result.series;
    let fractions = result.fractions.as_deref();

    let mut out = String::new();
    out.push_str(HEADER);
    if fractions.is_some() {
        out.push_str(" Fraction |");
    }
    out.push('\n');
    out.push_str(SEPARATOR);
    if fractions.is_some() {
        out.push_str("----------|");
    }
    out.push('\n');

    for i in 0..series.len() {
        let _ = write!(
            out,
            "| {:<10} | {} | {} | {} | {} | {} | {:7} |",
            series.dates[i].to_string(),
            fmt_value(series.mean[i]),
            fmt_value(series.median[i]),
            fmt_value(series.stddev[i]),
            fmt_value(series.p10[i]),
            fmt_value(series.p90[i]),
            series.valid_pixels[i],
        );
        if let Some(fractions) = fractions {
            let _ = write!(out, " {} |", fmt_value(fractions[i]));
        }
        out.push('\n');
    }

    out
}

/// Collapse per-observation stages into spans for chart shading.
pub fn stage_runs(dates: &[ObservationDate], stages: &[GrowthStage]) -> Vec<StageRun> {
    let mut runs: Vec<StageRun> = Vec::new();
    for (date, stage) in dates.iter().zip(stages) {
        match runs.last_mut() {
            Some(run) if run.stage == *stage => {
                run.end = *date;
                run.len += 1;
            }
            _ => runs.push(StageRun {
                stage: *stage,
                start: *date,
                end: *date,
                len: 1,
            }),
        }
    }
    runs
}

/// Human-readable stage timeline, one span per line.
pub fn render_stage_runs(runs: &[StageRun]) -> String {
    let mut out = String::new();
    for run in runs {
        let _ = writeln!(
            out,
            "{} .. {}  {:<15} ({} obs, {})",
            run.start,
            run.end,
            run.stage.label(),
            run.len,
            run.stage.color()
        );
    }
    out
}

/// Pretty JSON of the full result. Non-finite values become `null`.
pub fn render_json(result: &PipelineResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}
