use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::alignment::align_records;
use crate::dates::ObservationDate;
use crate::error::Result;
use crate::interpolation::{spline_interpolate, InterpolationMethod};
use crate::masking::mask_dates_for_interpolation;
use crate::models::{AlignedSeries, MaskSource, ObservationBatch, RawObservation, Statistic};
use crate::smoothing::{smooth_series, SmoothedSeries, DEFAULT_SIGMA};
use crate::stages::{classify_stages, GrowthStage};
use crate::weights::{assign_weights_checked, ZeroTotalPolicy};

/// Date window blanked (or kept) before interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Keep the window and blank everything else instead
    pub outside_to_nan: bool,
}

/// Configuration for the time-series pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub track_total_pixels: bool,
    pub zero_total_policy: ZeroTotalPolicy,
    pub interpolation_method: InterpolationMethod,
    pub smoothing_factor: Option<f64>,
    pub interpolated_statistic: Statistic,
    pub mask_window: Option<MaskWindow>,
    pub sigma: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            track_total_pixels: true,
            zero_total_policy: ZeroTotalPolicy::default(),
            interpolation_method: InterpolationMethod::default(),
            smoothing_factor: None,
            interpolated_statistic: Statistic::Mean,
            mask_window: None,
            sigma: DEFAULT_SIGMA,
        }
    }
}

/// Everything a renderer needs, as parallel arrays indexed like `series.dates`.
///
/// Export only: missing values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub region_id: String,
    pub observations_received: usize,
    pub cloud_threshold: Option<u8>,
    pub series: AlignedSeries,
    /// Valid-pixel fraction, when total pixel counts are tracked
    pub fractions: Option<Vec<f64>>,
    /// Quality weight 0..=5, when total pixel counts are tracked
    pub weights: Option<Vec<u8>>,
    pub interpolated_statistic: Statistic,
    pub interpolation_method: InterpolationMethod,
    /// The interpolated statistic after window masking
    pub masked: Vec<f64>,
    pub interpolated: Vec<f64>,
    pub smoothed: SmoothedSeries,
    pub mean_stages: Vec<GrowthStage>,
    pub median_stages: Vec<GrowthStage>,
}

impl PipelineResult {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Runs alignment, weighting, masking, interpolation, smoothing and stage
/// classification over one region's observations.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, batch: &ObservationBatch) -> Result<PipelineResult> {
        let observations = batch.selected();
        log_mask_sources(&batch.region_id, observations);

        let series = align_records(observations, self.config.track_total_pixels);
        if series.is_empty() {
            tracing::warn!(
                "No complete observations for region {} ({} received)",
                batch.region_id,
                observations.len()
            );
        }

        let (fractions, weights) = match &series.total_pixels {
            Some(totals) => {
                let (fractions, weights) = assign_weights_checked(
                    &series.valid_pixels,
                    totals,
                    self.config.zero_total_policy,
                )?;
                (Some(fractions), Some(weights))
            }
            None => (None, None),
        };

        let (masked, interpolated) = self.fill_gaps(&series)?;
        let smoothed = smooth_series(&series, self.config.sigma)?;
        let mean_stages = classify_stages(&smoothed.mean);
        let median_stages = classify_stages(&smoothed.median);

        tracing::info!(
            "Region {}: {} of {} observations aligned, {} interpolation of {}",
            batch.region_id,
            series.len(),
            observations.len(),
            self.config.interpolation_method,
            self.config.interpolated_statistic
        );

        Ok(PipelineResult {
            region_id: batch.region_id.clone(),
            observations_received: observations.len(),
            cloud_threshold: batch.cloud_threshold,
            series,
            fractions,
            weights,
            interpolated_statistic: self.config.interpolated_statistic,
            interpolation_method: self.config.interpolation_method,
            masked,
            interpolated,
            smoothed,
            mean_stages,
            median_stages,
        })
    }

    /// Mask and interpolate the configured statistic.
    ///
    /// Only observations with a known date take part; positions dated
    /// `Unknown` come back as NaN in both outputs.
    fn fill_gaps(&self, series: &AlignedSeries) -> Result<(Vec<f64>, Vec<f64>)> {
        let values = series.statistic(self.config.interpolated_statistic);
        let dated: Vec<(usize, NaiveDate)> = series
            .dates
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_date().map(|date| (i, date)))
            .collect();

        let undated = series.len() - dated.len();
        if undated > 0 {
            tracing::warn!(
                "{} observations have no acquisition date and are left out of interpolation",
                undated
            );
        }

        let dates: Vec<NaiveDate> = dated.iter().map(|(_, d)| *d).collect();
        let dated_values: Vec<f64> = dated.iter().map(|(i, _)| values[*i]).collect();

        let masked = match &self.config.mask_window {
            Some(window) => mask_dates_for_interpolation(
                &dates,
                &dated_values,
                window.start,
                window.end,
                window.outside_to_nan,
            )?,
            None => dated_values,
        };
        let interpolated = spline_interpolate(
            &dates,
            &masked,
            self.config.interpolation_method,
            self.config.smoothing_factor,
        )?;

        let mut masked_full = vec![f64::NAN; series.len()];
        let mut interpolated_full = vec![f64::NAN; series.len()];
        for (k, (i, _)) in dated.iter().enumerate() {
            masked_full[*i] = masked[k];
            interpolated_full[*i] = interpolated[k];
        }
        Ok((masked_full, interpolated_full))
    }
}

fn log_mask_sources(region_id: &str, observations: &[RawObservation]) {
    let with_probability = observations
        .iter()
        .filter(|o| matches!(o.mask, MaskSource::CloudProbability { .. }))
        .count();
    tracing::debug!(
        "Region {}: {} images masked with cloud probability, {} with QA bitmask only",
        region_id,
        with_probability,
        observations.len() - with_probability
    );
}

/// Dates rendered the way charts label them.
pub fn date_labels(dates: &[ObservationDate]) -> Vec<String> {
    dates.iter().map(|d| d.to_string()).collect()
}
