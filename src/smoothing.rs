use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::models::AlignedSeries;

/// Default Gaussian width, in time steps.
pub const DEFAULT_SIGMA: f64 = 2.0;

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Smoothed counterpart of every statistic in an aligned series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SmoothedSeries {
    pub sigma: f64,
    pub mean: Vec<f64>,
    pub median: Vec<f64>,
    pub stddev: Vec<f64>,
    pub p10: Vec<f64>,
    pub p90: Vec<f64>,
    pub valid_pixels: Vec<f64>,
}

/// Normalized Gaussian kernel of radius `round(4 * sigma)`.
pub fn gaussian_kernel(sigma: f64) -> Result<Vec<f64>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(PipelineError::InvalidArgument(format!(
            "sigma must be a positive number (got {})",
            sigma
        )));
    }

    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|offset| {
            let x = offset as f64;
            (-0.5 * x * x / (sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}

/// Map an out-of-range index back into `0..len` by mirroring about the
/// array edges, edge samples repeated (`d c b a | a b c d | d c b a`).
fn reflect_index(index: i64, len: usize) -> usize {
    let len = len as i64;
    let period = 2 * len;
    let wrapped = index.rem_euclid(period);
    if wrapped < len {
        wrapped as usize
    } else {
        (period - 1 - wrapped) as usize
    }
}

/// One-dimensional Gaussian filter with reflecting boundaries.
///
/// Values must be gap-free: a NaN spreads across the whole kernel width.
pub fn gaussian_filter1d(values: &[f64], sigma: f64) -> Result<Vec<f64>> {
    let kernel = gaussian_kernel(sigma)?;
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let radius = (kernel.len() / 2) as i64;
    let smoothed = (0..values.len() as i64)
        .map(|center| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let source = reflect_index(center + k as i64 - radius, values.len());
                    w * values[source]
                })
                .sum()
        })
        .collect();

    Ok(smoothed)
}

/// Smooth each statistic of an aligned series independently.
pub fn smooth_series(series: &AlignedSeries, sigma: f64) -> Result<SmoothedSeries> {
    Ok(SmoothedSeries {
        sigma,
        mean: gaussian_filter1d(&series.mean, sigma)?,
        median: gaussian_filter1d(&series.median, sigma)?,
        stddev: gaussian_filter1d(&series.stddev, sigma)?,
        p10: gaussian_filter1d(&series.p10, sigma)?,
        p90: gaussian_filter1d(&series.p90, sigma)?,
        valid_pixels: gaussian_filter1d(&series.valid_pixels_f64(), sigma)?,
    })
}
