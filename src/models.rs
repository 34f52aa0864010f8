use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dates::ObservationDate;
use crate::error::PipelineError;

/// How the acquisition collaborator masked clouds for one image.
///
/// Images exposing a cloud-probability band are masked with both the QA
/// bitmask and the probability threshold; the rest fall back to the bitmask
/// alone. The pipeline treats both the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskSource {
    CloudProbability { threshold: u8 },
    #[default]
    QaBitmask,
}

/// Region statistics reduced from one source image. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Acquisition start in milliseconds since the Unix epoch (UTC)
    pub timestamp_ms: Option<i64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub stddev: Option<f64>,
    pub p10: Option<f64>,
    pub p90: Option<f64>,
    pub valid_pixel_count: Option<u64>,
    pub total_pixel_count: Option<u64>,
    #[serde(default)]
    pub mask: MaskSource,
}

/// Observations for one region, in acquisition order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationBatch {
    pub region_id: String,
    /// Number of images the collaborator reported for the region
    pub count: Option<usize>,
    /// Cloud-probability threshold used upstream; reported, never applied here
    pub cloud_threshold: Option<u8>,
    pub observations: Vec<RawObservation>,
}

impl ObservationBatch {
    /// The observations to process: the first `count` entries when a count
    /// was reported, otherwise all of them.
    pub fn selected(&self) -> &[RawObservation] {
        match self.count {
            Some(count) if count < self.observations.len() => &self.observations[..count],
            Some(count) if count > self.observations.len() => {
                tracing::warn!(
                    "Region {} reported {} observations but only {} were supplied",
                    self.region_id,
                    count,
                    self.observations.len()
                );
                &self.observations
            }
            _ => &self.observations,
        }
    }
}

/// Complete observations as parallel arrays, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub dates: Vec<ObservationDate>,
    pub mean: Vec<f64>,
    pub median: Vec<f64>,
    pub stddev: Vec<f64>,
    pub p10: Vec<f64>,
    pub p90: Vec<f64>,
    pub valid_pixels: Vec<u64>,
    /// Present only when total pixel counts are tracked
    pub total_pixels: Option<Vec<u64>>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn statistic(&self, statistic: Statistic) -> &[f64] {
        match statistic {
            Statistic::Mean => &self.mean,
            Statistic::Median => &self.median,
            Statistic::StdDev => &self.stddev,
            Statistic::P10 => &self.p10,
            Statistic::P90 => &self.p90,
        }
    }

    pub fn valid_pixels_f64(&self) -> Vec<f64> {
        self.valid_pixels.iter().map(|&v| v as f64).collect()
    }
}

/// A per-acquisition NDVI statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Median,
    StdDev,
    P10,
    P90,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::StdDev => "stddev",
            Self::P10 => "p10",
            Self::P90 => "p90",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "stddev" | "std" => Ok(Self::StdDev),
            "p10" => Ok(Self::P10),
            "p90" => Ok(Self::P90),
            other => Err(PipelineError::InvalidArgument(format!(
                "statistic must be one of mean, median, stddev, p10, p90 (got '{}')",
                other
            ))),
        }
    }
}
