use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualitative phase of a single-crop vegetation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    /// Empty field or open water
    EmptyWater,
    BareLowCover,
    RapidGrowth,
    Peak,
    /// Senescence or maturity
    Senescence,
    /// Matched no band (e.g. above 1.0, or 0.3 while falling); drawn as bare cover
    Unclassified,
}

impl GrowthStage {
    pub const ALL: [GrowthStage; 6] = [
        Self::EmptyWater,
        Self::BareLowCover,
        Self::RapidGrowth,
        Self::Peak,
        Self::Senescence,
        Self::Unclassified,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::EmptyWater => "empty/water",
            Self::BareLowCover | Self::Unclassified => "bare/low cover",
            Self::RapidGrowth => "rapid growth",
            Self::Peak => "peak",
            Self::Senescence => "senescence",
        }
    }

    /// Shading colour used when drawing the stage under a series.
    pub fn color(&self) -> &'static str {
        match self {
            Self::EmptyWater => "#b3c6e0",
            Self::BareLowCover | Self::Unclassified => "#cccccc",
            Self::RapidGrowth => "#3ac96a",
            Self::Peak => "#005902",
            Self::Senescence => "#f5c542",
        }
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Backward first difference, with the first element compared to itself.
pub fn first_difference(values: &[f64]) -> Vec<f64> {
    let mut diffs = Vec::with_capacity(values.len());
    let mut previous = match values.first() {
        Some(v) => *v,
        None => return diffs,
    };
    for &v in values {
        diffs.push(v - previous);
        previous = v;
    }
    diffs
}

/// Decision table for one point. Rows are checked top to bottom; the
/// 0.3–0.75 band appears twice and is split by the slope sign.
pub fn classify(value: f64, diff: f64) -> GrowthStage {
    if value < 0.1 {
        GrowthStage::EmptyWater
    } else if (0.1..0.3).contains(&value) {
        GrowthStage::BareLowCover
    } else if (0.3..0.75).contains(&value) && diff >= 0.0 {
        GrowthStage::RapidGrowth
    } else if (0.75..=1.0).contains(&value) {
        GrowthStage::Peak
    } else if value > 0.3 && value < 0.75 && diff < 0.0 {
        GrowthStage::Senescence
    } else {
        GrowthStage::Unclassified
    }
}

/// Stage of every point of a smoothed series.
pub fn classify_stages(values: &[f64]) -> Vec<GrowthStage> {
    values
        .iter()
        .zip(first_difference(values))
        .map(|(&v, d)| classify(v, d))
        .collect()
}
