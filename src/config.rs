use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dates::parse_calendar_date;
use crate::interpolation::InterpolationMethod;
use crate::models::Statistic;
use crate::pipeline::{MaskWindow, PipelineConfig};
use crate::smoothing::DEFAULT_SIGMA;
use crate::weights::ZeroTotalPolicy;

/// Main configuration structure for NDVI Guard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gap interpolation configuration
    #[serde(default)]
    pub interpolation: InterpolationConfig,
    /// Gaussian smoothing configuration
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    /// Optional date window masked before interpolation
    pub mask: Option<MaskConfig>,
    /// Quality weighting configuration
    #[serde(default)]
    pub quality: QualityConfig,
    /// Settings of the upstream acquisition, recorded for reports only
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// One of "pchip", "cubic", "univariate" (default: "pchip")
    pub method: Option<String>,
    /// Residual budget for "univariate" (default: 0.001 per known point)
    pub smoothing_factor: Option<f64>,
    /// Statistic to gap-fill (default: "mean")
    pub statistic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Gaussian sigma in time steps (default: 2.0)
    pub sigma: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    /// First masked date, YYYY-MM-DD
    pub start: String,
    /// Last masked date, YYYY-MM-DD
    pub end: String,
    /// Keep the window and blank everything else (default: false)
    pub outside_to_nan: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Require and report total pixel counts (default: true)
    pub track_total_pixels: Option<bool>,
    /// "nan" or "fail" when a total pixel count is zero (default: "nan")
    pub zero_total: Option<ZeroTotalPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Cloud-probability threshold applied upstream (default: 30)
    pub cloud_threshold: Option<u8>,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            sigma: Some(DEFAULT_SIGMA),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            track_total_pixels: Some(true),
            zero_total: Some(ZeroTotalPolicy::Nan),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            cloud_threshold: Some(30),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml_edit::de::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml_edit::ser::to_string_pretty(self)
            .context("Failed to serialize configuration to TOML")?;

        std::fs::write(&path, toml_string)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Merge configuration with command line arguments, prioritizing CLI values
    pub fn merge_with_cli(&mut self, overrides: CliOverrides) {
        if let Some(method) = overrides.method {
            self.interpolation.method = Some(method);
        }
        if let Some(smooth) = overrides.smoothing_factor {
            self.interpolation.smoothing_factor = Some(smooth);
        }
        if let Some(statistic) = overrides.statistic {
            self.interpolation.statistic = Some(statistic);
        }
        if let Some(sigma) = overrides.sigma {
            self.smoothing.sigma = Some(sigma);
        }

        // A window needs both ends; a lone CLI bound only replaces that bound
        match (overrides.mask_start, overrides.mask_end) {
            (Some(start), Some(end)) => {
                self.mask = Some(MaskConfig {
                    start,
                    end,
                    outside_to_nan: Some(overrides.outside_to_nan),
                });
            }
            (start, end) => {
                if let Some(mask) = self.mask.as_mut() {
                    if let Some(start) = start {
                        mask.start = start;
                    }
                    if let Some(end) = end {
                        mask.end = end;
                    }
                    if overrides.outside_to_nan {
                        mask.outside_to_nan = Some(true);
                    }
                }
            }
        }

        if let Some(track) = overrides.track_total_pixels {
            self.quality.track_total_pixels = Some(track);
        }
    }

    /// Get the effective values with defaults applied
    pub fn get_method(&self) -> Result<InterpolationMethod> {
        match self.interpolation.method.as_deref() {
            Some(name) => name
                .parse()
                .with_context(|| format!("Invalid interpolation method: {}", name)),
            None => Ok(InterpolationMethod::default()),
        }
    }

    pub fn get_statistic(&self) -> Result<Statistic> {
        match self.interpolation.statistic.as_deref() {
            Some(name) => name
                .parse()
                .with_context(|| format!("Invalid interpolation statistic: {}", name)),
            None => Ok(Statistic::default()),
        }
    }

    pub fn get_sigma(&self) -> f64 {
        self.smoothing.sigma.unwrap_or(DEFAULT_SIGMA)
    }

    pub fn get_track_total_pixels(&self) -> bool {
        self.quality.track_total_pixels.unwrap_or(true)
    }

    pub fn get_zero_total_policy(&self) -> ZeroTotalPolicy {
        self.quality.zero_total.unwrap_or_default()
    }

    pub fn get_cloud_threshold(&self) -> u8 {
        self.acquisition.cloud_threshold.unwrap_or(30)
    }

    pub fn get_mask_window(&self) -> Result<Option<MaskWindow>> {
        let Some(mask) = &self.mask else {
            return Ok(None);
        };
        let start = parse_mask_date(&mask.start)?;
        let end = parse_mask_date(&mask.end)?;
        Ok(Some(MaskWindow {
            start,
            end,
            outside_to_nan: mask.outside_to_nan.unwrap_or(false),
        }))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.get_method()?;
        self.get_statistic()?;

        let sigma = self.get_sigma();
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(anyhow::anyhow!("Sigma must be greater than 0, got: {}", sigma));
        }

        if let Some(smooth) = self.interpolation.smoothing_factor {
            if !smooth.is_finite() || smooth < 0.0 {
                return Err(anyhow::anyhow!(
                    "Smoothing factor must be 0 or greater, got: {}",
                    smooth
                ));
            }
        }

        if let Some(window) = self.get_mask_window()? {
            if window.start > window.end {
                return Err(anyhow::anyhow!(
                    "Mask start {} is after mask end {}",
                    window.start,
                    window.end
                ));
            }
        }

        if self.get_cloud_threshold() > 100 {
            return Err(anyhow::anyhow!(
                "Cloud threshold is a percentage, got: {}",
                self.get_cloud_threshold()
            ));
        }

        Ok(())
    }

    /// Validated pipeline settings
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        self.validate()?;
        Ok(PipelineConfig {
            track_total_pixels: self.get_track_total_pixels(),
            zero_total_policy: self.get_zero_total_policy(),
            interpolation_method: self.get_method()?,
            smoothing_factor: self.interpolation.smoothing_factor,
            interpolated_statistic: self.get_statistic()?,
            mask_window: self.get_mask_window()?,
            sigma: self.get_sigma(),
        })
    }
}

/// Values given on the command line that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub method: Option<String>,
    pub smoothing_factor: Option<f64>,
    pub statistic: Option<String>,
    pub sigma: Option<f64>,
    pub mask_start: Option<String>,
    pub mask_end: Option<String>,
    pub outside_to_nan: bool,
    pub track_total_pixels: Option<bool>,
}

fn parse_mask_date(value: &str) -> Result<NaiveDate> {
    parse_calendar_date(value).with_context(|| format!("Invalid mask date: {}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.get_method().unwrap(), InterpolationMethod::Pchip);
        assert_eq!(config.get_statistic().unwrap(), Statistic::Mean);
        assert_eq!(config.get_sigma(), 2.0);
        assert!(config.get_track_total_pixels());
        assert_eq!(config.get_zero_total_policy(), ZeroTotalPolicy::Nan);
        assert_eq!(config.get_cloud_threshold(), 30);
        assert!(config.get_mask_window().unwrap().is_none());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.mask = Some(MaskConfig {
            start: "2024-06-01".to_string(),
            end: "2024-10-22".to_string(),
            outside_to_nan: Some(false),
        });
        let toml_string = toml_edit::ser::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[smoothing]"));
        assert!(toml_string.contains("[mask]"));
        assert!(toml_string.contains("[quality]"));

        let parsed: Config = toml_edit::de::from_str(&toml_string).unwrap();
        assert_eq!(parsed.get_sigma(), config.get_sigma());
        assert_eq!(
            parsed.get_mask_window().unwrap(),
            config.get_mask_window().unwrap()
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml_edit::de::from_str(
            r#"
            [interpolation]
            method = "univariate"
            smoothing_factor = 0.02

            [quality]
            zero_total = "fail"
            "#,
        )
        .unwrap();

        let pipeline = parsed.to_pipeline_config().unwrap();
        assert_eq!(pipeline.interpolation_method, InterpolationMethod::Univariate);
        assert_eq!(pipeline.smoothing_factor, Some(0.02));
        assert_eq!(pipeline.zero_total_policy, ZeroTotalPolicy::Fail);
        assert!(pipeline.track_total_pixels);
        assert_eq!(pipeline.sigma, 2.0);
    }

    #[test]
    fn test_config_merge_with_cli() {
        let mut config = Config::default();
        config.merge_with_cli(CliOverrides {
            method: Some("cubic".to_string()),
            sigma: Some(1.5),
            mask_start: Some("2024-06-01".to_string()),
            mask_end: Some("2024-07-01".to_string()),
            outside_to_nan: true,
            track_total_pixels: Some(false),
            ..Default::default()
        });

        assert_eq!(config.get_method().unwrap(), InterpolationMethod::Cubic);
        assert_eq!(config.get_sigma(), 1.5);
        assert!(!config.get_track_total_pixels());
        let window = config.get_mask_window().unwrap().unwrap();
        assert!(window.outside_to_nan);
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    }

    #[test]
    fn test_lone_cli_bound_updates_existing_window() {
        let mut config = Config::default();
        config.mask = Some(MaskConfig {
            start: "2024-06-01".to_string(),
            end: "2024-10-22".to_string(),
            outside_to_nan: None,
        });
        config.merge_with_cli(CliOverrides {
            mask_end: Some("2024-08-31".to_string()),
            ..Default::default()
        });
        let window = config.get_mask_window().unwrap().unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 8, 31).unwrap());
        assert!(!window.outside_to_nan);
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.interpolation.method = Some("univariate".to_string());
        let temp_file = NamedTempFile::new().unwrap();

        config.to_file(temp_file.path()).unwrap();

        let loaded_config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(
            loaded_config.get_method().unwrap(),
            InterpolationMethod::Univariate
        );
        assert_eq!(loaded_config.get_cloud_threshold(), 30);
    }

    #[test]
    fn test_config_validation_failures() {
        let mut config = Config::default();
        config.interpolation.method = Some("linear".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid interpolation method"));

        let mut config = Config::default();
        config.smoothing.sigma = Some(0.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mask = Some(MaskConfig {
            start: "2024-10-01".to_string(),
            end: "2024-06-01".to_string(),
            outside_to_nan: None,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("after mask end"));

        let mut config = Config::default();
        config.mask = Some(MaskConfig {
            start: "June".to_string(),
            end: "2024-06-01".to_string(),
            outside_to_nan: None,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid mask date"));
    }
}
