use ndvi_guard::alignment::align_records;
use ndvi_guard::cli::OutputFormat;
use ndvi_guard::commands::process_batch;
use ndvi_guard::config::CliOverrides;
use ndvi_guard::interpolation::{spline_interpolate, InterpolationMethod};
use ndvi_guard::masking::mask_dates_for_interpolation;
use ndvi_guard::models::MaskSource;
use ndvi_guard::pipeline::MaskWindow;
use ndvi_guard::stages::GrowthStage;
use ndvi_guard::{ObservationBatch, Pipeline, PipelineConfig, RawObservation};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::io::Write;
use tempfile::NamedTempFile;

// ---- Test Harness ----

const SEASON_START_MS: i64 = 1_701_388_800_000; // 2023-12-01T00:00:00Z
const DAY_MS: i64 = 86_400_000;

fn observation(day: i64, mean: f64, valid: u64, total: u64) -> RawObservation {
    RawObservation {
        timestamp_ms: Some(SEASON_START_MS + day * DAY_MS + 5 * 3_600_000),
        mean: Some(mean),
        median: Some(mean + 0.01),
        stddev: Some(0.04 + mean * 0.05),
        p10: Some((mean - 0.12).max(-1.0)),
        p90: Some((mean + 0.1).min(1.0)),
        valid_pixel_count: Some(valid),
        total_pixel_count: Some(total),
        mask: if day % 2 == 0 {
            MaskSource::CloudProbability { threshold: 30 }
        } else {
            MaskSource::QaBitmask
        },
    }
}

fn batch(observations: Vec<RawObservation>) -> ObservationBatch {
    ObservationBatch {
        region_id: "farm-131".to_string(),
        count: Some(observations.len()),
        cloud_threshold: Some(30),
        observations,
    }
}

fn write_batch(batch: &ObservationBatch) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(batch).unwrap().as_bytes())
        .unwrap();
    file
}

// ---- Fixture Loaders ----

/// A single crop cycle sampled every 5 days from December to November,
/// with cloudy acquisitions that lost their statistics.
fn load_crop_season() -> ObservationBatch {
    let mut observations = Vec::new();
    for i in 0..73 {
        let day = i * 5;
        let phase = day as f64 / 365.0;
        // Bare soil, green-up in spring, peak in summer, senescence in autumn
        let mean = 0.15 + 0.7 * (-((phase - 0.55) / 0.15).powi(2)).exp();
        let valid = 400 + (i as u64 * 37) % 600;
        let mut obs = observation(day, mean, valid, 1000);
        if i % 9 == 4 {
            obs.mean = None;
            obs.median = None;
        }
        observations.push(obs);
    }
    batch(observations)
}

// ---- Tests ----

#[test]
fn test_crop_season_end_to_end() {
    let batch = load_crop_season();
    let result = Pipeline::new(PipelineConfig::default()).run(&batch).unwrap();

    assert_eq!(result.observations_received, 73);
    assert!(result.series.len() < 73);
    assert!(result.series.mean.iter().all(|v| v.is_finite()));

    let weights = result.weights.as_ref().unwrap();
    assert_eq!(weights.len(), result.series.len());
    assert!(weights.iter().all(|w| *w <= 5));

    // The season passes through every main stage
    for stage in [
        GrowthStage::BareLowCover,
        GrowthStage::RapidGrowth,
        GrowthStage::Peak,
        GrowthStage::Senescence,
    ] {
        assert!(
            result.mean_stages.contains(&stage),
            "missing stage {:?}",
            stage
        );
    }
    let first_peak = result
        .mean_stages
        .iter()
        .position(|s| *s == GrowthStage::Peak)
        .unwrap();
    let first_senescence = result
        .mean_stages
        .iter()
        .position(|s| *s == GrowthStage::Senescence)
        .unwrap();
    assert!(first_peak < first_senescence);
}

#[test]
fn test_summer_window_reconstructed_by_each_method() {
    let batch = load_crop_season();
    let window = MaskWindow {
        start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
        outside_to_nan: false,
    };

    for method in [
        InterpolationMethod::Pchip,
        InterpolationMethod::Cubic,
        InterpolationMethod::Univariate,
    ] {
        let config = PipelineConfig {
            interpolation_method: method,
            mask_window: Some(window.clone()),
            ..Default::default()
        };
        let result = Pipeline::new(config).run(&batch).unwrap();

        let masked_count = result.masked.iter().filter(|v| v.is_nan()).count();
        assert!(masked_count >= 8, "{}: only {} masked", method, masked_count);
        assert!(
            result.interpolated.iter().all(|v| v.is_finite()),
            "{} left gaps inside the season",
            method
        );
        for (filled, raw) in result.interpolated.iter().zip(&result.series.mean) {
            assert!(
                (filled - raw).abs() < 0.25,
                "{}: {} too far from {}",
                method,
                filled,
                raw
            );
        }
    }
}

#[test]
fn test_june_scenario_pchip() {
    let dates: Vec<String> = (1..=10).map(|d| format!("2024-06-{:02}", d)).collect();
    let nan = f64::NAN;
    let values = [0.2, 0.25, nan, nan, 0.5, 0.6, nan, 0.8, 0.85, 0.9];

    let filled = spline_interpolate(&dates, &values, InterpolationMethod::Pchip, None).unwrap();

    assert!(filled.iter().all(|v| v.is_finite()));
    let eps = 1e-9;
    assert!(filled[2] >= 0.25 - eps && filled[3] <= 0.5 + eps);
    assert!(filled[2] <= filled[3]);
    assert!(filled[6] >= 0.6 - eps && filled[6] <= 0.8 + eps);
}

#[test]
fn test_aligner_never_grows_and_keeps_complete_records() {
    let mut rng = StdRng::seed_from_u64(131);
    for _ in 0..200 {
        let n = rng.random_range(0..30);
        let observations: Vec<RawObservation> = (0..n)
            .map(|i| {
                let mut obs = observation(i, rng.random_range(-0.2..1.0), 500, 1000);
                if rng.random_bool(0.3) {
                    obs.p90 = None;
                }
                if rng.random_bool(0.2) {
                    obs.total_pixel_count = None;
                }
                if rng.random_bool(0.1) {
                    obs.timestamp_ms = None;
                }
                obs
            })
            .collect();

        for track in [false, true] {
            let series = align_records(&observations, track);
            assert!(series.len() <= observations.len());
            assert_eq!(series.mean.len(), series.len());
            assert_eq!(series.p90.len(), series.len());
            assert_eq!(series.valid_pixels.len(), series.len());
            assert!(series.mean.iter().all(|v| v.is_finite()));
            if track {
                assert_eq!(series.total_pixels.as_ref().unwrap().len(), series.len());
            }
        }
    }
}

#[test]
fn test_interpolation_never_extrapolates_random_series() {
    let mut rng = StdRng::seed_from_u64(2024);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for _ in 0..100 {
        let n = rng.random_range(4..25);
        let mut day = 0;
        let dates: Vec<NaiveDate> = (0..n)
            .map(|_| {
                day += rng.random_range(1..12);
                start + chrono::Days::new(day)
            })
            .collect();
        let values: Vec<f64> = (0..n)
            .map(|_| {
                if rng.random_bool(0.35) {
                    f64::NAN
                } else {
                    rng.random_range(0.0..1.0)
                }
            })
            .collect();

        let known: Vec<usize> = (0..n).filter(|&i| values[i].is_finite()).collect();
        for method in [
            InterpolationMethod::Pchip,
            InterpolationMethod::Cubic,
            InterpolationMethod::Univariate,
        ] {
            let filled = spline_interpolate(&dates, &values, method, None).unwrap();
            assert_eq!(filled.len(), n);
            if known.len() < 2 {
                continue;
            }
            let (first, last) = (known[0], known[known.len() - 1]);
            for (i, v) in filled.iter().enumerate() {
                if i < first || i > last {
                    assert!(v.is_nan(), "{} filled position {} outside span", method, i);
                } else {
                    assert!(v.is_finite(), "{} left position {} empty", method, i);
                }
            }
        }
    }
}

#[test]
fn test_complementary_masks_are_all_missing() {
    let dates: Vec<String> = (1..=30).map(|d| format!("2024-09-{:02}", d)).collect();
    let values: Vec<f64> = (0..30).map(|i| 0.3 + i as f64 * 0.01).collect();

    let inside =
        mask_dates_for_interpolation(&dates, &values, "2024-09-10", "2024-09-20", false).unwrap();
    let result =
        mask_dates_for_interpolation(&dates, &inside, "2024-09-10", "2024-09-20", true).unwrap();
    assert!(result.iter().all(|v| v.is_nan()));
}

#[test]
fn test_process_batch_json_output() {
    let mut observations: Vec<RawObservation> = (0..12)
        .map(|i| observation(i * 6, 0.2 + i as f64 * 0.05, 700, 1000))
        .collect();
    observations[5].timestamp_ms = None;
    observations[7].stddev = None;
    let file = write_batch(&batch(observations));

    let json = process_batch(
        file.path().to_str().unwrap(),
        None,
        CliOverrides {
            method: Some("univariate".to_string()),
            ..Default::default()
        },
        OutputFormat::Json,
    )
    .unwrap();

    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["region_id"], "farm-131");
    assert_eq!(value["observations_received"], 12);
    assert_eq!(value["interpolation_method"], "univariate");

    let dates = value["series"]["dates"].as_array().unwrap();
    assert_eq!(dates.len(), 11);
    assert_eq!(dates[5], "Unknown");
    assert_eq!(dates[0], "2023-12-01");
    assert!(value["interpolated"][5].is_null());
    assert_eq!(value["weights"][0], 4);

    // The dated result round-trips into the typed structure's date column
    let parsed: Vec<ndvi_guard::dates::ObservationDate> =
        serde_json::from_value(value["series"]["dates"].clone()).unwrap();
    assert!(parsed[5].is_unknown());
}

#[test]
fn test_process_batch_table_output() {
    let observations: Vec<RawObservation> = (0..6)
        .map(|i| observation(i * 10, 0.3 + i as f64 * 0.1, 900, 1000))
        .collect();
    let file = write_batch(&batch(observations));

    let table = process_batch(
        file.path().to_str().unwrap(),
        None,
        CliOverrides::default(),
        OutputFormat::Table,
    )
    .unwrap();

    assert!(table.contains("Region farm-131: 6 of 6 observations"));
    assert!(table.contains("| Fraction |"));
    assert!(table.contains("|  0.9000 |"));
    assert!(table.contains("Mean NDVI stages:"));
}

#[test]
fn test_process_batch_all_missing() {
    let file = write_batch(&batch(vec![RawObservation::default(); 5]));
    let table = process_batch(
        file.path().to_str().unwrap(),
        None,
        CliOverrides::default(),
        OutputFormat::Table,
    )
    .unwrap();
    assert!(table.contains("No complete observations for region farm-131 (5 received)"));
}

#[test]
fn test_process_batch_rejects_unknown_method() {
    let file = write_batch(&load_crop_season());
    let err = process_batch(
        file.path().to_str().unwrap(),
        None,
        CliOverrides {
            method: Some("spline".to_string()),
            ..Default::default()
        },
        OutputFormat::Json,
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("method must be 'pchip', 'cubic', or 'univariate'"));
}
